mod connection;
mod websocket;

use std::cell::Cell;

pub use connection::{Connection, Connector, Frame};
pub use websocket::{WebSocketConnection, WebSocketConnector};

use anyhow::Result;
use flume::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use livemap_messages::{Command, ConnectionState, Event, FeedConfig, decode_snapshot_list};
use log::{debug, info, warn};

/// The live feed client.
/// Keeps one connection to the vehicle feed open and forwards every decoded
/// snapshot list to the UI, reconnecting whenever the connection goes away.
pub struct Feed<C = WebSocketConnector> {
    cmd_rx: Receiver<Command>,
    event_tx: Sender<Event>,
    config: FeedConfig,
    connector: C,
    state: ConnectionState,
    /// Failed attempts since the last successful connect.
    failed_attempts: u32,
    should_exit: bool,
}

impl Feed<WebSocketConnector> {
    /// Create a feed that talks WebSocket to `config.endpoint`.
    pub fn new(cmd_rx: Receiver<Command>, event_tx: Sender<Event>, config: FeedConfig) -> Self {
        Self::with_connector(cmd_rx, event_tx, config, WebSocketConnector::default())
    }
}

impl<C: Connector> Feed<C> {
    pub fn with_connector(
        cmd_rx: Receiver<Command>,
        event_tx: Sender<Event>,
        config: FeedConfig,
        connector: C,
    ) -> Self {
        debug!("Constructing a new feed for {}", config.endpoint);
        Self {
            cmd_rx,
            event_tx,
            config,
            connector,
            state: ConnectionState::Disconnected,
            failed_attempts: 0,
            should_exit: false,
        }
    }

    /// Run the feed (blocking).
    /// Loops connect -> read -> reconnect until told to stop or until the UI
    /// drops its end of either channel.
    pub fn run(mut self) -> Result<()> {
        while !self.should_exit {
            self.run_connection_iteration()?;
        }
        info!("Feed stopped");
        Ok(())
    }

    fn run_connection_iteration(&mut self) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            self.wait_before_reconnect();
            if self.should_exit {
                return Ok(());
            }
        }

        self.set_state(ConnectionState::Connecting);

        let cmd_rx = &self.cmd_rx;
        let stop = Cell::new(false);
        let interrupted = || {
            if !stop.get() {
                stop.set(matches!(
                    cmd_rx.try_recv(),
                    Ok(Command::Stop) | Err(TryRecvError::Disconnected)
                ));
            }
            stop.get()
        };
        let attempt = self.connector.connect(&self.config.endpoint, &interrupted);
        if stop.get() {
            debug!("Stopped while connecting to {}", self.config.endpoint);
            self.should_exit = true;
            return Ok(());
        }

        let mut connection = match attempt {
            Ok(connection) => connection,
            Err(e) => {
                debug!("Connecting to {} failed: {:#}", self.config.endpoint, e);
                self.failed_attempts = self.failed_attempts.saturating_add(1);
                self.set_state(ConnectionState::Errored);
                return Ok(());
            }
        };

        info!("Connected to {}", self.config.endpoint);
        self.failed_attempts = 0;
        self.set_state(ConnectionState::Connected);

        self.read_until_disconnected(&mut connection);
        Ok(())
    }

    fn read_until_disconnected(&mut self, connection: &mut C::Connection) {
        while !self.should_exit {
            self.poll_commands();
            if self.should_exit {
                break;
            }

            match connection.read_frame() {
                Ok(Frame::Payload(payload)) => self.handle_payload(&payload),
                Ok(Frame::Idle) => {}
                Ok(Frame::Closed) => {
                    info!("Feed connection closed");
                    self.set_state(ConnectionState::Closed);
                    break;
                }
                Err(e) => {
                    warn!("Feed connection failed: {:#}", e);
                    self.set_state(ConnectionState::Errored);
                    break;
                }
            }
        }
    }

    fn handle_payload(&mut self, payload: &str) {
        match decode_snapshot_list(payload) {
            Ok(vehicles) => {
                debug!("Received {} vehicles", vehicles.len());
                self.publish(Event::Snapshot(vehicles));
            }
            Err(e) => {
                // The UI keeps showing the last list that decoded.
                warn!("Dropping malformed feed message: {}", e);
            }
        }
    }

    fn poll_commands(&mut self) {
        match self.cmd_rx.try_recv() {
            Ok(Command::Stop) | Err(TryRecvError::Disconnected) => self.should_exit = true,
            Err(TryRecvError::Empty) => {}
        }
    }

    fn wait_before_reconnect(&mut self) {
        let delay = self.config.reconnect.delay(self.failed_attempts.saturating_sub(1));
        if delay.is_zero() {
            self.poll_commands();
            return;
        }

        debug!("Reconnecting in {:?}", delay);
        match self.cmd_rx.recv_timeout(delay) {
            Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => self.should_exit = true,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    /// Only entering and leaving `Connected` is published. A dead endpoint
    /// cycles connecting/errored without touching the UI queue.
    fn set_state(&mut self, state: ConnectionState) {
        debug!("Feed {} -> {}", self.state, state);
        let reported =
            state == ConnectionState::Connected || self.state == ConnectionState::Connected;
        self.state = state;
        if reported {
            self.publish(Event::Connection(state));
        }
    }

    fn publish(&mut self, event: Event) {
        if self.event_tx.send(event).is_err() {
            debug!("UI hung up, stopping feed");
            self.should_exit = true;
        }
    }
}
