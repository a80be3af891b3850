use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use log::{debug, trace, warn};
use tungstenite::client::IntoClientRequest;
use tungstenite::handshake::HandshakeError;
use tungstenite::{Message, WebSocket};

use crate::connection::{Connection, Connector, Frame};

/// How long a read blocks before the feed gets a chance to look at its
/// command channel.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Opens plain WebSocket connections with `tungstenite`.
pub struct WebSocketConnector {
    read_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(DEFAULT_READ_TIMEOUT)
    }
}

impl Connector for WebSocketConnector {
    type Connection = WebSocketConnection;

    fn connect(
        &mut self,
        endpoint: &str,
        interrupted: &dyn Fn() -> bool,
    ) -> Result<WebSocketConnection> {
        let request = endpoint.into_client_request()?;
        let host = request
            .uri()
            .host()
            .ok_or_else(|| anyhow!("No host in {}", endpoint))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_owned();
        let port = request.uri().port_u16().unwrap_or(80);

        let stream = TcpStream::connect((host.as_str(), port))?;
        // Set before the upgrade so a silent peer cannot hold the handshake.
        stream.set_read_timeout(Some(self.read_timeout))?;

        let mut handshake = tungstenite::client(request, stream);
        loop {
            match handshake {
                Ok((socket, response)) => {
                    debug!("Handshake with {} answered {}", endpoint, response.status());
                    return Ok(WebSocketConnection { socket });
                }
                Err(HandshakeError::Interrupted(mid)) => {
                    if interrupted() {
                        bail!("Handshake with {} interrupted", endpoint);
                    }
                    trace!("Still waiting for {} to answer the upgrade", endpoint);
                    handshake = mid.handshake();
                }
                Err(HandshakeError::Failure(e)) => return Err(e.into()),
            }
        }
    }
}

pub struct WebSocketConnection {
    socket: WebSocket<TcpStream>,
}

impl Connection for WebSocketConnection {
    fn read_frame(&mut self) -> Result<Frame> {
        match self.socket.read() {
            Ok(Message::Text(text)) => Ok(Frame::Payload(text.as_str().to_owned())),
            Ok(Message::Binary(bytes)) => Ok(binary_frame(&bytes)),
            Ok(Message::Close(reason)) => {
                debug!("Peer closed the feed: {:?}", reason);
                Ok(Frame::Closed)
            }
            Ok(other) => {
                trace!("Ignoring control frame {:?}", other);
                Ok(Frame::Idle)
            }
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Ok(Frame::Idle)
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(Frame::Closed)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Binary messages carry the same JSON as text ones. Anything that is not
/// UTF-8 is malformed and dropped.
fn binary_frame(bytes: &[u8]) -> Frame {
    match std::str::from_utf8(bytes) {
        Ok(text) => Frame::Payload(text.to_owned()),
        Err(e) => {
            warn!("Dropping malformed feed message: {}", e);
            Frame::Idle
        }
    }
}
