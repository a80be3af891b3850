use std::collections::VecDeque;
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use livemap_feed::{Connection, Connector, Feed, Frame};
use livemap_messages::{Command, ConnectionState, Event, FeedConfig, VehicleStatus};

const A1: &str = r#"[{"id":"A1","lat":51.5,"lng":-0.09,"alt":100,"hdg":90,"status":"OK","type":"multirotor"}]"#;
const B2: &str = r#"[{"id":"B2","lat":51.52,"lng":-0.12,"alt":400,"hdg":180,"status":"WARN","type":"fixedwing"}]"#;

/// What one scripted connect attempt does.
enum Attempt {
    Refuse,
    /// Accept, then fail the first read.
    Reset,
    /// Accept, hand out these frames, then idle.
    Serve(Vec<Frame>),
}

/// Counts connections that are currently alive.
#[derive(Default)]
struct Tally {
    attempts: AtomicUsize,
    live: AtomicUsize,
    peak: AtomicUsize,
    opened: AtomicUsize,
}

struct ScriptedConnector {
    script: Arc<Mutex<VecDeque<Attempt>>>,
    tally: Arc<Tally>,
}

struct ScriptedConnection {
    frames: VecDeque<Frame>,
    reset: bool,
    tally: Arc<Tally>,
}

impl Connector for ScriptedConnector {
    type Connection = ScriptedConnection;

    fn connect(
        &mut self,
        _endpoint: &str,
        _interrupted: &dyn Fn() -> bool,
    ) -> anyhow::Result<ScriptedConnection> {
        self.tally.attempts.fetch_add(1, Ordering::SeqCst);
        let attempt = self.script.lock().unwrap().pop_front();
        let (frames, reset) = match attempt {
            Some(Attempt::Refuse) => return Err(anyhow!("connection refused")),
            Some(Attempt::Reset) => (VecDeque::new(), true),
            Some(Attempt::Serve(frames)) => (frames.into(), false),
            None => (VecDeque::new(), false),
        };

        let live = self.tally.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.tally.peak.fetch_max(live, Ordering::SeqCst);
        self.tally.opened.fetch_add(1, Ordering::SeqCst);

        Ok(ScriptedConnection {
            frames,
            reset,
            tally: Arc::clone(&self.tally),
        })
    }
}

impl Connection for ScriptedConnection {
    fn read_frame(&mut self) -> anyhow::Result<Frame> {
        if self.reset {
            return Err(anyhow!("connection reset"));
        }
        match self.frames.pop_front() {
            Some(frame) => Ok(frame),
            None => {
                thread::sleep(Duration::from_millis(1));
                Ok(Frame::Idle)
            }
        }
    }
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.tally.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// Test helpers to reduce boilerplate

fn setup_feed(
    script: Vec<Attempt>,
) -> (
    flume::Sender<Command>,
    flume::Receiver<Event>,
    Arc<Tally>,
    JoinHandle<anyhow::Result<()>>,
) {
    let (cmd_tx, cmd_rx) = flume::unbounded::<Command>();
    let (event_tx, event_rx) = flume::unbounded::<Event>();
    let tally = Arc::new(Tally::default());

    let connector = ScriptedConnector {
        script: Arc::new(Mutex::new(script.into())),
        tally: Arc::clone(&tally),
    };
    let handle = thread::spawn(move || {
        let feed = Feed::with_connector(cmd_rx, event_tx, FeedConfig::default(), connector);
        feed.run()
    });

    (cmd_tx, event_rx, tally, handle)
}

fn teardown_feed(cmd_tx: flume::Sender<Command>, handle: JoinHandle<anyhow::Result<()>>) {
    cmd_tx.send(Command::Stop).unwrap();
    handle
        .join()
        .expect("Feed thread should not panic")
        .expect("Feed should stop cleanly");
}

/// Receive events until a snapshot arrives, returning it.
fn next_snapshot(event_rx: &flume::Receiver<Event>) -> Vec<livemap_messages::VehicleSnapshot> {
    loop {
        match event_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(Event::Snapshot(list)) => return list,
            Ok(Event::Connection(_)) => continue,
            Err(e) => panic!("Expected a snapshot, got {:?}", e),
        }
    }
}

fn wait_for_state(event_rx: &flume::Receiver<Event>, wanted: ConnectionState) {
    loop {
        match event_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(Event::Connection(state)) if state == wanted => return,
            Ok(_) => continue,
            Err(e) => panic!("Expected {:?}, got {:?}", wanted, e),
        }
    }
}

#[test]
fn test_feed_walks_connection_states() {
    let (cmd_tx, event_rx, _tally, handle) = setup_feed(vec![Attempt::Serve(vec![Frame::Closed])]);

    let mut states = Vec::new();
    while states.len() < 3 {
        match event_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(Event::Connection(state)) => states.push(state),
            other => panic!("Unexpected event {:?}", other),
        }
    }
    assert_eq!(
        states,
        vec![
            ConnectionState::Connected,
            ConnectionState::Closed,
            ConnectionState::Connected,
        ]
    );

    teardown_feed(cmd_tx, handle);
}

#[test]
fn test_feed_forwards_each_list_whole() {
    let (cmd_tx, event_rx, _tally, handle) = setup_feed(vec![Attempt::Serve(vec![
        Frame::Payload(A1.into()),
        Frame::Payload(B2.into()),
        Frame::Payload("[]".into()),
    ])]);

    let first = next_snapshot(&event_rx);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, "A1");

    let second = next_snapshot(&event_rx);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, "B2");
    assert_eq!(second[0].status, VehicleStatus::Warn);

    assert!(next_snapshot(&event_rx).is_empty());

    teardown_feed(cmd_tx, handle);
}

#[test]
fn test_malformed_payload_is_dropped() {
    let (cmd_tx, event_rx, _tally, handle) = setup_feed(vec![Attempt::Serve(vec![
        Frame::Payload(A1.into()),
        Frame::Payload("{not json".into()),
        Frame::Payload(r#"{"id":"A1"}"#.into()),
        Frame::Payload(B2.into()),
    ])]);

    assert_eq!(next_snapshot(&event_rx)[0].id, "A1");
    // The two bad messages produce nothing; the next list is the good one.
    assert_eq!(next_snapshot(&event_rx)[0].id, "B2");

    teardown_feed(cmd_tx, handle);
}

#[test]
fn test_repeated_closes_keep_one_connection() {
    const CLOSES: usize = 50;
    let mut script: Vec<Attempt> = (0..CLOSES)
        .map(|_| Attempt::Serve(vec![Frame::Closed]))
        .collect();
    script.push(Attempt::Serve(vec![Frame::Payload(A1.into())]));

    let (cmd_tx, event_rx, tally, handle) = setup_feed(script);

    // The list sent after all the closes still arrives.
    assert_eq!(next_snapshot(&event_rx)[0].id, "A1");

    assert_eq!(tally.opened.load(Ordering::SeqCst), CLOSES + 1);
    assert_eq!(tally.peak.load(Ordering::SeqCst), 1);
    assert!(tally.live.load(Ordering::SeqCst) <= 1);

    teardown_feed(cmd_tx, handle);
    assert_eq!(tally.live.load(Ordering::SeqCst), 0);
}

#[test]
fn test_errors_and_refusals_are_retried() {
    let (cmd_tx, event_rx, tally, handle) = setup_feed(vec![
        Attempt::Refuse,
        Attempt::Refuse,
        Attempt::Reset,
        Attempt::Serve(vec![Frame::Payload(A1.into())]),
    ]);

    wait_for_state(&event_rx, ConnectionState::Errored);
    assert_eq!(next_snapshot(&event_rx)[0].id, "A1");
    assert_eq!(tally.peak.load(Ordering::SeqCst), 1);

    teardown_feed(cmd_tx, handle);
}

#[test]
fn test_refused_endpoint_does_not_fill_the_queue() {
    const REFUSALS: usize = 2_000;
    let script = (0..REFUSALS).map(|_| Attempt::Refuse).collect();
    let (cmd_tx, event_rx, tally, handle) = setup_feed(script);

    // Nobody reads events while the endpoint keeps refusing.
    let deadline = Instant::now() + Duration::from_secs(5);
    while tally.attempts.load(Ordering::SeqCst) <= REFUSALS {
        assert!(Instant::now() < deadline, "Feed should keep retrying");
        thread::sleep(Duration::from_millis(1));
    }

    // At most the Connected of the attempt after the refusals.
    assert!(event_rx.len() <= 1, "{} events queued", event_rx.len());

    teardown_feed(cmd_tx, handle);
}

#[test]
fn test_feed_stops_when_ui_hangs_up() {
    let (cmd_tx, event_rx, tally, handle) = setup_feed(vec![]);

    wait_for_state(&event_rx, ConnectionState::Connected);
    drop(cmd_tx);

    let result = handle.join();
    assert!(result.is_ok(), "Feed thread should not panic");
    assert_eq!(tally.live.load(Ordering::SeqCst), 0);
}

#[test]
fn test_feed_reads_from_websocket_server() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    // Serves one list per connection and hangs up, twice.
    let server = thread::spawn(move || {
        for payload in [A1, B2] {
            let (stream, _) = listener.accept().unwrap();
            let mut socket = tungstenite::accept(stream).unwrap();
            socket.send(tungstenite::Message::text(payload)).unwrap();
            let _ = socket.close(None);
            // Drain until the client drops its side.
            while socket.read().is_ok() {}
        }
    });

    let (cmd_tx, cmd_rx) = flume::unbounded::<Command>();
    let (event_tx, event_rx) = flume::unbounded::<Event>();
    let config = FeedConfig {
        endpoint: format!("ws://{}", addr),
        ..FeedConfig::default()
    };
    let handle = thread::spawn(move || Feed::new(cmd_rx, event_tx, config).run());

    assert_eq!(next_snapshot(&event_rx)[0].id, "A1");
    // The feed reconnected after the server closed the first socket.
    assert_eq!(next_snapshot(&event_rx)[0].id, "B2");

    server.join().unwrap();
    teardown_feed(cmd_tx, handle);
}

#[test]
fn test_stop_interrupts_a_stalled_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    // Accepts the TCP connection and never answers the upgrade request.
    let server = thread::spawn(move || listener.accept().map(|(stream, _)| stream));

    let (cmd_tx, cmd_rx) = flume::unbounded::<Command>();
    let (event_tx, _event_rx) = flume::unbounded::<Event>();
    let (done_tx, done_rx) = flume::bounded::<bool>(1);
    let config = FeedConfig {
        endpoint: format!("ws://{}", addr),
        ..FeedConfig::default()
    };
    thread::spawn(move || {
        let stopped_cleanly = Feed::new(cmd_rx, event_tx, config).run().is_ok();
        let _ = done_tx.send(stopped_cleanly);
    });

    let _silent_peer = server.join().unwrap().unwrap();
    thread::sleep(Duration::from_millis(300));
    assert!(done_rx.is_empty(), "Feed should still be waiting on the handshake");

    cmd_tx.send(Command::Stop).unwrap();
    let stopped_cleanly = done_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("Feed should stop while the handshake is stalled");
    assert!(stopped_cleanly);
}
