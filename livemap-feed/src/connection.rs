use anyhow::Result;

/// Outcome of one read from an open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete feed message.
    Payload(String),
    /// Nothing arrived within the read timeout. The connection is still open.
    Idle,
    /// The peer closed the connection.
    Closed,
}

/// An open feed connection.
///
/// Dropping the value releases the underlying socket.
pub trait Connection {
    /// Read the next frame. Transport failures are returned as errors and end
    /// the connection.
    fn read_frame(&mut self) -> Result<Frame>;
}

/// Opens connections to a feed endpoint.
pub trait Connector {
    type Connection: Connection;

    /// Open a connection to `endpoint`. Implementations that can block call
    /// `interrupted` while they wait and give up once it returns true.
    fn connect(
        &mut self,
        endpoint: &str,
        interrupted: &dyn Fn() -> bool,
    ) -> Result<Self::Connection>;
}
