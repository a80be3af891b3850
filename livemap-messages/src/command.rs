/// Commands sent from the UI to the feed client.
#[derive(Debug)]
pub enum Command {
    /// Close the current connection and terminate the feed thread.
    Stop,
}
