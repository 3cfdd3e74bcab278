use crate::error::Result;

/// A connection-per-cycle byte stream to the relay hub.
///
/// The agent opens the link at the start of a poll cycle, exchanges one
/// request/response pair and closes it again. Reads are non-blocking single
/// bytes; the frame parser layers its own bounded polling on top, so a link
/// implementation must never block inside [`HubLink::poll_byte`].
pub trait HubLink {
    /// Open a connection to the hub endpoint.
    ///
    /// Returns `Ok(false)` when the endpoint refused the connection; hard
    /// transport faults are surfaced as errors.
    fn connect(&mut self, host: &str, port: u16) -> Result<bool>;

    /// Fetch the next pending byte, if any.
    ///
    /// `Ok(None)` means no byte is currently buffered; it does not imply the
    /// peer has gone away.
    fn poll_byte(&mut self) -> Result<Option<u8>>;

    /// Write a buffer to the link.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Flush buffered output.
    fn flush(&mut self) -> Result<()>;

    /// Close the connection. Closing an unconnected link is a no-op.
    fn close(&mut self);
}
