/// Errors that can occur in hub transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the hub endpoint.
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An operation was attempted on a link that is not connected.
    #[error("link not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, TransportError>;
