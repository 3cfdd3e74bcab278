/// Errors that can occur while encoding or parsing wire frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The per-character polling budget was exhausted mid-frame.
    #[error("timed out waiting for the next byte")]
    Timeout,

    /// The start tag did not appear within the scan budget.
    #[error("start tag not found ({scanned} bytes scanned)")]
    FramingError { scanned: usize },

    /// A field exceeded its maximum content length without a newline.
    #[error("field '{field}' too long (no newline within {max} bytes)")]
    FieldTooLong { field: &'static str, max: usize },

    /// A numeric field contained a non-decimal byte or overflowed 32 bits.
    #[error("field '{field}' is not an unsigned decimal number")]
    InvalidNumber { field: &'static str },

    /// An identity field handed to the encoder exceeds the wire limit.
    #[error("identity field too long ({len} bytes, max {max})")]
    IdentityTooLong { len: usize, max: usize },

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] iorelay_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
