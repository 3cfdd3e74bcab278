/// Errors that can occur while setting up or driving the agent.
///
/// Poll cycles themselves never fail outward; transport and parse problems
/// are absorbed into the outward code of the cycle.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Device id or shared secret rejected at initialization.
    #[error("invalid identity field '{value}': {reason}")]
    InvalidIdentity { value: String, reason: &'static str },

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] iorelay_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] iorelay_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
