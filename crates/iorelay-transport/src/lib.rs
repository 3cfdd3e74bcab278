//! Byte-stream transport abstraction for the iorelay agent.
//!
//! The agent talks to its hub over a short-lived connection per poll cycle.
//! This crate defines the [`HubLink`] seam the rest of the workspace builds
//! on, plus the production TCP implementation.

pub mod error;
pub mod link;
pub mod tcp;

pub use error::{Result, TransportError};
pub use link::HubLink;
pub use tcp::TcpLink;
