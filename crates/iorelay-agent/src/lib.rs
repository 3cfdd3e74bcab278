//! Channel bank, session state machine and poll orchestrator for the
//! iorelay agent.
//!
//! The agent owns a fixed bank of four virtual I/O channels, each in one of
//! a closed set of modes. Two control flows touch that bank: the poll
//! orchestrator, which exchanges one frame with the hub per due cycle and
//! dispatches the commands it carries, and the tick scheduler, which
//! advances timed channel behavior (pulses, counters, edge detection) every
//! few milliseconds. Both reach the bank through one mutex.
//!
//! # Crate Structure
//!
//! - [`hal`] — GPIO seam plus an in-memory simulation
//! - [`channel`] — channel records, modes and the bank
//! - [`command`] — register-pair command decoding
//! - [`session`] — sequencing, authentication checks, poll scheduling
//! - [`agent`] — the caller-facing poll entry point and tick handle

pub mod agent;
pub mod channel;
pub mod clock;
pub mod command;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod hal;
pub mod rms;
pub mod session;
pub mod tick;

pub use agent::{Agent, AgentConfig, TickHandle};
pub use channel::{Channel, ChannelBank, ChannelMode, CHANNEL_COUNT};
pub use clock::{Clock, SystemClock};
pub use command::{Command, Method, ServiceGroup};
pub use crate::core::IoCore;
pub use error::{AgentError, Result};
pub use hal::{AnalogReference, Gpio, PinConfig, SimGpio};
pub use session::{
    PollOutcome, RxOutcome, Session, DEFAULT_POLLING_DELAY_MS, SEQUENCE_START,
};
pub use tick::TICK_MS;
