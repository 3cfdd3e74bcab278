//! Line-oriented wire frame codec for the iorelay hub protocol.
//!
//! Every exchange with the hub is one 16-field text frame: two identity
//! lines, six decimal header lines and eight decimal register lines, each
//! newline-terminated. Responses arrive on a raw character stream with no
//! length prefix, so the parser is self-delimiting: it hunts for the `DATA`
//! start tag under a byte budget and applies per-character timeouts while
//! walking the fixed layout.

pub mod codec;
pub mod error;
pub mod parser;

pub use codec::{
    encode_frame, post_preamble, WireFrame, MAX_IDENTITY_LEN, MAX_NUMBER_DIGITS,
    MODE_CHANNEL_COMMAND, MODE_TRANSPARENT, REGISTER_COUNT, START_TAG,
};
pub use error::{FrameError, Result};
pub use parser::{FrameParser, ParserConfig};
