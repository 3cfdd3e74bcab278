use std::time::Duration;

use iorelay_transport::HubLink;
use tracing::trace;

use crate::codec::{WireFrame, MAX_IDENTITY_LEN, MAX_NUMBER_DIGITS, REGISTER_COUNT, START_TAG};
use crate::error::{FrameError, Result};

/// Tuning knobs for the byte-at-a-time response parser.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Poll attempts per character before declaring a timeout.
    pub char_poll_attempts: u32,
    /// Spacing between character poll attempts.
    pub char_poll_interval: Duration,
    /// Bytes scanned for the start tag before giving up.
    pub tag_scan_limit: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            char_poll_attempts: 300,
            char_poll_interval: Duration::from_millis(10),
            tag_scan_limit: 400,
        }
    }
}

/// Parses hub responses out of an unreliable character stream.
///
/// The stream has no length prefix, so framing is self-delimiting: scan for
/// the start tag, then read the fixed 16-field line layout. Every abort
/// discards the partial frame; committed state is only ever a fully parsed
/// [`WireFrame`].
#[derive(Debug, Default)]
pub struct FrameParser {
    config: ParserConfig,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Attempt to read one complete response frame.
    ///
    /// `Ok(None)` means the link had no pending byte at all; the caller
    /// retries on its own frame-level schedule. Once the first byte is seen
    /// the parse runs to completion or aborts with an error.
    pub fn try_read_frame<L: HubLink>(&self, link: &mut L) -> Result<Option<WireFrame>> {
        let Some(first) = link.poll_byte()? else {
            return Ok(None);
        };

        self.scan_start_tag(link, first)?;
        if self.read_char(link)? != b'\n' {
            return Err(FrameError::FramingError { scanned: 0 });
        }

        let mut frame = WireFrame {
            device_id: self.read_identity(link, "device-id")?,
            signature: self.read_identity(link, "signature")?,
            ..WireFrame::default()
        };

        frame.sequence_id = self.read_number(link, "sequence-id")?;
        frame.seq_ack = self.read_number(link, "seq-ack")?;
        frame.command = self.read_number(link, "command")?;
        frame.polling_delay = self.read_number(link, "polling-delay")?;
        frame.server_delay = self.read_number(link, "server-delay")?;
        frame.exchange_count = self.read_number(link, "exchange-count")?;

        for slot in 0..REGISTER_COUNT {
            frame.registers[slot] = self.read_number(link, "register")?;
        }

        trace!(sequence = frame.sequence_id, mode = frame.mode(), "frame parsed");
        Ok(Some(frame))
    }

    /// Wait for the next byte, polling within the configured budget.
    fn read_char<L: HubLink>(&self, link: &mut L) -> Result<u8> {
        for attempt in 0..self.config.char_poll_attempts {
            if let Some(byte) = link.poll_byte()? {
                return Ok(byte);
            }
            if attempt + 1 < self.config.char_poll_attempts {
                std::thread::sleep(self.config.char_poll_interval);
            }
        }
        Err(FrameError::Timeout)
    }

    fn scan_start_tag<L: HubLink>(&self, link: &mut L, first: u8) -> Result<()> {
        let mut scanned = 0usize;
        let mut matched = 0usize;
        let mut byte = first;
        loop {
            scanned += 1;
            if scanned > self.config.tag_scan_limit {
                return Err(FrameError::FramingError { scanned });
            }

            if byte == START_TAG[matched] {
                matched += 1;
                if matched == START_TAG.len() {
                    return Ok(());
                }
            } else if byte == START_TAG[0] {
                matched = 1;
            } else {
                matched = 0;
            }

            byte = self.read_char(link)?;
        }
    }

    /// Text field: up to 8 content bytes terminated by a newline.
    fn read_identity<L: HubLink>(&self, link: &mut L, field: &'static str) -> Result<String> {
        let mut out = String::new();
        for _ in 0..=MAX_IDENTITY_LEN {
            let byte = self.read_char(link)?;
            if byte == b'\n' {
                return Ok(out);
            }
            if out.len() == MAX_IDENTITY_LEN {
                break;
            }
            out.push(byte as char);
        }
        Err(FrameError::FieldTooLong {
            field,
            max: MAX_IDENTITY_LEN,
        })
    }

    /// Numeric field: up to 10 decimal digits terminated by a newline.
    ///
    /// An empty field parses as 0, matching the lenient hub encoder.
    fn read_number<L: HubLink>(&self, link: &mut L, field: &'static str) -> Result<u32> {
        let mut value: u32 = 0;
        for digits in 0..=MAX_NUMBER_DIGITS {
            let byte = self.read_char(link)?;
            if byte == b'\n' {
                return Ok(value);
            }
            if digits == MAX_NUMBER_DIGITS {
                break;
            }
            if !byte.is_ascii_digit() {
                return Err(FrameError::InvalidNumber { field });
            }
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u32::from(byte - b'0')))
                .ok_or(FrameError::InvalidNumber { field })?;
        }
        Err(FrameError::FieldTooLong {
            field,
            max: MAX_NUMBER_DIGITS,
        })
    }
}
