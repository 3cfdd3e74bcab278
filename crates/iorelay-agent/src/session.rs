use iorelay_frame::{WireFrame, MAX_IDENTITY_LEN, MODE_CHANNEL_COMMAND, MODE_TRANSPARENT};
use tracing::{debug, warn};

use crate::error::AgentError;

/// First transmitted sequence id is one above this; the low range stays
/// reserved so a fresh session can never collide with hub bookkeeping.
pub const SEQUENCE_START: u32 = 60;

/// Default poll spacing until the hub supplies its own.
pub const DEFAULT_POLLING_DELAY_MS: u32 = 2000;

/// Outward result of one call into the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No poll was due this call.
    Idle,
    /// A channel-command frame was processed.
    ChannelCommand,
    /// A transparent frame was passed through.
    Transparent,
    /// No response, corrupt frame or identity mismatch.
    LinkError,
    /// The hub echoed a stale sequence id.
    OutOfSequence,
    /// The hub reported our previous frame as unacknowledged.
    AckError,
    /// The hub requested a frame mode this agent does not implement.
    UnsupportedMode,
}

impl PollOutcome {
    /// The numeric code reported to callers.
    pub fn code(self) -> u32 {
        match self {
            PollOutcome::Idle => 0,
            PollOutcome::ChannelCommand => 10,
            PollOutcome::Transparent => 20,
            PollOutcome::LinkError => 50,
            PollOutcome::OutOfSequence => 51,
            PollOutcome::AckError => 52,
            PollOutcome::UnsupportedMode => 53,
        }
    }
}

/// What one receive attempt produced, as seen by the classifier.
#[derive(Debug)]
pub enum RxOutcome {
    /// The retry budget ran out with nothing on the wire.
    NoResponse,
    /// The parser started a frame and aborted; nothing was committed.
    Corrupt,
    /// A fully parsed frame.
    Frame(WireFrame),
}

/// What the orchestrator should do with the cycle.
#[derive(Debug)]
pub enum Disposition {
    Rejected(PollOutcome),
    Transparent(WireFrame),
    ChannelCommand(WireFrame),
    Unsupported,
}

/// Per-hub session bookkeeping: identity, sequencing and poll scheduling.
///
/// All state is volatile; a restart rebuilds the session from scratch.
#[derive(Debug)]
pub struct Session {
    device_id: String,
    shared_secret: String,
    pub tx_sequence_id: u32,
    pub tx_seq_ack: u32,
    pub tx_command: u32,
    pub polling_delay_ms: u32,
    pub exchange_count: u32,
    schedule_deadline: u32,
    last_tick_sample: u32,
}

impl Session {
    pub fn new(device_id: &str, shared_secret: &str) -> Result<Self, AgentError> {
        validate_identity(device_id)?;
        validate_identity(shared_secret)?;
        Ok(Self {
            device_id: device_id.to_string(),
            shared_secret: shared_secret.to_string(),
            tx_sequence_id: SEQUENCE_START,
            tx_seq_ack: 0,
            tx_command: 0,
            polling_delay_ms: DEFAULT_POLLING_DELAY_MS,
            exchange_count: 0,
            schedule_deadline: 0,
            last_tick_sample: 0,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Whether a poll is due at the given millisecond tick.
    ///
    /// The second disjunct catches the tick counter wrapping past zero;
    /// without it a wrap right after scheduling would starve the poll for
    /// a full counter period.
    pub fn poll_due(&self, now: u32) -> bool {
        now > self.schedule_deadline || now < self.last_tick_sample
    }

    /// Start a cycle: reschedule, advance sequence and exchange counters.
    pub fn begin_cycle(&mut self, now: u32) {
        self.last_tick_sample = now;
        self.schedule_deadline = now.wrapping_add(self.polling_delay_ms);
        self.tx_sequence_id = self.tx_sequence_id.wrapping_add(1);
        // Placeholder kept for wire compatibility; counts polls, not bytes.
        self.exchange_count = self.exchange_count.wrapping_add(1);
    }

    /// Build the request frame for the current cycle.
    pub fn outgoing_frame(&self, registers: [u32; 8]) -> WireFrame {
        WireFrame {
            device_id: self.device_id.clone(),
            signature: self.shared_secret.clone(),
            sequence_id: self.tx_sequence_id,
            seq_ack: self.tx_seq_ack,
            command: self.tx_command,
            polling_delay: 0,
            server_delay: 0,
            exchange_count: self.exchange_count,
            registers,
        }
    }

    /// Validate a receive outcome against the session and decide the cycle.
    ///
    /// First match wins: missing/corrupt frame, identity mismatch, sequence
    /// mismatch, stale ack, then mode dispatch. An accepted frame clears the
    /// ack flag and refreshes the poll spacing from the hub's header.
    pub fn classify(&mut self, rx: RxOutcome) -> Disposition {
        self.tx_seq_ack = 1;

        let frame = match rx {
            RxOutcome::NoResponse => {
                debug!("no response from hub");
                return Disposition::Rejected(PollOutcome::LinkError);
            }
            RxOutcome::Corrupt => {
                debug!("corrupt frame from hub");
                return Disposition::Rejected(PollOutcome::LinkError);
            }
            RxOutcome::Frame(frame) => frame,
        };

        self.tx_command = u32::from(frame.mode());

        if frame.device_id != self.device_id || frame.signature != self.shared_secret {
            warn!("frame authentication mismatch");
            return Disposition::Rejected(PollOutcome::LinkError);
        }
        if frame.sequence_id != self.tx_sequence_id {
            warn!(
                expected = self.tx_sequence_id,
                received = frame.sequence_id,
                "frame out of sequence"
            );
            return Disposition::Rejected(PollOutcome::OutOfSequence);
        }
        if frame.seq_ack != 0 {
            warn!(ack = frame.seq_ack, "hub reported ack error");
            return Disposition::Rejected(PollOutcome::AckError);
        }

        self.tx_seq_ack = 0;
        self.polling_delay_ms = frame.polling_delay;

        match frame.mode() {
            MODE_TRANSPARENT => Disposition::Transparent(frame),
            MODE_CHANNEL_COMMAND => Disposition::ChannelCommand(frame),
            mode => {
                warn!(mode, "unsupported frame mode");
                Disposition::Unsupported
            }
        }
    }
}

fn validate_identity(value: &str) -> Result<(), AgentError> {
    if value.is_empty() {
        return Err(AgentError::InvalidIdentity {
            value: value.to_string(),
            reason: "must not be empty",
        });
    }
    if value.len() > MAX_IDENTITY_LEN {
        return Err(AgentError::InvalidIdentity {
            value: value.to_string(),
            reason: "too long",
        });
    }
    if !value.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(AgentError::InvalidIdentity {
            value: value.to_string(),
            reason: "must be printable ASCII",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new("dev42", "s3cret").unwrap()
    }

    fn matching_frame(session: &Session) -> WireFrame {
        WireFrame {
            device_id: "dev42".to_string(),
            signature: "s3cret".to_string(),
            sequence_id: session.tx_sequence_id,
            seq_ack: 0,
            command: 1,
            polling_delay: 4000,
            server_delay: 0,
            exchange_count: 0,
            registers: [0; 8],
        }
    }

    #[test]
    fn rejects_bad_identities() {
        assert!(Session::new("", "x").is_err());
        assert!(Session::new("ninechars", "x").is_err());
        assert!(Session::new("dev 1", "x").is_err());
        assert!(Session::new("dev1", "ok").is_ok());
    }

    #[test]
    fn first_cycle_transmits_sequence_sixty_one() {
        let mut s = session();
        s.begin_cycle(1);
        assert_eq!(s.tx_sequence_id, 61);
        assert_eq!(s.exchange_count, 1);
    }

    #[test]
    fn poll_schedule_honors_delay() {
        let mut s = session();
        s.begin_cycle(1000);
        assert!(!s.poll_due(1500));
        assert!(!s.poll_due(3000));
        assert!(s.poll_due(3001));
    }

    #[test]
    fn poll_due_on_clock_wrap() {
        let mut s = session();
        s.begin_cycle(4_294_967_290);
        assert!(s.poll_due(100));
    }

    #[test]
    fn no_response_is_a_link_error() {
        let mut s = session();
        s.begin_cycle(1);
        let d = s.classify(RxOutcome::NoResponse);
        assert!(matches!(d, Disposition::Rejected(PollOutcome::LinkError)));
        assert_eq!(s.tx_seq_ack, 1);
    }

    #[test]
    fn corrupt_frame_is_a_link_error() {
        let mut s = session();
        let d = s.classify(RxOutcome::Corrupt);
        assert!(matches!(d, Disposition::Rejected(PollOutcome::LinkError)));
    }

    #[test]
    fn identity_mismatch_is_a_link_error() {
        let mut s = session();
        s.begin_cycle(1);
        let mut frame = matching_frame(&s);
        frame.signature = "someone".to_string();
        let d = s.classify(RxOutcome::Frame(frame));
        assert!(matches!(d, Disposition::Rejected(PollOutcome::LinkError)));
    }

    #[test]
    fn stale_sequence_is_out_of_sequence() {
        let mut s = session();
        s.begin_cycle(1);
        assert_eq!(s.tx_sequence_id, 61);
        let mut frame = matching_frame(&s);
        frame.sequence_id = 60;
        let d = s.classify(RxOutcome::Frame(frame));
        assert!(matches!(
            d,
            Disposition::Rejected(PollOutcome::OutOfSequence)
        ));
        assert_eq!(PollOutcome::OutOfSequence.code(), 51);
    }

    #[test]
    fn nonzero_ack_is_an_ack_error() {
        let mut s = session();
        s.begin_cycle(1);
        let mut frame = matching_frame(&s);
        frame.seq_ack = 1;
        let d = s.classify(RxOutcome::Frame(frame));
        assert!(matches!(d, Disposition::Rejected(PollOutcome::AckError)));
        assert_eq!(PollOutcome::AckError.code(), 52);
    }

    #[test]
    fn accepted_frame_clears_ack_and_refreshes_delay() {
        let mut s = session();
        s.begin_cycle(1);
        let frame = matching_frame(&s);
        let d = s.classify(RxOutcome::Frame(frame));
        assert!(matches!(d, Disposition::ChannelCommand(_)));
        assert_eq!(s.tx_seq_ack, 0);
        assert_eq!(s.polling_delay_ms, 4000);
        assert_eq!(s.tx_command, 1);
    }

    #[test]
    fn transparent_mode_dispatches_to_passthrough() {
        let mut s = session();
        s.begin_cycle(1);
        let mut frame = matching_frame(&s);
        frame.command = 2;
        let d = s.classify(RxOutcome::Frame(frame));
        assert!(matches!(d, Disposition::Transparent(_)));
    }

    #[test]
    fn unknown_mode_is_unsupported_but_still_acked() {
        let mut s = session();
        s.begin_cycle(1);
        let mut frame = matching_frame(&s);
        frame.command = 9;
        let d = s.classify(RxOutcome::Frame(frame));
        assert!(matches!(d, Disposition::Unsupported));
        assert_eq!(s.tx_seq_ack, 0);
        assert_eq!(s.polling_delay_ms, 4000);
    }

    #[test]
    fn rejected_frame_keeps_session_delay() {
        let mut s = session();
        s.begin_cycle(1);
        let mut frame = matching_frame(&s);
        frame.sequence_id = 7;
        s.classify(RxOutcome::Frame(frame));
        assert_eq!(s.polling_delay_ms, DEFAULT_POLLING_DELAY_MS);
    }

    #[test]
    fn outward_codes_match_the_wire_contract() {
        assert_eq!(PollOutcome::Idle.code(), 0);
        assert_eq!(PollOutcome::ChannelCommand.code(), 10);
        assert_eq!(PollOutcome::Transparent.code(), 20);
        assert_eq!(PollOutcome::LinkError.code(), 50);
        assert_eq!(PollOutcome::UnsupportedMode.code(), 53);
    }
}
