use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::BytesMut;
use iorelay_frame::{encode_frame, post_preamble, FrameParser, ParserConfig, REGISTER_COUNT};
use iorelay_transport::HubLink;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::core::IoCore;
use crate::error::Result;
use crate::hal::Gpio;
use crate::session::{Disposition, PollOutcome, RxOutcome, Session};

/// Tuning for one agent instance.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Hub endpoint.
    pub host: String,
    pub port: u16,
    /// Request path sent in the POST preamble.
    pub api_path: String,
    /// Frame-level receive attempts per cycle.
    pub response_retries: u32,
    /// Spacing between receive attempts. Cloud turnaround can exceed 7 s,
    /// so the defaults wait out up to 10 s.
    pub response_retry_interval: Duration,
    /// Byte-level parser tuning.
    pub parser: ParserConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: "hub.iorelay.dev".to_string(),
            port: 80,
            api_path: "/v1/relay_hub".to_string(),
            response_retries: 20,
            response_retry_interval: Duration::from_millis(500),
            parser: ParserConfig::default(),
        }
    }
}

/// Cloneable handle the tick flow drives the shared channel bank through.
#[derive(Debug)]
pub struct TickHandle<G> {
    core: Arc<Mutex<IoCore<G>>>,
}

impl<G> Clone for TickHandle<G> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<G: Gpio> TickHandle<G> {
    /// Advance timed channel behavior by one tick.
    ///
    /// Takes the bank lock for exactly one pass; the poll flow only ever
    /// holds that lock for in-memory dispatch, so this cannot block on I/O.
    pub fn tick(&self) {
        lock_core(&self.core).tick();
    }

    /// Run a closure against the shared core, under the lock.
    pub fn with_core<R>(&self, f: impl FnOnce(&mut IoCore<G>) -> R) -> R {
        f(&mut lock_core(&self.core))
    }
}

/// The on-device agent: session, channel bank and poll orchestration.
///
/// One instance per device. [`Agent::poll`] is the caller-facing entry
/// point; it decides whether a cycle is due, runs the exchange and reports
/// one outward code per call.
pub struct Agent<L, G, C = SystemClock> {
    link: L,
    session: Session,
    parser: FrameParser,
    core: Arc<Mutex<IoCore<G>>>,
    clock: C,
    config: AgentConfig,
}

impl<L: HubLink, G: Gpio> Agent<L, G, SystemClock> {
    /// Initialize the agent with its device identity.
    ///
    /// Fails only on an invalid identity; everything at poll time is
    /// absorbed into outward codes.
    pub fn new(
        link: L,
        gpio: G,
        device_id: &str,
        shared_secret: &str,
        config: AgentConfig,
    ) -> Result<Self> {
        Self::with_clock(link, gpio, device_id, shared_secret, config, SystemClock::new())
    }
}

impl<L: HubLink, G: Gpio, C: Clock> Agent<L, G, C> {
    pub fn with_clock(
        link: L,
        gpio: G,
        device_id: &str,
        shared_secret: &str,
        config: AgentConfig,
        clock: C,
    ) -> Result<Self> {
        let session = Session::new(device_id, shared_secret)?;
        info!(device_id = session.device_id(), "agent initialized");
        Ok(Self {
            link,
            session,
            parser: FrameParser::with_config(config.parser.clone()),
            core: Arc::new(Mutex::new(IoCore::new(gpio))),
            clock,
            config,
        })
    }

    /// Handle for the tick scheduler flow.
    pub fn tick_handle(&self) -> TickHandle<G> {
        TickHandle {
            core: Arc::clone(&self.core),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run one scheduling decision and, if a poll is due, one full cycle.
    ///
    /// `tx` carries the registers to transmit; `rx` receives the hub's
    /// registers. On a channel-command cycle `tx` is overwritten with the
    /// echo/result pairs that go out next cycle. Never fails outward; every
    /// transport or parse problem costs this cycle and nothing else.
    pub fn poll(
        &mut self,
        tx: &mut [u32; REGISTER_COUNT],
        rx: &mut [u32; REGISTER_COUNT],
    ) -> PollOutcome {
        let now = self.clock.ticks_ms();
        if !self.session.poll_due(now) {
            return PollOutcome::Idle;
        }
        self.session.begin_cycle(now);

        let outgoing = self.session.outgoing_frame(*tx);
        *rx = [0; REGISTER_COUNT];

        self.send_request(&outgoing);
        let received = self.await_response();
        let _ = self.link.flush();
        self.link.close();

        match self.session.classify(received) {
            Disposition::Rejected(outcome) => outcome,
            Disposition::Unsupported => PollOutcome::UnsupportedMode,
            Disposition::Transparent(frame) => {
                *rx = frame.registers;
                PollOutcome::Transparent
            }
            Disposition::ChannelCommand(frame) => {
                *rx = frame.registers;
                let mut core = lock_core(&self.core);
                for pair in 0..REGISTER_COUNT / 2 {
                    let word = frame.registers[pair * 2];
                    let argument = frame.registers[pair * 2 + 1];
                    let result = core.execute(word, argument);
                    tx[pair * 2] = word;
                    tx[pair * 2 + 1] = result;
                }
                PollOutcome::ChannelCommand
            }
        }
    }

    fn send_request(&mut self, frame: &iorelay_frame::WireFrame) {
        match self.link.connect(&self.config.host, self.config.port) {
            Ok(true) => {}
            Ok(false) => {
                warn!(host = %self.config.host, port = self.config.port, "hub refused connection");
                return;
            }
            Err(err) => {
                warn!(error = %err, "hub connect failed");
                return;
            }
        }

        let mut body = BytesMut::new();
        if let Err(err) = encode_frame(frame, &mut body) {
            // Identity is validated at init, so this cannot fire for a
            // well-formed session; absorb it like any other cycle fault.
            warn!(error = %err, "request frame rejected by encoder");
            return;
        }

        let mut wire = BytesMut::new();
        post_preamble(&self.config.api_path, &self.config.host, body.len(), &mut wire);
        wire.extend_from_slice(&body);

        if let Err(err) = self
            .link
            .write_all(&wire)
            .and_then(|()| self.link.flush())
        {
            warn!(error = %err, "request transmit failed");
        } else {
            debug!(
                sequence = frame.sequence_id,
                bytes = wire.len(),
                "request sent"
            );
        }
    }

    fn await_response(&mut self) -> RxOutcome {
        for attempt in 0..self.config.response_retries {
            match self.parser.try_read_frame(&mut self.link) {
                Ok(Some(frame)) => {
                    debug!(attempt, sequence = frame.sequence_id, "response parsed");
                    return RxOutcome::Frame(frame);
                }
                Ok(None) => {
                    if attempt + 1 < self.config.response_retries {
                        std::thread::sleep(self.config.response_retry_interval);
                    }
                }
                Err(err) => {
                    debug!(attempt, error = %err, "response parse aborted");
                    return RxOutcome::Corrupt;
                }
            }
        }
        RxOutcome::NoResponse
    }
}

fn lock_core<G>(core: &Arc<Mutex<IoCore<G>>>) -> std::sync::MutexGuard<'_, IoCore<G>> {
    core.lock().unwrap_or_else(PoisonError::into_inner)
}
