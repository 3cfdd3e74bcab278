use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use iorelay_agent::{Agent, AgentConfig, PollOutcome, SimGpio, TICK_MS};
use iorelay_transport::TcpLink;
use tracing::info;

use crate::cmd::RunArgs;
use crate::exit::{agent_error, CliResult, SUCCESS};
use crate::output::{print_cycle, OutputFormat};

/// Spacing of scheduling decisions; the session decides whether a poll is
/// actually due.
const LOOP_INTERVAL: Duration = Duration::from_millis(20);

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let config = AgentConfig {
        host: args.host.clone(),
        port: args.port,
        api_path: args.api_path.clone(),
        ..AgentConfig::default()
    };

    let mut agent = Agent::new(TcpLink::new(), SimGpio::new(), &args.device, &args.secret, config)
        .map_err(|err| agent_error("agent init failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        let _ = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst));
    }

    // Tick flow: fixed short period, independent of the poll cadence.
    let ticker = agent.tick_handle();
    let tick_running = Arc::clone(&running);
    let tick_thread = thread::spawn(move || {
        while tick_running.load(Ordering::SeqCst) {
            ticker.tick();
            thread::sleep(Duration::from_millis(u64::from(TICK_MS)));
        }
    });

    info!(host = %args.host, port = args.port, "agent loop started");

    let mut tx = [0u32; 8];
    let mut rx = [0u32; 8];
    let mut completed: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let outcome = agent.poll(&mut tx, &mut rx);
        if outcome != PollOutcome::Idle {
            completed += 1;
            print_cycle(
                completed,
                outcome.code(),
                outcome_name(outcome),
                &tx,
                &rx,
                format,
            );
            if args.cycles != 0 && completed >= args.cycles {
                break;
            }
        }
        thread::sleep(LOOP_INTERVAL);
    }

    running.store(false, Ordering::SeqCst);
    let _ = tick_thread.join();
    info!(completed, "agent loop stopped");
    Ok(SUCCESS)
}

fn outcome_name(outcome: PollOutcome) -> &'static str {
    match outcome {
        PollOutcome::Idle => "idle",
        PollOutcome::ChannelCommand => "channel-command",
        PollOutcome::Transparent => "transparent",
        PollOutcome::LinkError => "link-error",
        PollOutcome::OutOfSequence => "out-of-sequence",
        PollOutcome::AckError => "ack-error",
        PollOutcome::UnsupportedMode => "unsupported-mode",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_names_cover_every_code() {
        for outcome in [
            PollOutcome::Idle,
            PollOutcome::ChannelCommand,
            PollOutcome::Transparent,
            PollOutcome::LinkError,
            PollOutcome::OutOfSequence,
            PollOutcome::AckError,
            PollOutcome::UnsupportedMode,
        ] {
            assert!(!outcome_name(outcome).is_empty());
        }
    }
}
