use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use iorelay_frame::WireFrame;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    schema_id: &'a str,
    device_id: &'a str,
    sequence_id: u32,
    seq_ack: u32,
    command: u32,
    mode: u8,
    polling_delay: u32,
    server_delay: u32,
    exchange_count: u32,
    registers: [u32; 8],
}

pub fn print_frame(frame: &WireFrame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                schema_id: "https://schemas.3leaps.dev/iorelay/cli/v1/frame.schema.json",
                device_id: &frame.device_id,
                sequence_id: frame.sequence_id,
                seq_ack: frame.seq_ack,
                command: frame.command,
                mode: frame.mode(),
                polling_delay: frame.polling_delay,
                server_delay: frame.server_delay,
                exchange_count: frame.exchange_count,
                registers: frame.registers,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["device_id".to_string(), frame.device_id.clone()])
                .add_row(vec!["sequence_id".to_string(), frame.sequence_id.to_string()])
                .add_row(vec!["seq_ack".to_string(), frame.seq_ack.to_string()])
                .add_row(vec![
                    "command".to_string(),
                    format!("{:#010x} (mode {})", frame.command, frame.mode()),
                ])
                .add_row(vec![
                    "polling_delay".to_string(),
                    frame.polling_delay.to_string(),
                ])
                .add_row(vec![
                    "server_delay".to_string(),
                    frame.server_delay.to_string(),
                ])
                .add_row(vec![
                    "exchange_count".to_string(),
                    frame.exchange_count.to_string(),
                ]);
            for (slot, value) in frame.registers.iter().enumerate() {
                table.add_row(vec![format!("register[{slot}]"), format!("{value:#010x}")]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "seq={} ack={} mode={} delay={} registers={:?}",
                frame.sequence_id,
                frame.seq_ack,
                frame.mode(),
                frame.polling_delay,
                frame.registers
            );
        }
        OutputFormat::Raw => {
            println!(
                "{} {} {} {}",
                frame.sequence_id,
                frame.seq_ack,
                frame.command,
                frame
                    .registers
                    .map(|r| r.to_string())
                    .join(" ")
            );
        }
    }
}

#[derive(Serialize)]
struct CycleOutput<'a> {
    schema_id: &'a str,
    cycle: u64,
    code: u32,
    outcome: &'a str,
    tx: [u32; 8],
    rx: [u32; 8],
}

pub fn print_cycle(
    cycle: u64,
    code: u32,
    outcome: &str,
    tx: &[u32; 8],
    rx: &[u32; 8],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = CycleOutput {
                schema_id: "https://schemas.3leaps.dev/iorelay/cli/v1/cycle.schema.json",
                cycle,
                code,
                outcome,
                tx: *tx,
                rx: *rx,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CYCLE", "CODE", "OUTCOME", "TX", "RX"])
                .add_row(vec![
                    cycle.to_string(),
                    code.to_string(),
                    outcome.to_string(),
                    format!("{tx:?}"),
                    format!("{rx:?}"),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("cycle={cycle} code={code} outcome={outcome} tx={tx:?} rx={rx:?}");
        }
        OutputFormat::Raw => {
            println!("{code}");
        }
    }
}
