use std::fs;
use std::io::Read;
use std::time::Duration;

use iorelay_frame::{FrameParser, ParserConfig};
use iorelay_transport::{HubLink, Result as TransportResult};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

/// Replays a capture buffer through the `HubLink` seam so the real parser
/// does the work.
struct BufferLink {
    bytes: Vec<u8>,
    pos: usize,
}

impl HubLink for BufferLink {
    fn connect(&mut self, _host: &str, _port: u16) -> TransportResult<bool> {
        Ok(true)
    }

    fn poll_byte(&mut self) -> TransportResult<Option<u8>> {
        if self.pos >= self.bytes.len() {
            return Ok(None);
        }
        let byte = self.bytes[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    fn write_all(&mut self, _bytes: &[u8]) -> TransportResult<()> {
        Ok(())
    }

    fn flush(&mut self) -> TransportResult<()> {
        Ok(())
    }

    fn close(&mut self) {}
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = match &args.file {
        Some(path) => fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| io_error("failed reading stdin", err))?;
            buf
        }
    };

    let mut link = BufferLink { bytes, pos: 0 };
    // Capture replay has no live peer to wait on.
    let parser = FrameParser::with_config(ParserConfig {
        char_poll_attempts: 1,
        char_poll_interval: Duration::ZERO,
        ..ParserConfig::default()
    });

    let frame = parser
        .try_read_frame(&mut link)
        .map_err(|err| frame_error("decode failed", err))?
        .ok_or_else(|| CliError::new(DATA_INVALID, "decode failed: capture is empty"))?;

    print_frame(&frame, format);
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use iorelay_frame::{encode_frame, WireFrame};

    #[test]
    fn buffer_link_replays_and_runs_dry() {
        let mut link = BufferLink {
            bytes: vec![1, 2],
            pos: 0,
        };
        assert_eq!(link.poll_byte().unwrap(), Some(1));
        assert_eq!(link.poll_byte().unwrap(), Some(2));
        assert_eq!(link.poll_byte().unwrap(), None);
    }

    #[test]
    fn capture_with_tag_decodes() {
        let frame = WireFrame {
            device_id: "dev1".to_string(),
            signature: "sig1".to_string(),
            sequence_id: 99,
            ..WireFrame::default()
        };
        let mut body = BytesMut::new();
        encode_frame(&frame, &mut body).unwrap();
        let mut bytes = b"DATA\n".to_vec();
        bytes.extend_from_slice(&body);

        let mut link = BufferLink { bytes, pos: 0 };
        let parser = FrameParser::with_config(ParserConfig {
            char_poll_attempts: 1,
            char_poll_interval: Duration::ZERO,
            ..ParserConfig::default()
        });
        let parsed = parser.try_read_frame(&mut link).unwrap().unwrap();
        assert_eq!(parsed.sequence_id, 99);
    }
}
