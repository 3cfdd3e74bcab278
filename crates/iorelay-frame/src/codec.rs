use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Start tag prefixing every hub response body.
pub const START_TAG: [u8; 4] = *b"DATA";

/// Registers carried per frame.
pub const REGISTER_COUNT: usize = 8;

/// Maximum content bytes of the device-id and signature fields.
pub const MAX_IDENTITY_LEN: usize = 8;

/// Maximum content bytes of a numeric field (u32 in decimal ASCII).
pub const MAX_NUMBER_DIGITS: usize = 10;

/// Frame mode requesting per-channel command dispatch.
pub const MODE_CHANNEL_COMMAND: u8 = 1;

/// Frame mode requesting raw register passthrough.
pub const MODE_TRANSPARENT: u8 = 2;

/// One request or response exchange: 16 newline-terminated fields.
///
/// Wire layout (every field decimal ASCII unless noted):
/// ```text
/// device-id        (text, <= 8 bytes)
/// signature        (text, <= 8 bytes)
/// sequence-id      \
/// seq-ack           |
/// command           |  header block
/// polling-delay     |  (requests send the delay slots as 0)
/// server-delay      |
/// exchange-count   /
/// register 0..7    (8 lines)
/// ```
/// Responses are preceded by the literal `DATA` tag and one newline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireFrame {
    pub device_id: String,
    pub signature: String,
    pub sequence_id: u32,
    pub seq_ack: u32,
    pub command: u32,
    pub polling_delay: u32,
    pub server_delay: u32,
    pub exchange_count: u32,
    pub registers: [u32; REGISTER_COUNT],
}

impl WireFrame {
    /// Frame mode: low byte of the command header.
    pub fn mode(&self) -> u8 {
        (self.command & 0x0000_00FF) as u8
    }

    /// Remote-debug flag: second byte of the command header.
    pub fn remote_debug(&self) -> u8 {
        ((self.command >> 8) & 0x0000_00FF) as u8
    }
}

/// Encode the 16-line frame body into `dst`.
///
/// The body carries no tag; requests go on the wire as-is, responses are
/// what remains after the parser has consumed `DATA\n`.
pub fn encode_frame(frame: &WireFrame, dst: &mut BytesMut) -> Result<()> {
    put_identity(dst, &frame.device_id)?;
    put_identity(dst, &frame.signature)?;

    for value in [
        frame.sequence_id,
        frame.seq_ack,
        frame.command,
        frame.polling_delay,
        frame.server_delay,
        frame.exchange_count,
    ] {
        put_number(dst, value);
    }
    for value in frame.registers {
        put_number(dst, value);
    }
    Ok(())
}

/// Build the HTTP POST preamble the hub expects ahead of a request body.
pub fn post_preamble(api_path: &str, host: &str, body_len: usize, dst: &mut BytesMut) {
    dst.put_slice(b"POST ");
    dst.put_slice(api_path.as_bytes());
    dst.put_slice(b" HTTP/1.0\r\n");
    dst.put_slice(b"Host: ");
    dst.put_slice(host.as_bytes());
    dst.put_slice(b"\r\n");
    dst.put_slice(b"Content-Type: text/html\r\n");
    dst.put_slice(b"Content-Length: ");
    dst.put_slice(body_len.to_string().as_bytes());
    dst.put_slice(b"\r\n\r\n");
}

fn put_identity(dst: &mut BytesMut, value: &str) -> Result<()> {
    if value.len() > MAX_IDENTITY_LEN {
        return Err(FrameError::IdentityTooLong {
            len: value.len(),
            max: MAX_IDENTITY_LEN,
        });
    }
    dst.put_slice(value.as_bytes());
    dst.put_u8(b'\n');
    Ok(())
}

fn put_number(dst: &mut BytesMut, value: u32) {
    dst.put_slice(value.to_string().as_bytes());
    dst.put_u8(b'\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> WireFrame {
        WireFrame {
            device_id: "AB12CD34".to_string(),
            signature: "secret01".to_string(),
            sequence_id: 61,
            seq_ack: 1,
            command: 0x0101,
            polling_delay: 0,
            server_delay: 0,
            exchange_count: 7,
            registers: [1, 2, 3, 4, 5, 6, 7, u32::MAX],
        }
    }

    #[test]
    fn encode_produces_sixteen_lines() {
        let mut buf = BytesMut::new();
        encode_frame(&sample_frame(), &mut buf).unwrap();

        let text = std::str::from_utf8(&buf).unwrap();
        assert_eq!(text.bytes().filter(|&b| b == b'\n').count(), 16);
        assert!(text.starts_with("AB12CD34\nsecret01\n61\n1\n257\n0\n0\n7\n"));
        assert!(text.ends_with("4294967295\n"));
    }

    #[test]
    fn encode_rejects_long_identity() {
        let mut frame = sample_frame();
        frame.device_id = "way-too-long-id".to_string();
        let mut buf = BytesMut::new();
        let err = encode_frame(&frame, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::IdentityTooLong { len: 15, .. }));
    }

    #[test]
    fn mode_and_debug_come_from_command_bytes() {
        let frame = WireFrame {
            command: 0x0000_0102,
            ..WireFrame::default()
        };
        assert_eq!(frame.mode(), 2);
        assert_eq!(frame.remote_debug(), 1);
    }

    #[test]
    fn preamble_carries_body_length() {
        let mut buf = BytesMut::new();
        post_preamble("/v1/hub", "relay.example.net", 123, &mut buf);
        let text = std::str::from_utf8(&buf).unwrap();
        assert!(text.starts_with("POST /v1/hub HTTP/1.0\r\n"));
        assert!(text.contains("Host: relay.example.net\r\n"));
        assert!(text.ends_with("Content-Length: 123\r\n\r\n"));
    }
}
