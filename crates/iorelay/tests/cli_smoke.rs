use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::Command;
use std::thread;
use std::time::Duration;

use bytes::BytesMut;
use iorelay_frame::{encode_frame, WireFrame};

fn unique_temp_file(tag: &str) -> PathBuf {
    PathBuf::from(format!(
        "/tmp/iorelay-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ))
}

fn hub_response(sequence: u32, registers: [u32; 8]) -> Vec<u8> {
    let frame = WireFrame {
        device_id: "dev42".to_string(),
        signature: "s3cret".to_string(),
        sequence_id: sequence,
        seq_ack: 0,
        command: 1,
        polling_delay: 2000,
        server_delay: 0,
        exchange_count: 1,
        registers,
    };
    let mut body = BytesMut::new();
    encode_frame(&frame, &mut body).expect("response frame should encode");

    let mut wire = b"HTTP/1.0 200 OK\r\nContent-Type: text/html\r\n\r\nDATA\n".to_vec();
    wire.extend_from_slice(&body);
    wire
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_iorelay"))
        .arg("version")
        .output()
        .expect("version command should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn decode_prints_frame_fields_as_json() {
    let frame = WireFrame {
        device_id: "dev42".to_string(),
        signature: "s3cret".to_string(),
        sequence_id: 61,
        seq_ack: 0,
        command: 2,
        polling_delay: 2000,
        server_delay: 0,
        exchange_count: 3,
        registers: [9, 8, 7, 6, 5, 4, 3, 2],
    };
    let mut body = BytesMut::new();
    encode_frame(&frame, &mut body).expect("capture frame should encode");
    let mut capture = b"DATA\n".to_vec();
    capture.extend_from_slice(&body);

    let path = unique_temp_file("capture");
    std::fs::write(&path, &capture).expect("capture file should be writable");

    let output = Command::new(env!("CARGO_BIN_EXE_iorelay"))
        .arg("decode")
        .arg(&path)
        .arg("--format")
        .arg("json")
        .output()
        .expect("decode command should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"sequence_id\":61"));
    assert!(stdout.contains("\"mode\":2"));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn decode_rejects_tagless_garbage() {
    let path = unique_temp_file("garbage");
    std::fs::write(&path, vec![b'x'; 500]).expect("garbage file should be writable");

    let output = Command::new(env!("CARGO_BIN_EXE_iorelay"))
        .arg("decode")
        .arg(&path)
        .output()
        .expect("decode command should run");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(60));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn run_completes_one_cycle_against_a_mock_hub() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("mock hub should bind");
    let port = listener.local_addr().expect("hub address").port();

    let hub = thread::spawn(move || {
        let (mut peer, _) = listener.accept().expect("agent should connect");
        // Drain whatever part of the request has arrived, then answer the
        // first cycle's sequence id.
        peer.set_read_timeout(Some(Duration::from_millis(500)))
            .expect("read timeout should apply");
        let mut sink = [0u8; 1024];
        let _ = peer.read(&mut sink);

        let mut registers = [0u32; 8];
        registers[0] = 0x0200_0060; // POST servo, channel 0
        registers[1] = 3000;
        peer.write_all(&hub_response(61, registers))
            .expect("response should send");
    });

    let output = Command::new(env!("CARGO_BIN_EXE_iorelay"))
        .arg("--log-level")
        .arg("error")
        .arg("--format")
        .arg("json")
        .arg("run")
        .arg("--device")
        .arg("dev42")
        .arg("--secret")
        .arg("s3cret")
        .arg("--host")
        .arg("127.0.0.1")
        .arg("--port")
        .arg(port.to_string())
        .arg("--cycles")
        .arg("1")
        .output()
        .expect("run command should complete");

    hub.join().expect("mock hub thread should finish");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"code\":10"), "stdout: {stdout}");
    // Servo POST of 3000 clamps to 2200 in the echoed reply pair.
    assert!(stdout.contains("2200"), "stdout: {stdout}");
}
