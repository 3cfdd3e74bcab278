use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::link::HubLink;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP transport to the relay hub.
///
/// Wraps a `std::net::TcpStream` in non-blocking mode so that
/// [`HubLink::poll_byte`] returns immediately when no byte is pending.
#[derive(Debug, Default)]
pub struct TcpLink {
    stream: Option<TcpStream>,
}

impl TcpLink {
    /// Create an unconnected link.
    pub fn new() -> Self {
        Self { stream: None }
    }

    /// Whether the link currently holds an open connection.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(TransportError::NotConnected)
    }
}

impl HubLink for TcpLink {
    fn connect(&mut self, host: &str, port: u16) -> Result<bool> {
        self.close();

        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                host: host.to_string(),
                port,
                source,
            })?;

        for addr in addrs {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    stream.set_nonblocking(true)?;
                    stream.set_nodelay(true)?;
                    debug!(%host, port, "connected to hub");
                    self.stream = Some(stream);
                    return Ok(true);
                }
                Err(err) => {
                    warn!(%host, port, %addr, error = %err, "hub connect attempt failed");
                }
            }
        }

        Ok(false)
    }

    fn poll_byte(&mut self) -> Result<Option<u8>> {
        let stream = self.stream_mut()?;
        let mut byte = [0u8; 1];
        loop {
            match stream.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream_mut()?;
        let mut offset = 0usize;
        while offset < bytes.len() {
            match stream.write(&bytes[offset..]) {
                Ok(0) => {
                    return Err(TransportError::Io(std::io::Error::from(
                        ErrorKind::WriteZero,
                    )))
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let stream = self.stream_mut()?;
        loop {
            match stream.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!("closing hub link");
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::net::TcpListener;
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;

    fn poll_until_byte(link: &mut TcpLink, budget: Duration) -> Option<u8> {
        let start = Instant::now();
        while start.elapsed() < budget {
            if let Some(byte) = link.poll_byte().unwrap() {
                return Some(byte);
            }
            thread::sleep(Duration::from_millis(2));
        }
        None
    }

    #[test]
    fn connect_write_and_poll_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            use std::io::Read as _;
            peer.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"ping");
            peer.write_all(b"!").unwrap();
        });

        let mut link = TcpLink::new();
        assert!(link.connect("127.0.0.1", port).unwrap());
        link.write_all(b"ping").unwrap();
        link.flush().unwrap();

        let byte = poll_until_byte(&mut link, Duration::from_secs(2));
        assert_eq!(byte, Some(b'!'));

        link.close();
        server.join().unwrap();
    }

    #[test]
    fn poll_byte_without_connection_errors() {
        let mut link = TcpLink::new();
        let err = link.poll_byte().unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[test]
    fn poll_byte_with_idle_peer_returns_none() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut link = TcpLink::new();
        assert!(link.connect("127.0.0.1", port).unwrap());
        let (_peer, _) = listener.accept().unwrap();

        assert_eq!(link.poll_byte().unwrap(), None);
        link.close();
    }

    #[test]
    fn connect_refused_reports_false() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut link = TcpLink::new();
        assert!(!link.connect("127.0.0.1", port).unwrap());
        assert!(!link.is_connected());
    }

    #[test]
    fn close_is_idempotent() {
        let mut link = TcpLink::new();
        link.close();
        link.close();
    }
}
