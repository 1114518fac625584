//! Transport collaborators: the seam between the protocol core and the
//! network.
//!
//! The core client never opens, closes, or configures a connection; it
//! hands a [`Transport`] one command (plus the payload line for storage
//! commands) and receives one complete raw response back. Timeouts and
//! any other I/O policy live entirely on this side of the seam.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use mctext_protocol::frame_len;

/// A blocking request/response channel to one memcached server.
///
/// The protocol is strictly request/response with no pipelining, so
/// `send` must not return until the full response has arrived.
pub trait Transport {
    /// Write `command` (and `payload`, when present) and return exactly
    /// one complete raw response.
    fn send(&mut self, command: &[u8], payload: Option<&[u8]>) -> io::Result<Vec<u8>>;
}

/// Configuration for [`TcpTransport`].
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Connect timeout. `None` blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
    /// Read timeout while waiting for response bytes.
    pub read_timeout: Option<Duration>,
    /// Write timeout for command bytes.
    pub write_timeout: Option<Duration>,
    /// Size of each socket read.
    pub recv_chunk: usize,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(1)),
            read_timeout: Some(Duration::from_secs(5)),
            write_timeout: Some(Duration::from_secs(5)),
            recv_chunk: 4096,
        }
    }
}

/// Blocking TCP transport over a single connection.
///
/// Responses are framed with [`mctext_protocol::frame_len`], so a read
/// that lands mid-value (or mid-line) simply triggers another read.
pub struct TcpTransport {
    stream: TcpStream,
    buf: Vec<u8>,
    recv_chunk: usize,
}

impl TcpTransport {
    /// Connect to a memcached server.
    pub fn connect(addr: impl ToSocketAddrs, config: &TcpConfig) -> io::Result<Self> {
        let stream = match config.connect_timeout {
            Some(timeout) => {
                let addr = addr.to_socket_addrs()?.next().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "no address resolved")
                })?;
                TcpStream::connect_timeout(&addr, timeout)?
            }
            None => TcpStream::connect(addr)?,
        };
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            buf: Vec::new(),
            recv_chunk: config.recv_chunk.max(1),
        })
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, command: &[u8], payload: Option<&[u8]>) -> io::Result<Vec<u8>> {
        self.stream.write_all(command)?;
        if let Some(payload) = payload {
            self.stream.write_all(payload)?;
        }
        self.stream.flush()?;

        loop {
            if let Some(n) = frame_len(&self.buf) {
                let rest = self.buf.split_off(n);
                return Ok(std::mem::replace(&mut self.buf, rest));
            }
            let mut chunk = vec![0u8; self.recv_chunk];
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed mid-response",
                ));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}
