//! TCP transport
//!
//! Blocking `std::net::TcpStream` with a nonblocking peek for the per-tick
//! liveness probe. Frame sends are small enough (header + JPEG) that a
//! healthy LAN link drains them within a tick; a dead link is caught by the
//! liveness probe on the next tick.

use std::io::{ErrorKind, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::NetworkError;
use crate::network::Transport;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP implementation of [`Transport`]
#[derive(Default)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe the socket without consuming data: a zero-byte read means the
    /// peer closed the connection, `WouldBlock` means it is still alive.
    fn probe(stream: &TcpStream) -> bool {
        if stream.set_nonblocking(true).is_err() {
            return false;
        }
        let mut buf = [0u8; 1];
        let alive = match stream.peek(&mut buf) {
            Ok(0) => false,
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::WouldBlock => true,
            Err(_) => false,
        };
        let _ = stream.set_nonblocking(false);
        alive
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, address: &str, port: u16) -> Result<(), NetworkError> {
        let addr = (address, port)
            .to_socket_addrs()
            .map_err(|e| NetworkError::InvalidAddress(format!("{}:{}: {}", address, port, e)))?
            .next()
            .ok_or_else(|| NetworkError::InvalidAddress(format!("{}:{}", address, port)))?;

        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        stream
            .set_nodelay(true)
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        self.stream = Some(stream);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn is_connected(&self) -> bool {
        match &self.stream {
            Some(stream) => Self::probe(stream),
            None => false,
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), NetworkError> {
        let stream = self.stream.as_mut().ok_or(NetworkError::NotConnected)?;
        stream
            .write_all(bytes)
            .map_err(|e| NetworkError::SendFailed(e.to_string()))
    }
}
