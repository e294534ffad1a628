//! Network transport for the collector connection

pub mod tcp;

pub use tcp::TcpTransport;

use crate::error::NetworkError;

/// Connection-oriented byte-stream transport to the remote collector.
///
/// `is_connected` is polled once per tick; it flipping to `false` is the
/// only signal that the peer closed the connection. Transient `send`
/// failures do not tear the session down.
pub trait Transport {
    fn connect(&mut self, address: &str, port: u16) -> Result<(), NetworkError>;

    /// Close the connection. Safe to call when not connected.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    fn send(&mut self, bytes: &[u8]) -> Result<(), NetworkError>;
}
