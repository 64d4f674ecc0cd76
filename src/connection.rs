//! Transport handle used by the driver to close the connection.
//!
//! Socket I/O lives outside this crate. The transport hands each session an
//! implementation of [`Connection`] through
//! [`EventDriver::set_connection`](crate::driver::EventDriver::set_connection)
//! before dispatching frames.

use std::{fmt, io, net::SocketAddr};

use crate::{close::CloseCode, frame::Frame};

/// Outbound side of a live WebSocket connection.
pub trait Connection: Send + Sync + 'static {
    /// Send a CLOSE frame with `code` and `reason`.
    ///
    /// # Errors
    ///
    /// Returns any transport error raised while writing the frame.
    fn close(&self, code: CloseCode, reason: &str) -> io::Result<()>;

    /// Queue an outbound frame.
    ///
    /// # Errors
    ///
    /// Returns any transport error raised while queuing the frame.
    fn send(&self, frame: Frame) -> io::Result<()>;

    /// Whether the connection still accepts outbound frames.
    fn is_open(&self) -> bool;

    /// Peer address, if known.
    fn remote_addr(&self) -> Option<SocketAddr> { None }
}

impl fmt::Debug for dyn Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("open", &self.is_open())
            .field("remote_addr", &self.remote_addr())
            .finish()
    }
}
