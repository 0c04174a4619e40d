//! Transport trait for the DTE-facing byte channel.
//!
//! The [`Transport`] trait abstracts over the serial-port-like link between
//! the emulator and the Data Terminal Equipment. One implementation exists
//! for real serial devices (`sbdsim-transport`), and one in-memory loopback
//! pair for tests (`sbdsim-test-harness`).
//!
//! The emulator engine operates on a `Transport` rather than directly on a
//! serial port, so the whole protocol stack is exercisable without a
//! physical or virtual COM device.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level duplex channel to the DTE.
///
/// Implementations handle buffering and error surfacing at the physical
/// layer. Framing (CRLF lines vs. binary chunks) is handled above this
/// trait by the emulator engine.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the DTE.
    ///
    /// Implementations should block until all bytes have been written to
    /// the underlying channel.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the DTE into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Waits up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if nothing arrives within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport.
    ///
    /// After `close()`, subsequent `send()` and `receive()` calls should
    /// return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
