//! sbdsim-test-harness: deterministic serial substitute for emulator tests.
//!
//! [`loopback()`] builds an in-memory duplex pair: a [`Transport`] half
//! the emulator owns, and a [`DtePort`] half a test drives exactly like a
//! host application on the far end of a serial cable -- write command
//! lines or raw binary, read back CRLF-terminated responses.
//!
//! No real (or virtual) serial device is involved, so protocol tests run
//! anywhere, including under tokio's paused test clock.
//!
//! [`Transport`]: sbdsim_core::Transport

pub mod loopback;

pub use loopback::{loopback, DtePort, LoopbackTransport};
