//! sbdsim-core: Core traits, types, and error definitions for sbdsim.
//!
//! This crate defines the transport-agnostic abstractions shared by the
//! emulator engine, the serial transport, and the test harness. Consumers
//! that only observe emulator events depend on these types without pulling
//! in the engine or a serial stack.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level duplex channel to the DTE
//! - [`EmulatorEvent`] -- typed event stream (log, SBD message, signer key)
//! - [`SignalRating`] -- configured signal-quality profile
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod helpers;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use sbdsim_core::*`.
pub use error::{Error, Result};
pub use events::{EmulatorEvent, LogEvent, LogLevel, SbdMessage, SignerKeyDetails};
pub use helpers::{format_time_since, format_transmit_time, payload_hex};
pub use transport::Transport;
pub use types::{ParseRatingError, SignalRating};
