//! sbdsim: an Iridium 9602/9603 SBD transceiver emulator.
//!
//! A DTE application connects to one end of a serial-port pair and talks
//! AT commands and binary payloads to this emulator exactly as it would to
//! a physical RockBLOCK-class modem: command echo, `AT+SBDWB=` binary
//! uploads with checksum validation, `AT+SBDIX` sessions gated by a
//! time-varying signal-quality model, and unsolicited `+CIEV` indicator
//! lines. Every message that completes a session is emitted to local
//! observers as a JSON claims set signed with RS256 (issuer `Rock7`),
//! byte-compatible with the Rock7 push API.
//!
//! # Quick start
//!
//! ```no_run
//! use sbdsim::{EmulatorBuilder, EmulatorEvent, SignalRating};
//!
//! # async fn example() -> sbdsim::Result<()> {
//! let emulator = EmulatorBuilder::new()
//!     .port_path("/dev/pts/7")
//!     .signal_quality_rating(SignalRating::Good)
//!     .build()
//!     .await?;
//!
//! let mut events = emulator.subscribe();
//! while let Ok(event) = events.recv().await {
//!     if let EmulatorEvent::SbdMessage(msg) = event {
//!         println!("MOMSN {} uplinked: {}", msg.momsn, msg.data);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`] -- the AT dialect: command parsing, checksums, replies
//! - [`framing`] -- CRLF line / binary chunk demultiplexing
//! - [`buffers`] -- MO/MT buffers and sequence counters
//! - [`signer`] -- the RS256 message signer
//! - [`builder`] / [`emulator`] -- construction and the public handle

pub mod buffers;
pub mod builder;
pub mod emulator;
pub mod framing;
pub mod protocol;
pub mod signer;

mod engine;
mod session;
mod signal;
mod state;

pub use builder::EmulatorBuilder;
pub use emulator::Emulator;
pub use signer::Signer;

// Re-export the core surface so most consumers need only this crate.
pub use sbdsim_core::{
    EmulatorEvent, Error, LogEvent, LogLevel, Result, SbdMessage, SignalRating,
    SignerKeyDetails, Transport,
};
