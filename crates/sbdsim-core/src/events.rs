//! Typed emulator event stream.
//!
//! Events are emitted by the emulator through a `tokio::sync::broadcast`
//! channel when something observable happens: a log line, a successfully
//! uplinked SBD message, or the one-shot publication of an auto-generated
//! signer key pair. Consumers subscribe via `Emulator::subscribe()`.
//!
//! Delivery follows emission order on a bounded channel; a consumer that
//! falls behind misses old events but can never push a failure back into
//! the engine.

use serde::{Deserialize, Serialize};

/// Severity of a [`LogEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        };
        write!(f, "{s}")
    }
}

/// A log line emitted by the emulator.
///
/// Mirrors what the emulator also sends to `tracing`, but in a form an
/// embedding application can render directly (the RockBLOCK tooling shows
/// these in its console view).
#[derive(Debug, Clone)]
pub struct LogEvent {
    /// Severity tag.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Wall-clock timestamp, RFC 3339.
    pub datetime: String,
    /// Rounded delta since the previous log event (e.g. `"+3s"`).
    pub time_since_last: String,
}

/// A mobile-originated message that completed an SBD session.
///
/// Field names are fixed on the wire: this struct serializes to the exact
/// JSON shape the Rock7 push API delivers, including the uppercase `JWT`
/// key. All geodetic fields are synthetic constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SbdMessage {
    /// Mobile-originated message sequence number at session completion.
    pub momsn: u16,
    /// Hex encoding of the MO payload, trailing zero bytes stripped.
    pub data: String,
    /// Modem serial number.
    pub serial: u32,
    pub iridium_latitude: f64,
    pub iridium_longitude: f64,
    /// Circular error probable of the synthetic fix, km.
    pub iridium_cep: u32,
    pub imei: String,
    pub device_type: String,
    /// UTC session time, `YY-MM-DD HH:MM:SS`.
    pub transmit_time: String,
    /// Compact RS256 JWS over the preceding fields, issuer `Rock7`.
    #[serde(rename = "JWT")]
    pub jwt: String,
}

/// Key material published when the emulator generates its own signer key.
///
/// Emitted exactly once, at startup, and only when no key path was
/// configured. All fields are ASCII PEM / plain text so an embedding
/// application can persist them for later verification.
#[derive(Debug, Clone)]
pub struct SignerKeyDetails {
    /// SPKI public key, PEM.
    pub public_key_pem: String,
    /// PKCS#8 private key encrypted under `passphrase`, PEM.
    pub private_key_pem: String,
    /// Randomly sampled 8-character alphanumeric passphrase.
    pub passphrase: String,
}

/// An event emitted by the emulator.
///
/// Subscribe via `Emulator::subscribe()`. Events are delivered on a
/// best-effort basis through a bounded broadcast channel.
#[derive(Debug, Clone)]
pub enum EmulatorEvent {
    /// A log line (every state transition and I/O, tagged with a level).
    Log(LogEvent),

    /// A mobile-originated message left the emulator via a successful
    /// `SBDIX` session.
    SbdMessage(SbdMessage),

    /// The emulator generated its own signer key pair at startup.
    SignerKeyGenerated(SignerKeyDetails),
}

impl EmulatorEvent {
    /// Return the contained [`SbdMessage`], if this is a message event.
    pub fn as_sbd_message(&self) -> Option<&SbdMessage> {
        match self {
            EmulatorEvent::SbdMessage(msg) => Some(msg),
            _ => None,
        }
    }

    /// Return the contained [`LogEvent`], if this is a log event.
    pub fn as_log(&self) -> Option<&LogEvent> {
        match self {
            EmulatorEvent::Log(log) => Some(log),
            _ => None,
        }
    }
}
