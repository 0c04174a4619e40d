//! EmulatorBuilder -- fluent builder for constructing [`Emulator`] instances.
//!
//! Separates configuration from construction so callers can set the serial
//! path, signal profile, and signer key source before the transport is
//! opened and the background tasks spawn.
//!
//! # Example
//!
//! ```no_run
//! use sbdsim::EmulatorBuilder;
//! use sbdsim_core::SignalRating;
//!
//! # async fn example() -> sbdsim_core::Result<()> {
//! let emulator = EmulatorBuilder::new()
//!     .port_path("/dev/pts/7")
//!     .signal_quality_rating(SignalRating::Good)
//!     .jwt_signer_key("keys/signer.pem")
//!     .build()
//!     .await?;
//! let _events = emulator.subscribe();
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

use sbdsim_core::error::{Error, Result};
use sbdsim_core::transport::Transport;
use sbdsim_core::types::SignalRating;

use crate::emulator::Emulator;
use crate::signer::Signer;

/// Default DTE baud rate of the 9602.
const DEFAULT_BAUD_RATE: u32 = 19_200;

/// Fluent builder for [`Emulator`].
pub struct EmulatorBuilder {
    port_path: Option<String>,
    baud_rate: u32,
    signal_quality_rating: SignalRating,
    jwt_signer_key: Option<PathBuf>,
    jwt_signer_key_pem: Option<String>,
    jwt_signer_key_passphrase: Option<String>,
}

impl EmulatorBuilder {
    pub fn new() -> Self {
        Self {
            port_path: None,
            baud_rate: DEFAULT_BAUD_RATE,
            signal_quality_rating: SignalRating::default(),
            jwt_signer_key: None,
            jwt_signer_key_pem: None,
            jwt_signer_key_passphrase: None,
        }
    }

    /// Set the serial port path the emulator answers on
    /// (e.g. one end of a `socat` virtual pair).
    pub fn port_path(mut self, path: &str) -> Self {
        self.port_path = Some(path.to_string());
        self
    }

    /// Override the default 19200 baud rate.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Set the signal-quality profile (default: `Random`).
    pub fn signal_quality_rating(mut self, rating: SignalRating) -> Self {
        self.signal_quality_rating = rating;
        self
    }

    /// Load the message-signing key from a PEM file instead of generating
    /// one at startup.
    pub fn jwt_signer_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.jwt_signer_key = Some(path.into());
        self
    }

    /// Provide the message-signing key as in-memory PEM. Takes precedence
    /// over [`jwt_signer_key`](Self::jwt_signer_key); mainly useful for
    /// tests and embedding.
    pub fn jwt_signer_key_pem(mut self, pem: &str) -> Self {
        self.jwt_signer_key_pem = Some(pem.to_string());
        self
    }

    /// Passphrase for an encrypted signer key.
    pub fn jwt_signer_key_passphrase(mut self, passphrase: &str) -> Self {
        self.jwt_signer_key_passphrase = Some(passphrase.to_string());
        self
    }

    /// Build an [`Emulator`] with a caller-provided transport.
    ///
    /// This is the primary entry point for testing (pass a loopback pair
    /// from `sbdsim-test-harness`) and for embedding scenarios where the
    /// caller manages the byte channel itself.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<Emulator> {
        let passphrase = self.jwt_signer_key_passphrase.as_deref();

        let signer = if let Some(pem) = &self.jwt_signer_key_pem {
            Signer::from_pem(pem, passphrase)?
        } else if let Some(path) = &self.jwt_signer_key {
            Signer::from_key_file(path, passphrase)?
        } else {
            Signer::generate()?
        };

        Ok(Emulator::start(
            transport,
            self.signal_quality_rating,
            signer,
        ))
    }

    /// Build an [`Emulator`] on a serial port.
    ///
    /// Requires [`port_path()`](Self::port_path).
    pub async fn build(self) -> Result<Emulator> {
        let port = self
            .port_path
            .clone()
            .ok_or_else(|| Error::InvalidParameter("port_path is required for build()".into()))?;

        let transport = sbdsim_transport::SerialTransport::open(&port, self.baud_rate).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}

impl Default for EmulatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
