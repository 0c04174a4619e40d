//! RS256 message signer.
//!
//! Every successful SBD session emits a message event whose claims are
//! signed as a compact JWS, the same shape the Rock7 push API delivers so
//! downstream consumers can verify messages from the emulator and from the
//! real service with identical code.
//!
//! The key is fixed at construction: either loaded from a PEM file
//! (optionally PKCS#8-passphrase-encrypted) or generated in memory as a
//! 4096-bit RSA pair protected by a random 8-character passphrase. A
//! generated pair is published upward exactly once as a
//! [`SignerKeyDetails`] event so the embedding application can persist it.
//! Failures here are construction failures; the emulator never starts
//! without a working signer.

use std::path::Path;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;

use sbdsim_core::error::{Error, Result};
use sbdsim_core::events::SignerKeyDetails;

/// Modulus size for auto-generated keys.
const GENERATED_KEY_BITS: usize = 4096;

/// Length of the sampled passphrase protecting a generated key.
const PASSPHRASE_LEN: usize = 8;

/// Holds the RS256 signing key for session message emission.
pub struct Signer {
    encoding_key: EncodingKey,
    generated: Option<SignerKeyDetails>,
}

impl Signer {
    /// Load a PEM-encoded RSA private key from `path`.
    ///
    /// With a passphrase the file must be a PKCS#8 `ENCRYPTED PRIVATE KEY`;
    /// without one, plain PKCS#1 and PKCS#8 PEMs are both accepted.
    pub fn from_key_file(path: &Path, passphrase: Option<&str>) -> Result<Self> {
        let pem = std::fs::read_to_string(path).map_err(|e| {
            Error::Signer(format!("cannot read key file {}: {e}", path.display()))
        })?;
        Self::from_pem(&pem, passphrase)
    }

    /// Build a signer from in-memory PEM key material.
    pub fn from_pem(pem: &str, passphrase: Option<&str>) -> Result<Self> {
        let encoding_key = match passphrase {
            Some(pass) => {
                let key = RsaPrivateKey::from_pkcs8_encrypted_pem(pem, pass.as_bytes())
                    .map_err(|e| Error::Signer(format!("cannot decrypt signer key: {e}")))?;
                let signing_pem = key
                    .to_pkcs8_pem(LineEnding::LF)
                    .map_err(|e| Error::Signer(format!("cannot re-encode signer key: {e}")))?;
                EncodingKey::from_rsa_pem(signing_pem.as_bytes())
                    .map_err(|e| Error::Signer(format!("invalid signer key: {e}")))?
            }
            None => EncodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| Error::Signer(format!("invalid signer key: {e}")))?,
        };

        Ok(Self {
            encoding_key,
            generated: None,
        })
    }

    /// Generate a fresh 4096-bit RSA pair with a random passphrase.
    ///
    /// The encrypted private key, the public key, and the passphrase are
    /// retained for one-shot publication via
    /// [`take_generated`](Self::take_generated).
    pub fn generate() -> Result<Self> {
        let mut rng = rand::thread_rng();

        let passphrase: String = (&mut rng)
            .sample_iter(Alphanumeric)
            .take(PASSPHRASE_LEN)
            .map(char::from)
            .collect();

        tracing::info!(bits = GENERATED_KEY_BITS, "generating signer key pair");
        let private = RsaPrivateKey::new(&mut rng, GENERATED_KEY_BITS)
            .map_err(|e| Error::Signer(format!("key generation failed: {e}")))?;

        let public_key_pem = RsaPublicKey::from(&private)
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| Error::Signer(format!("cannot encode public key: {e}")))?;
        let private_key_pem = private
            .to_pkcs8_encrypted_pem(&mut rng, passphrase.as_bytes(), LineEnding::LF)
            .map_err(|e| Error::Signer(format!("cannot encrypt private key: {e}")))?
            .to_string();
        let signing_pem = private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| Error::Signer(format!("cannot encode private key: {e}")))?;
        let encoding_key = EncodingKey::from_rsa_pem(signing_pem.as_bytes())
            .map_err(|e| Error::Signer(format!("generated key rejected: {e}")))?;

        Ok(Self {
            encoding_key,
            generated: Some(SignerKeyDetails {
                public_key_pem,
                private_key_pem,
                passphrase,
            }),
        })
    }

    /// Take the generated key material for publication. Returns `Some`
    /// at most once, and only for a [`generate`](Self::generate)d signer.
    pub fn take_generated(&mut self) -> Option<SignerKeyDetails> {
        self.generated.take()
    }

    /// Sign `claims` as a compact RS256 JWS.
    pub fn sign<C: Serialize>(&self, claims: &C) -> Result<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &self.encoding_key)
            .map_err(|e| Error::Signer(format!("signing failed: {e}")))
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("generated", &self.generated.is_some())
            .finish_non_exhaustive()
    }
}
