#![allow(dead_code)]

//! Shared scaffolding for the integration suites: a once-generated RSA
//! test key and an emulator wired to the loopback harness.

use std::sync::OnceLock;
use std::time::Duration;

use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tokio::sync::broadcast;

use sbdsim::{Emulator, EmulatorBuilder, EmulatorEvent, SbdMessage, SignalRating};
use sbdsim_test_harness::{loopback, DtePort};

fn test_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    // 2048 bits keeps key generation quick; the signing path is identical.
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap())
}

pub fn private_key_pem() -> String {
    test_key().to_pkcs8_pem(LineEnding::LF).unwrap().to_string()
}

pub fn public_key_pem() -> String {
    RsaPublicKey::from(test_key())
        .to_public_key_pem(LineEnding::LF)
        .unwrap()
}

/// Start an emulator on a loopback pair with the shared signer key.
pub async fn start_emulator(rating: SignalRating) -> (Emulator, DtePort) {
    let (transport, port) = loopback();
    let emulator = EmulatorBuilder::new()
        .signal_quality_rating(rating)
        .jwt_signer_key_pem(&private_key_pem())
        .build_with_transport(transport)
        .await
        .unwrap();
    (emulator, port)
}

/// Turn command echo off and consume its own echoed exchange, so the rest
/// of a test only sees replies.
pub async fn disable_echo(port: &mut DtePort) {
    port.send_line("ATE0").await;
    assert_eq!(port.read_line().await.as_deref(), Some("ATE0"));
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));
}

/// Wait for the next `sbd-message` event, skipping interleaved log events.
pub async fn next_sbd_message(
    events: &mut broadcast::Receiver<EmulatorEvent>,
) -> Option<SbdMessage> {
    loop {
        match tokio::time::timeout(Duration::from_secs(2), events.recv()).await {
            Ok(Ok(EmulatorEvent::SbdMessage(msg))) => return Some(msg),
            Ok(Ok(_)) => continue,
            Ok(Err(_)) | Err(_) => return None,
        }
    }
}
