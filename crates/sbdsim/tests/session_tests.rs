//! `AT+SBDIX` sessions: outcome reporting, sequence-counter movement, and
//! the signed message event.

mod common;

use std::time::Duration;

use common::{disable_echo, next_sbd_message, public_key_pem, start_emulator};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use sbdsim::{EmulatorEvent, SignalRating};

/// Run a checksummed `SBDWB` upload and assert it was accepted.
async fn upload(port: &mut sbdsim_test_harness::DtePort, payload: &[u8]) {
    let sum: u32 = payload.iter().map(|&b| u32::from(b)).sum();
    let mut framed = payload.to_vec();
    framed.push(((sum >> 8) & 0xff) as u8);
    framed.push((sum & 0xff) as u8);

    port.send_line(&format!("AT+SBDWB={}", payload.len())).await;
    assert_eq!(port.read_line().await.as_deref(), Some("READY"));
    port.send(&framed).await;
    assert_eq!(port.read_line().await.as_deref(), Some("0"));
}

#[tokio::test(start_paused = true)]
async fn successful_session_emits_a_verifiable_message() {
    let (emulator, mut port) = start_emulator(SignalRating::Excellent).await;
    let mut events = emulator.subscribe();
    disable_echo(&mut port).await;

    upload(&mut port, &[0x01, 0x02, 0x03]).await;

    port.send_line("AT+SBDIX").await;
    assert_eq!(
        port.read_line().await.as_deref(),
        Some("+SBDIX: 0, 1, 0, 1, 0, 0")
    );
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));

    let msg = next_sbd_message(&mut events).await.expect("no sbd-message event");
    assert_eq!(msg.momsn, 1);
    assert_eq!(msg.data, "010203");
    assert_eq!(msg.serial, 206899);
    assert_eq!(msg.imei, "300534062390910");
    assert_eq!(msg.device_type, "ROCKBLOCK");

    // The JWT verifies under the signer's public key, issuer Rock7, and
    // carries the same claims the event does.
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&["Rock7"]);
    validation.set_required_spec_claims(&["iss"]);
    validation.validate_exp = false;

    let decoded = decode::<serde_json::Value>(
        &msg.jwt,
        &DecodingKey::from_rsa_pem(public_key_pem().as_bytes()).unwrap(),
        &validation,
    )
    .expect("JWT verification failed");

    assert_eq!(decoded.claims["momsn"], 1);
    assert_eq!(decoded.claims["data"], "010203");
    assert_eq!(decoded.claims["serial"], 206899);
    assert_eq!(decoded.claims["iridium_cep"], 122);
    assert_eq!(decoded.claims["transmit_time"], msg.transmit_time);
}

#[tokio::test(start_paused = true)]
async fn no_signal_fails_the_session_without_side_effects() {
    let (emulator, mut port) = start_emulator(SignalRating::None).await;
    let mut events = emulator.subscribe();
    disable_echo(&mut port).await;

    upload(&mut port, &[0x41, 0x42]).await;

    port.send_line("AT+SBDIX").await;
    assert_eq!(
        port.read_line().await.as_deref(),
        Some("+SBDIX: 32, 0, 2, 0, 0, 0")
    );
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));

    assert!(
        next_sbd_message(&mut events).await.is_none(),
        "a failed session must not emit a message"
    );

    // Counters unchanged: a later attempt still reports zero.
    port.send_line("AT+SBDIXA").await;
    assert_eq!(
        port.read_line().await.as_deref(),
        Some("+SBDIX: 32, 0, 2, 0, 0, 0")
    );
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));
}

#[tokio::test(start_paused = true)]
async fn sequence_numbers_advance_once_per_successful_session() {
    let (emulator, mut port) = start_emulator(SignalRating::Excellent).await;
    let mut events = emulator.subscribe();
    disable_echo(&mut port).await;

    upload(&mut port, b"first").await;
    port.send_line("AT+SBDIX").await;
    assert_eq!(
        port.read_line().await.as_deref(),
        Some("+SBDIX: 0, 1, 0, 1, 0, 0")
    );
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));
    assert_eq!(next_sbd_message(&mut events).await.unwrap().momsn, 1);

    upload(&mut port, b"second").await;
    port.send_line("AT+SBDIXA").await;
    assert_eq!(
        port.read_line().await.as_deref(),
        Some("+SBDIX: 0, 2, 0, 2, 0, 0")
    );
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));
    assert_eq!(next_sbd_message(&mut events).await.unwrap().momsn, 2);
}

#[tokio::test(start_paused = true)]
async fn parked_radio_refuses_the_session_immediately() {
    let (emulator, mut port) = start_emulator(SignalRating::Excellent).await;
    let mut events = emulator.subscribe();
    disable_echo(&mut port).await;

    port.send_line("AT*R0").await;
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));

    port.send_line("AT+SBDIX").await;
    assert_eq!(
        port.read_line().await.as_deref(),
        Some("+SBDIX: 34, 0, 2, 0, 0, 0")
    );
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));
    assert!(next_sbd_message(&mut events).await.is_none());

    // Re-enabling the radio lets a session through again.
    port.send_line("AT*R1").await;
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));

    upload(&mut port, &[0x07]).await;
    port.send_line("AT+SBDIX").await;
    assert_eq!(
        port.read_line().await.as_deref(),
        Some("+SBDIX: 0, 1, 0, 1, 0, 0")
    );
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));
}

#[tokio::test(start_paused = true)]
async fn cleared_buffer_uplinks_as_an_empty_payload() {
    let (emulator, mut port) = start_emulator(SignalRating::Excellent).await;
    let mut events = emulator.subscribe();
    disable_echo(&mut port).await;

    upload(&mut port, b"payload").await;

    port.send_line("AT+SBDD0").await;
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));

    port.send_line("AT+SBDIX").await;
    assert_eq!(
        port.read_line().await.as_deref(),
        Some("+SBDIX: 0, 1, 0, 1, 0, 0")
    );
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));

    let msg = next_sbd_message(&mut events).await.unwrap();
    assert_eq!(msg.data, "");
}

#[tokio::test(start_paused = true)]
async fn payload_trailing_zeros_are_stripped_from_the_event() {
    let (emulator, mut port) = start_emulator(SignalRating::Excellent).await;
    let mut events = emulator.subscribe();
    disable_echo(&mut port).await;

    upload(&mut port, &[0x10, 0x00, 0x20, 0x00, 0x00]).await;

    port.send_line("AT+SBDIX").await;
    assert_eq!(
        port.read_line().await.as_deref(),
        Some("+SBDIX: 0, 1, 0, 1, 0, 0")
    );
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));

    // Interior zeros survive; the zero padding does not.
    assert_eq!(next_sbd_message(&mut events).await.unwrap().data, "100020");
}

#[tokio::test(start_paused = true)]
async fn session_logs_flow_on_the_event_bus() {
    let (emulator, mut port) = start_emulator(SignalRating::Excellent).await;
    let mut events = emulator.subscribe();
    disable_echo(&mut port).await;

    port.send_line("AT+SBDIX").await;
    assert_eq!(
        port.read_line().await.as_deref(),
        Some("+SBDIX: 0, 1, 0, 1, 0, 0")
    );
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));

    let mut saw_session_log = false;
    while let Ok(Ok(event)) =
        tokio::time::timeout(Duration::from_millis(500), events.recv()).await
    {
        if let EmulatorEvent::Log(log) = event {
            if log.message.contains("SBD session") {
                saw_session_log = true;
            }
        }
    }
    assert!(saw_session_log, "expected session lifecycle log events");
}
