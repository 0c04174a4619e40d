//! The `AT+SBDWB=` binary upload: framing switch, checksum validation,
//! the 60-second window, and every in-band result code.

mod common;

use std::time::Duration;

use common::{disable_echo, start_emulator};
use sbdsim::SignalRating;

/// Append the protocol checksum to a payload.
fn with_checksum(payload: &[u8]) -> Vec<u8> {
    let sum: u32 = payload.iter().map(|&b| u32::from(b)).sum();
    let mut framed = payload.to_vec();
    framed.push(((sum >> 8) & 0xff) as u8);
    framed.push((sum & 0xff) as u8);
    framed
}

#[tokio::test(start_paused = true)]
async fn valid_upload_is_accepted() {
    let (_emulator, mut port) = start_emulator(SignalRating::Ok).await;
    disable_echo(&mut port).await;

    port.send_line("AT+SBDWB=5").await;
    assert_eq!(port.read_line().await.as_deref(), Some("READY"));

    // "Hello" sums to 0x0215.
    port.send(&[0x48, 0x65, 0x6c, 0x6c, 0x6f, 0x02, 0x15]).await;
    assert_eq!(port.read_line().await.as_deref(), Some("0"));
}

#[tokio::test(start_paused = true)]
async fn checksum_mismatch_is_rejected() {
    let (_emulator, mut port) = start_emulator(SignalRating::Ok).await;
    disable_echo(&mut port).await;

    port.send_line("AT+SBDWB=5").await;
    assert_eq!(port.read_line().await.as_deref(), Some("READY"));

    port.send(&[0x48, 0x65, 0x6c, 0x6c, 0x6f, 0x00, 0x00]).await;
    assert_eq!(port.read_line().await.as_deref(), Some("2"));

    // Back in command mode afterwards.
    port.send_line("AT&K0").await;
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));
}

#[tokio::test(start_paused = true)]
async fn length_validation_stays_in_command_mode() {
    let (_emulator, mut port) = start_emulator(SignalRating::Ok).await;
    disable_echo(&mut port).await;

    for detail in ["0", "341", "9999", "ten", ""] {
        port.send_line(&format!("AT+SBDWB={detail}")).await;
        assert_eq!(
            port.read_line().await.as_deref(),
            Some("3"),
            "detail {detail:?} should be rejected"
        );
    }

    // No READY was issued; the next command parses as text.
    port.send_line("AT+CSQF").await;
    let line = port.read_line().await.unwrap();
    assert!(line.starts_with("+CSQF:"), "got {line}");
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));
}

#[tokio::test(start_paused = true)]
async fn maximum_length_payload_round_trips() {
    let (_emulator, mut port) = start_emulator(SignalRating::Ok).await;
    disable_echo(&mut port).await;

    port.send_line("AT+SBDWB=340").await;
    assert_eq!(port.read_line().await.as_deref(), Some("READY"));

    let payload = vec![0xa5u8; 340];
    port.send(&with_checksum(&payload)).await;
    assert_eq!(port.read_line().await.as_deref(), Some("0"));
}

#[tokio::test(start_paused = true)]
async fn upload_split_across_writes_is_reassembled() {
    let (_emulator, mut port) = start_emulator(SignalRating::Ok).await;
    disable_echo(&mut port).await;

    port.send_line("AT+SBDWB=5").await;
    assert_eq!(port.read_line().await.as_deref(), Some("READY"));

    let framed = with_checksum(b"Hello");
    port.send(&framed[..3]).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    port.send(&framed[3..]).await;

    assert_eq!(port.read_line().await.as_deref(), Some("0"));
}

#[tokio::test(start_paused = true)]
async fn oversized_upload_is_rejected() {
    let (_emulator, mut port) = start_emulator(SignalRating::Ok).await;
    disable_echo(&mut port).await;

    port.send_line("AT+SBDWB=1").await;
    assert_eq!(port.read_line().await.as_deref(), Some("READY"));

    port.send(&[0x01, 0x02, 0x03, 0x04, 0x05]).await;
    assert_eq!(port.read_line().await.as_deref(), Some("2"));
}

#[tokio::test(start_paused = true)]
async fn stalled_upload_times_out_with_code_1() {
    let (_emulator, mut port) = start_emulator(SignalRating::Ok).await;
    disable_echo(&mut port).await;

    port.send_line("AT+SBDWB=5").await;
    assert_eq!(port.read_line().await.as_deref(), Some("READY"));

    // Send nothing: the 60-second window elapses on the paused clock.
    assert_eq!(port.read_line().await.as_deref(), Some("1"));

    // The emulator reverted to command mode.
    port.send_line("AT&K0").await;
    assert_eq!(port.read_line().await.as_deref(), Some("OK"));
}

#[tokio::test(start_paused = true)]
async fn partial_upload_still_times_out() {
    let (_emulator, mut port) = start_emulator(SignalRating::Ok).await;
    disable_echo(&mut port).await;

    port.send_line("AT+SBDWB=5").await;
    assert_eq!(port.read_line().await.as_deref(), Some("READY"));

    // Three of the seven expected bytes, then silence.
    port.send(&[0x48, 0x65, 0x6c]).await;
    assert_eq!(port.read_line().await.as_deref(), Some("1"));
}
