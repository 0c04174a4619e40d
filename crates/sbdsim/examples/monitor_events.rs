//! Run the emulator on a serial port and print its events.
//!
//! Pair this with a virtual serial pair and any RockBLOCK-aware DTE
//! application on the far end:
//!
//! ```sh
//! socat -d -d pty,raw,echo=0,link=/tmp/sbd-emu pty,raw,echo=0,link=/tmp/sbd-dte
//! cargo run -p sbdsim --example monitor_events -- /tmp/sbd-emu
//! ```
//!
//! Messages uplinked with `AT+SBDWB=` / `AT+SBDIX` appear here as signed
//! JSON, exactly as the Rock7 push API would deliver them.

use sbdsim::{EmulatorBuilder, EmulatorEvent, SignalRating};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sbdsim=debug".into()),
        )
        .init();

    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/tmp/sbd-emu".to_string());

    println!("Starting SBD emulator on {port} (rating: GOOD)...");

    let emulator = EmulatorBuilder::new()
        .port_path(&port)
        .signal_quality_rating(SignalRating::Good)
        .build()
        .await?;

    let mut events = emulator.subscribe();
    println!("Emulator online. Point your DTE at the other end of the pair.\n");

    loop {
        match events.recv().await {
            Ok(EmulatorEvent::Log(log)) => {
                println!("[{:8}] {:<5} {}", log.time_since_last, log.level, log.message);
            }
            Ok(EmulatorEvent::SbdMessage(msg)) => {
                println!("--- MO message uplinked ---");
                println!("{}", serde_json::to_string_pretty(&msg)?);
            }
            Ok(EmulatorEvent::SignerKeyGenerated(details)) => {
                println!("--- signer key generated (passphrase: {}) ---", details.passphrase);
                println!("{}", details.public_key_pem);
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                println!("(missed {n} events due to lag)");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }

    Ok(())
}
