//! The command engine and transport pump tasks.
//!
//! The pump task owns the transport exclusively: it drains the shared
//! outbound queue (keeping the DTE link single-writer) and forwards
//! inbound byte batches to the engine. The engine task runs the framing
//! demultiplexer and the AT-command interpreter, including the inline
//! binary upload phase of `AT+SBDWB=`.
//!
//! Command handling deliberately sleeps (echo jitter, pre-reply jitter,
//! the `AT+CSQ` settling wait, the session negotiation delay). During
//! those waits the signal ticker keeps running, so unsolicited `+CIEV`
//! lines can land between a command's echo and its reply -- the same
//! interleaving a DTE sees against real hardware.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;

use sbdsim_core::error::Error;
use sbdsim_core::transport::Transport;
use sbdsim_core::LogLevel;

use crate::framing::{Frame, LineFramer, BINARY_IDLE};
use crate::protocol::{
    self, format_ciev_service, format_ciev_signal, DEVICE_MODEL, HARDWARE_SPEC, IMEI,
    MANUFACTURER, REPLY_ERROR, REPLY_OK, REPLY_READY, SBDWB_BAD_LENGTH,
    SBDWB_CHECKSUM_MISMATCH, SBDWB_OK, SBDWB_TIMEOUT, SOFTWARE_REVISION,
};
use crate::session;
use crate::signal;
use crate::signer::Signer;
use crate::state::{EmulatorState, Shared};

/// Window the DTE has to deliver an announced binary upload.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Settling wait before answering `AT+CSQ`.
const CSQ_WAIT: Duration = Duration::from_secs(2);

/// `ATI0`..`ATI7` identification strings of the modeled unit.
const IDENTITY: [&str; 8] = [
    "2400",
    "0000",
    "OK",
    SOFTWARE_REVISION,
    DEVICE_MODEL,
    "8816",
    "16X",
    HARDWARE_SPEC,
];

/// `AT+GMR` / `AT+CGMR` revision report.
const REVISION_LINES: [&str; 8] = [
    "Call Processor Version: TA16005",
    "Modem DSP Version: 1.7 svn: 2358",
    "DBB Version: 0x0001 (ASIC)",
    "RFA Version: 0x0007 (SRFA2)",
    "NVM Version: KVS",
    "Hardware Version: BOOST0.0.0/9602NrvA-D/04/RAW0d",
    "BOOT Version: TA16005 (rev exported)",
    "TA Version: 0x2F4C10",
];

/// `AT&V` configuration report.
const PROFILE_LINES: [&str; 10] = [
    "ACTIVE PROFILE:",
    "E1 Q0 V1 D2 R1 W1 Y0 &D2 &K3",
    "S000:013 S002:043 S003:013 S004:010 S005:008",
    "S013:049 S014:168 S021:048 S023:060 S039:003",
    "S121:000 S122:255",
    "STORED PROFILE 0:",
    "E1 Q0 V1 D2 R1 W1 Y0 &D2 &K3",
    "S121:000 S122:255",
    "STORED PROFILE 1:",
    "E1 Q0 V1 D2 R1 W1 Y0 &D2 &K3",
];

/// Default value of an S-register in the `AT%R` dump.
fn register_default(index: usize) -> u8 {
    match index {
        0 => 13,
        2 => 43,
        3 => 13,
        4 => 10,
        5 => 8,
        13 => 49,
        14 => 168,
        21 => 48,
        23 => 60,
        39 => 3,
        122 => 255,
        _ => 0,
    }
}

/// The short pacing jitter applied around echoes and replies.
fn jitter_short() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(10..=50))
}

/// The AT-command interpreter task.
pub(crate) struct Engine {
    shared: Arc<Shared>,
    signer: Signer,
    in_rx: mpsc::Receiver<Vec<u8>>,
    framer: LineFramer,
}

impl Engine {
    pub(crate) fn new(
        shared: Arc<Shared>,
        signer: Signer,
        in_rx: mpsc::Receiver<Vec<u8>>,
    ) -> Self {
        Self {
            shared,
            signer,
            in_rx,
            framer: LineFramer::new(),
        }
    }

    /// Serve frames until the inbound channel closes.
    pub(crate) async fn run(mut self) {
        while let Some(bytes) = self.in_rx.recv().await {
            let frames = self.framer.push(&bytes);
            for frame in frames {
                self.handle_frame(frame).await;
            }
        }
        tracing::debug!("inbound channel closed, engine stopping");
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut EmulatorState) -> R) -> R {
        let mut state = self
            .shared
            .state
            .lock()
            .expect("emulator state mutex poisoned");
        f(&mut state)
    }

    async fn handle_frame(&mut self, frame: Frame) {
        if self.with_state(|s| s.ready_for_shutdown) {
            tracing::debug!("input ignored, flush-to-eeprom latched");
            return;
        }

        match frame {
            Frame::Line(line) => self.handle_line(line).await,
            Frame::Chunk(bytes) => {
                self.shared.write_line(REPLY_ERROR).await;
                self.shared.log(
                    LogLevel::Error,
                    format!("{}-byte binary chunk received in command mode", bytes.len()),
                );
            }
        }
    }

    async fn handle_line(&mut self, line: String) {
        self.shared
            .log(LogLevel::Debug, format!("command received: {line}"));

        if self.with_state(|s| s.echo_enabled) {
            tokio::time::sleep(jitter_short()).await;
            self.shared.write_line(&line).await;
        }
        tokio::time::sleep(jitter_short()).await;

        self.dispatch(&line).await;
    }

    async fn reply_ok(&self) {
        self.shared.write_line(REPLY_OK).await;
    }

    async fn reply_error(&self) {
        self.shared.write_line(REPLY_ERROR).await;
    }

    /// One informational line followed by `OK`.
    async fn info_reply(&self, line: &str) {
        self.shared.write_line(line).await;
        self.reply_ok().await;
    }

    async fn dispatch(&mut self, line: &str) {
        let cmd = protocol::parse_command(line);

        match cmd.key {
            // -------------------------------------------------------------
            // Basic configuration
            // -------------------------------------------------------------
            "ATE0" => {
                self.with_state(|s| s.echo_enabled = false);
                self.reply_ok().await;
            }
            "ATE1" => {
                self.with_state(|s| s.echo_enabled = true);
                self.reply_ok().await;
            }

            // Flow control is fixed at none; both settings are accepted.
            "AT&K0" | "AT&K3" => self.reply_ok().await,

            "ATQ0" => {
                self.with_state(|s| s.quiet_mode = false);
                self.reply_ok().await;
            }
            "ATQ1" => {
                // The acknowledgement itself is already suppressed.
                self.with_state(|s| s.quiet_mode = true);
                self.reply_ok().await;
            }

            // Numeric response codes are not supported.
            "ATV0" => {
                self.reply_error().await;
                self.shared
                    .log(LogLevel::Warn, "numeric response mode not supported");
            }

            "ATV1" | "ATZ0" | "ATZ1" | "AT&F0" | "AT&W0" | "AT&W1" | "AT&Y0" | "AT&Y1" => {
                self.reply_ok().await;
            }

            "AT&V" => {
                for line in PROFILE_LINES {
                    self.shared.write_line(line).await;
                }
                self.reply_ok().await;
            }

            "AT%R" => self.dump_registers().await,

            // -------------------------------------------------------------
            // Power / radio control
            // -------------------------------------------------------------
            "AT*F" => {
                self.with_state(|s| {
                    s.ready_for_shutdown = true;
                    s.quiet_mode = true;
                });
                self.shared
                    .log(LogLevel::Info, "flushing to eeprom, ready for power-down");
            }
            "AT*R0" => {
                self.with_state(|s| {
                    s.radio_activity_enabled = false;
                    s.current_signal = 0;
                });
                self.shared.log(LogLevel::Info, "radio activity disabled");
                self.reply_ok().await;
            }
            "AT*R1" => {
                // Resample right away so the level is back inside the
                // rating's range before the next command can observe it.
                self.with_state(|s| {
                    s.radio_activity_enabled = true;
                    s.current_signal = signal::sample_bars(s, &mut rand::thread_rng());
                });
                self.shared.log(LogLevel::Info, "radio activity enabled");
                self.reply_ok().await;
            }

            // -------------------------------------------------------------
            // Identification
            // -------------------------------------------------------------
            "ATI0" | "ATI1" | "ATI2" | "ATI3" | "ATI4" | "ATI5" | "ATI6" | "ATI7" => {
                let index = (cmd.key.as_bytes()[3] - b'0') as usize;
                self.info_reply(IDENTITY[index]).await;
            }

            "AT+GMI" | "AT+CGMI" => self.info_reply(MANUFACTURER).await,
            "AT+GMM" | "AT+CGMM" => self.info_reply(DEVICE_MODEL).await,
            "AT+GMR" | "AT+CGMR" => {
                for line in REVISION_LINES {
                    self.shared.write_line(line).await;
                }
                self.reply_ok().await;
            }
            "AT+GSN" | "AT+CGSN" => self.info_reply(IMEI).await,

            // No real-time clock on this unit.
            "AT+CCLK" => self.reply_error().await,

            // -------------------------------------------------------------
            // Indicators and signal quality
            // -------------------------------------------------------------
            "AT+CIER=" => self.configure_indicators(cmd.detail).await,

            "AT+CRIS" => {
                let ring = self.with_state(|s| s.ring_alert_active);
                self.info_reply(&format!("+CRIS:{}", u8::from(ring))).await;
            }

            "AT+CSQ" => {
                tokio::time::sleep(CSQ_WAIT).await;
                let rating = self.with_state(|s| s.signal_rating);
                self.info_reply(&format!("+CSQ:{}", rating.wire_value()))
                    .await;
            }
            "AT+CSQF" => {
                let rating = self.with_state(|s| s.signal_rating);
                self.info_reply(&format!("+CSQF:{}", rating.wire_value()))
                    .await;
            }

            "AT+CULK" => self.reply_ok().await,
            "AT+CULK?" => self.info_reply("0").await,

            "AT+IPR" | "AT+IPR=" => self.reply_ok().await,

            // -------------------------------------------------------------
            // SBD operations
            // -------------------------------------------------------------

            // Accepted without a reply, matching the modem firmware quirk
            // this emulates.
            "AT+SBDWT=" => {
                self.shared
                    .log(LogLevel::Debug, "SBDWT accepted (no reply)");
            }

            "AT+SBDRT" => {
                let mt = self.with_state(|s| s.buffers.mt.clone());
                self.shared.write_line("+SBDRT:").await;
                self.shared.write_line(&mt).await;
                self.reply_ok().await;
            }

            "AT+SBDWB=" => self.handle_sbdwb(cmd.detail).await,

            "AT+SBDIX" | "AT+SBDIXA" => {
                session::run_session(&self.shared, &self.signer).await;
            }

            "AT+SBDDET" => self.info_reply("+SBDDET:0,0").await,

            "AT+SBDMTA=" => match cmd.detail {
                "0" => {
                    self.with_state(|s| s.ring_alerts_enabled = false);
                    self.reply_ok().await;
                }
                "1" => {
                    self.with_state(|s| s.ring_alerts_enabled = true);
                    self.reply_ok().await;
                }
                _ => self.reply_error().await,
            },

            "AT+SBDAREG=" => match cmd.detail {
                "0" | "1" | "2" => self.reply_ok().await,
                _ => self.reply_error().await,
            },

            "AT+SBDD0" => {
                self.with_state(|s| s.buffers.clear_mo());
                self.shared.log(LogLevel::Debug, "MO buffer cleared");
                self.reply_ok().await;
            }
            "AT+SBDD1" => {
                self.with_state(|s| s.buffers.clear_mt());
                self.shared.log(LogLevel::Debug, "MT buffer cleared");
                self.reply_ok().await;
            }
            "AT+SBDD2" => {
                self.with_state(|s| {
                    s.buffers.clear_mo();
                    s.buffers.clear_mt();
                });
                self.shared.log(LogLevel::Debug, "MO and MT buffers cleared");
                self.reply_ok().await;
            }

            unknown => {
                self.reply_error().await;
                self.shared
                    .log(LogLevel::Error, format!("unknown command: {unknown:?}"));
            }
        }
    }

    /// `AT+CIER=` -- set the unsolicited indicator subscription, then
    /// report the current levels for whichever indicators just turned on.
    async fn configure_indicators(&mut self, detail: &str) {
        let Some((signal, service)) = protocol::parse_cier_detail(detail) else {
            self.reply_error().await;
            self.shared
                .log(LogLevel::Warn, format!("rejected CIER tuple: {detail:?}"));
            return;
        };

        let bars = self.with_state(|s| {
            s.signal_quality_indicator = signal;
            s.service_availability_indicator = service;
            s.current_signal
        });
        self.reply_ok().await;

        if signal {
            self.shared.write_line(&format_ciev_signal(bars)).await;
        }
        if service {
            self.shared.write_line(&format_ciev_service(bars)).await;
        }
    }

    /// `AT%R` -- S-register dump, paced like the real firmware.
    async fn dump_registers(&self) {
        self.shared.write_line("S-REGISTERS:").await;
        for i in 0..64 {
            tokio::time::sleep(jitter_short()).await;
            let line = format!(
                "S{:03}:{:03} S{:03}:{:03}",
                i,
                register_default(i),
                i + 64,
                register_default(i + 64)
            );
            self.shared.write_line(&line).await;
        }
        self.reply_ok().await;
    }

    /// `AT+SBDWB=<len>` -- validate the announced length, switch the
    /// inbound pipe to binary framing, and run the upload to completion.
    async fn handle_sbdwb(&mut self, detail: &str) {
        let Some(len) = protocol::parse_sbdwb_len(detail) else {
            self.shared.write_line(SBDWB_BAD_LENGTH).await;
            self.shared
                .log(LogLevel::Warn, format!("SBDWB length rejected: {detail:?}"));
            return;
        };

        // The framing switch is atomic: partial text on either side of the
        // binary phase never leaks across.
        self.framer.clear();
        self.shared.write_line(REPLY_READY).await;
        self.binary_upload(len + 2).await;
        self.framer.clear();
    }

    /// The binary upload phase: accumulate `expected` bytes (payload plus
    /// two checksum bytes) under the 60-second deadline, chunks delimited
    /// by the inter-byte idle.
    async fn binary_upload(&mut self, expected: usize) {
        let deadline = tokio::time::Instant::now() + UPLOAD_TIMEOUT;
        let mut accum: Vec<u8> = Vec::with_capacity(expected);

        loop {
            match tokio::time::timeout_at(deadline, self.in_rx.recv()).await {
                Err(_) => {
                    self.shared.write_line(SBDWB_TIMEOUT).await;
                    self.shared.log(LogLevel::Warn, "binary upload timed out");
                    return;
                }
                Ok(None) => return,
                Ok(Some(bytes)) => accum.extend_from_slice(&bytes),
            }

            // Absorb the rest of the chunk until the line goes idle.
            loop {
                match tokio::time::timeout(BINARY_IDLE, self.in_rx.recv()).await {
                    Ok(Some(more)) => accum.extend_from_slice(&more),
                    Ok(None) => return,
                    Err(_) => break,
                }
            }

            if accum.len() == expected {
                let (payload, checksum) = accum.split_at(expected - 2);
                if checksum == protocol::checksum(payload).as_slice() {
                    self.with_state(|s| s.buffers.load_mo(payload));
                    self.shared.write_line(SBDWB_OK).await;
                    self.shared.log(
                        LogLevel::Info,
                        format!("MO buffer loaded ({} bytes)", expected - 2),
                    );
                } else {
                    self.shared.write_line(SBDWB_CHECKSUM_MISMATCH).await;
                    self.shared
                        .log(LogLevel::Warn, "binary upload checksum mismatch");
                }
                return;
            }

            if accum.len() > expected {
                self.shared.write_line(SBDWB_CHECKSUM_MISMATCH).await;
                self.shared.log(
                    LogLevel::Warn,
                    format!("binary upload overran announced length ({} > {expected})", accum.len()),
                );
                return;
            }
            // Short of the announced length: keep waiting out the deadline.
        }
    }
}

/// The transport pump task: sole owner of the transport. Drains the
/// outbound queue with priority, forwards inbound bytes to the engine.
pub(crate) async fn pump_loop(
    mut transport: Box<dyn Transport>,
    shared: Arc<Shared>,
    mut out_rx: mpsc::Receiver<Vec<u8>>,
    in_tx: mpsc::Sender<Vec<u8>>,
) {
    loop {
        tokio::select! {
            biased;

            // Priority: drain queued outbound lines.
            out = out_rx.recv() => {
                match out {
                    Some(bytes) => {
                        if let Err(e) = transport.send(&bytes).await {
                            shared.log(LogLevel::Error, format!("transport write failed: {e}"));
                        }
                    }
                    None => break,
                }
            }

            // Idle: poll for inbound bytes with a short timeout.
            result = async {
                let mut buf = [0u8; 256];
                let n = transport.receive(&mut buf, Duration::from_millis(50)).await?;
                Ok::<Vec<u8>, Error>(buf[..n].to_vec())
            } => {
                match result {
                    Ok(bytes) if !bytes.is_empty() => {
                        if in_tx.send(bytes).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(Error::Timeout) => {}
                    Err(Error::NotConnected) => {
                        shared.log(LogLevel::Error, "transport disconnected");
                        break;
                    }
                    Err(e) => {
                        shared.log(LogLevel::Error, format!("transport read failed: {e}"));
                        // Persistent faults would otherwise spin this loop.
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }
    }

    let _ = transport.close().await;
    tracing::debug!("transport pump stopped");
}
