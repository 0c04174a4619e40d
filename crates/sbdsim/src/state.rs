//! Emulator state and the shared handle the background tasks operate on.
//!
//! All mutable emulator state lives in [`EmulatorState`] behind a mutex in
//! [`Shared`]. The command engine task and the signal ticker task both
//! lock it, but no guard ever lives across an `.await`, so the two tasks
//! interleave only at suspension points -- the cooperative model the real
//! module's host interface exhibits. All outbound bytes funnel through one
//! mpsc queue consumed by the transport pump, which keeps the DTE link
//! single-writer no matter which task produced a line.

use std::sync::Mutex;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};

use sbdsim_core::events::{EmulatorEvent, LogEvent, LogLevel};
use sbdsim_core::helpers::format_time_since;
use sbdsim_core::types::SignalRating;

use crate::buffers::SbdBuffers;
use crate::protocol::LINE_TERMINATOR;

/// Every mutable field of the emulated transceiver.
#[derive(Debug)]
pub struct EmulatorState {
    /// Whether inbound lines are written back before their response.
    pub echo_enabled: bool,
    /// `AT+SBDMTA=` ring alert enable.
    pub ring_alerts_enabled: bool,
    /// Configured signal-quality profile (fixed at construction).
    pub signal_rating: SignalRating,
    /// Current signal bars, 0..=5.
    pub current_signal: u8,
    /// `+CIEV:0` subscription flag (`AT+CIER=`).
    pub signal_quality_indicator: bool,
    /// `+CIEV:1` subscription flag (`AT+CIER=`).
    pub service_availability_indicator: bool,
    /// MO/MT buffers and sequence counters.
    pub buffers: SbdBuffers,
    /// `ATQ1` / `AT*F`: all outbound writes suppressed.
    pub quiet_mode: bool,
    /// `AT*R0` parks the radio; signal is forced to zero while off.
    pub radio_activity_enabled: bool,
    /// Latched by `AT*F`; every later command is silently ignored.
    pub ready_for_shutdown: bool,
    /// Whether a ring alert is currently asserted (`AT+CRIS`).
    pub ring_alert_active: bool,
}

impl EmulatorState {
    pub fn new(rating: SignalRating) -> Self {
        Self {
            echo_enabled: true,
            ring_alerts_enabled: false,
            signal_rating: rating,
            current_signal: 1,
            signal_quality_indicator: false,
            service_availability_indicator: false,
            buffers: SbdBuffers::new(),
            quiet_mode: false,
            radio_activity_enabled: true,
            ready_for_shutdown: false,
            ring_alert_active: false,
        }
    }
}

/// Handle shared by the engine, ticker, and pump tasks.
pub(crate) struct Shared {
    /// The emulator state. Guards must not be held across `.await`.
    pub state: Mutex<EmulatorState>,
    /// Event bus to observers.
    pub events: broadcast::Sender<EmulatorEvent>,
    /// Single-writer outbound byte queue, consumed by the transport pump.
    outbound: mpsc::Sender<Vec<u8>>,
    /// Instant of the previous log event, for the rounded delta tag.
    last_log: Mutex<Instant>,
}

impl Shared {
    pub fn new(
        rating: SignalRating,
        events: broadcast::Sender<EmulatorEvent>,
        outbound: mpsc::Sender<Vec<u8>>,
    ) -> Self {
        Self {
            state: Mutex::new(EmulatorState::new(rating)),
            events,
            outbound,
            last_log: Mutex::new(Instant::now()),
        }
    }

    /// Queue one CRLF-terminated line for the DTE.
    ///
    /// Suppressed entirely while `quiet_mode` is latched.
    pub async fn write_line(&self, line: &str) {
        let quiet = self
            .state
            .lock()
            .expect("emulator state mutex poisoned")
            .quiet_mode;
        if quiet {
            tracing::trace!(line, "suppressing outbound line (quiet mode)");
            return;
        }

        tracing::trace!(line, "TX");
        let mut bytes = Vec::with_capacity(line.len() + 2);
        bytes.extend_from_slice(line.as_bytes());
        bytes.extend_from_slice(LINE_TERMINATOR.as_bytes());
        if self.outbound.send(bytes).await.is_err() {
            tracing::debug!("outbound queue closed, dropping line");
        }
    }

    /// Emit a log event to the bus and mirror it to `tracing`.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();

        match level {
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Error | LogLevel::Critical => tracing::error!("{message}"),
        }

        let delta = {
            let mut last = self.last_log.lock().expect("log clock mutex poisoned");
            let now = Instant::now();
            let delta = now.duration_since(*last);
            *last = now;
            delta
        };

        let _ = self.events.send(EmulatorEvent::Log(LogEvent {
            level,
            message,
            datetime: Utc::now().to_rfc3339(),
            time_since_last: format_time_since(delta),
        }));
    }
}
