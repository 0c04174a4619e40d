//! Simulated signal-quality model.
//!
//! A single ticker samples a new bar value inside the configured rating's
//! range at random 15-60 second intervals. When the value changes and the
//! DTE has subscribed with `AT+CIER=`, the corresponding unsolicited
//! `+CIEV` lines go out through the shared single-writer queue -- possibly
//! landing between a command's echo and its reply, exactly as on real
//! hardware.
//!
//! The first sample runs at construction so the signal is inside the
//! rating's range before the DTE can observe it; the ticker then
//! reschedules itself until teardown aborts it.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::protocol::{format_ciev_service, format_ciev_signal};
use crate::state::{EmulatorState, Shared};

/// Bounds of the self-rescheduling tick interval.
const TICK_MIN_SECS: u64 = 15;
const TICK_MAX_SECS: u64 = 60;

/// Sample a bar value for the given rating. A parked radio always reads 0.
pub(crate) fn sample_bars(state: &EmulatorState, rng: &mut impl Rng) -> u8 {
    if !state.radio_activity_enabled {
        return 0;
    }
    let (min, max) = state.signal_rating.bar_range();
    rng.gen_range(min..=max)
}

/// Run one ticker pass: sample, update, and collect the unsolicited
/// indicator lines to write (empty when the value did not change or the
/// DTE has not subscribed).
pub(crate) fn tick(state: &mut EmulatorState, rng: &mut impl Rng) -> Vec<String> {
    let next = sample_bars(state, rng);
    if next == state.current_signal {
        return Vec::new();
    }
    state.current_signal = next;

    let mut lines = Vec::new();
    if state.signal_quality_indicator {
        lines.push(format_ciev_signal(next));
    }
    if state.service_availability_indicator {
        lines.push(format_ciev_service(next));
    }
    lines
}

/// The ticker task: sleep a random interval, tick, write indicator lines,
/// repeat. Runs until aborted at emulator teardown.
pub(crate) async fn run_ticker(shared: Arc<Shared>) {
    loop {
        let secs = rand::thread_rng().gen_range(TICK_MIN_SECS..=TICK_MAX_SECS);
        tokio::time::sleep(Duration::from_secs(secs)).await;

        let (bars, lines) = {
            let mut state = shared.state.lock().expect("emulator state mutex poisoned");
            let lines = tick(&mut state, &mut rand::thread_rng());
            (state.current_signal, lines)
        };

        if !lines.is_empty() {
            tracing::debug!(bars, "signal level changed");
        }
        for line in &lines {
            shared.write_line(line).await;
        }
    }
}
