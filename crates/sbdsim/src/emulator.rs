//! The public emulator handle.
//!
//! [`Emulator`] owns the three background tasks (transport pump, command
//! engine, signal ticker) and the event bus. Construct one through
//! [`EmulatorBuilder`](crate::builder::EmulatorBuilder); dropping the
//! handle (or calling [`shutdown`](Emulator::shutdown)) aborts the tasks
//! and releases the transport.

use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use sbdsim_core::events::{EmulatorEvent, SignerKeyDetails};
use sbdsim_core::transport::Transport;
use sbdsim_core::types::SignalRating;
use sbdsim_core::LogLevel;

use crate::engine::{pump_loop, Engine};
use crate::signal;
use crate::signer::Signer;
use crate::state::Shared;

/// Capacity of the event bus. Lagging subscribers lose oldest events.
const EVENT_CAPACITY: usize = 256;

/// Capacity of the inbound/outbound byte queues.
const QUEUE_CAPACITY: usize = 64;

/// A running SBD transceiver emulator.
pub struct Emulator {
    shared: Arc<Shared>,
    /// Auto-generated key material awaiting its one-shot publication.
    pending_key_event: Mutex<Option<SignerKeyDetails>>,
    pump: JoinHandle<()>,
    engine: JoinHandle<()>,
    ticker: JoinHandle<()>,
}

impl Emulator {
    /// Spawn the emulator tasks over an open transport.
    pub(crate) fn start(
        transport: Box<dyn Transport>,
        rating: SignalRating,
        mut signer: Signer,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel(QUEUE_CAPACITY);

        let shared = Arc::new(Shared::new(rating, event_tx, out_tx));
        let pending_key_event = Mutex::new(signer.take_generated());

        // First signal sample runs before any command can observe the
        // level, so it is already inside the rating's range.
        {
            let mut state = shared.state.lock().expect("emulator state mutex poisoned");
            let _ = signal::tick(&mut state, &mut rand::thread_rng());
        }

        shared.log(LogLevel::Info, "SBD transceiver emulator online");

        let pump = tokio::spawn(pump_loop(
            transport,
            shared.clone(),
            out_rx,
            in_tx,
        ));
        let engine = tokio::spawn(Engine::new(shared.clone(), signer, in_rx).run());
        let ticker = tokio::spawn(signal::run_ticker(shared.clone()));

        Self {
            shared,
            pending_key_event,
            pump,
            engine,
            ticker,
        }
    }

    /// Subscribe to the emulator's event stream.
    ///
    /// Returns a broadcast receiver; the channel is bounded, so a consumer
    /// that falls behind misses the oldest events. When the signer key was
    /// auto-generated, its one-shot `signer-key-generated` event is
    /// published at the first subscription so no subscriber can miss it.
    pub fn subscribe(&self) -> broadcast::Receiver<EmulatorEvent> {
        let rx = self.shared.events.subscribe();
        if let Some(details) = self
            .pending_key_event
            .lock()
            .expect("key event mutex poisoned")
            .take()
        {
            let _ = self
                .shared
                .events
                .send(EmulatorEvent::SignerKeyGenerated(details));
        }
        rx
    }

    /// Stop the emulator: aborts the ticker, engine, and transport pump.
    pub fn shutdown(self) {
        self.shared.log(LogLevel::Info, "emulator shutting down");
        // Drop runs the aborts.
    }
}

impl Drop for Emulator {
    fn drop(&mut self) {
        self.ticker.abort();
        self.engine.abort();
        self.pump.abort();
    }
}

impl std::fmt::Debug for Emulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emulator").finish_non_exhaustive()
    }
}
