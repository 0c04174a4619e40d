//! SBD session simulator (`AT+SBDIX` / `AT+SBDIXA`).
//!
//! A session attempt sleeps out a realistic 15-30 second link negotiation,
//! then succeeds or fails on the current signal level. Success bumps both
//! sequence counters, signs the MO payload claims, and emits the message
//! event; failure leaves all state untouched and reports `32` in-band.
//! With the radio parked (`AT*R0`) the attempt is refused immediately
//! with `34`.

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

use sbdsim_core::events::{EmulatorEvent, SbdMessage};
use sbdsim_core::helpers::{format_transmit_time, payload_hex};
use sbdsim_core::LogLevel;

use crate::protocol::{format_sbdix, IMEI, REPLY_OK};
use crate::signer::Signer;
use crate::state::Shared;

/// Bounds of the simulated link negotiation delay.
const SESSION_MIN_SECS: u64 = 15;
const SESSION_MAX_SECS: u64 = 30;

/// Fixed message identity. The geodetic fix is synthetic; the serial and
/// IMEI match the modeled unit.
pub(crate) const SERIAL_NUMBER: u32 = 206899;
pub(crate) const IRIDIUM_LATITUDE: f64 = 50.2563;
pub(crate) const IRIDIUM_LONGITUDE: f64 = 82.2532;
pub(crate) const IRIDIUM_CEP: u32 = 122;
pub(crate) const DEVICE_TYPE: &str = "ROCKBLOCK";

/// JWS issuer claim.
pub(crate) const ISSUER: &str = "Rock7";

/// The claims signed into the message JWT. Field names are the wire names
/// of the Rock7 push API, plus the standard `iss` claim.
#[derive(Debug, Serialize)]
struct SessionClaims<'a> {
    momsn: u16,
    data: &'a str,
    serial: u32,
    iridium_latitude: f64,
    iridium_longitude: f64,
    iridium_cep: u32,
    imei: &'a str,
    device_type: &'a str,
    transmit_time: &'a str,
    iss: &'a str,
}

/// Decide a session attempt from the current signal level.
///
/// Two or more bars always get through. One bar succeeds unless the
/// 5..=10 roll lands on 10 (the only multiple of ten in the range), so
/// roughly five attempts in six. Zero bars never succeed.
pub(crate) fn session_succeeds(bars: u8, rng: &mut impl Rng) -> bool {
    bars >= 2 || (bars == 1 && rng.gen_range(5u8..=10) % 10 != 0)
}

/// Run one `SBDIX`/`SBDIXA` attempt to completion.
pub(crate) async fn run_session(shared: &Shared, signer: &Signer) {
    let (radio_on, mo_seq, mt_seq) = {
        let state = shared.state.lock().expect("emulator state mutex poisoned");
        (
            state.radio_activity_enabled,
            state.buffers.mo_seq,
            state.buffers.mt_seq,
        )
    };

    if !radio_on {
        shared.write_line(&format_sbdix(34, mo_seq, 2, mt_seq)).await;
        shared.write_line(REPLY_OK).await;
        shared.log(LogLevel::Warn, "SBD session refused: radio activity disabled");
        return;
    }

    shared.log(LogLevel::Info, "SBD session started");
    let wait = rand::thread_rng().gen_range(SESSION_MIN_SECS..=SESSION_MAX_SECS);
    tokio::time::sleep(Duration::from_secs(wait)).await;

    let (bars, succeeded) = {
        let state = shared.state.lock().expect("emulator state mutex poisoned");
        let bars = state.current_signal;
        (bars, session_succeeds(bars, &mut rand::thread_rng()))
    };

    if !succeeded {
        let (mo_seq, mt_seq) = {
            let state = shared.state.lock().expect("emulator state mutex poisoned");
            (state.buffers.mo_seq, state.buffers.mt_seq)
        };
        shared.write_line(&format_sbdix(32, mo_seq, 2, mt_seq)).await;
        shared.write_line(REPLY_OK).await;
        shared.log(
            LogLevel::Warn,
            format!("SBD session failed (signal level {bars})"),
        );
        return;
    }

    // Assemble and sign before committing the sequence bump, so a signer
    // failure leaves the counters where they were.
    let (next_mo, next_mt, data) = {
        let state = shared.state.lock().expect("emulator state mutex poisoned");
        (
            state.buffers.mo_seq.wrapping_add(1),
            state.buffers.mt_seq.wrapping_add(1),
            payload_hex(state.buffers.mo()),
        )
    };
    let transmit_time = format_transmit_time(Utc::now());

    let claims = SessionClaims {
        momsn: next_mo,
        data: &data,
        serial: SERIAL_NUMBER,
        iridium_latitude: IRIDIUM_LATITUDE,
        iridium_longitude: IRIDIUM_LONGITUDE,
        iridium_cep: IRIDIUM_CEP,
        imei: IMEI,
        device_type: DEVICE_TYPE,
        transmit_time: &transmit_time,
        iss: ISSUER,
    };

    let jwt = match signer.sign(&claims) {
        Ok(token) => token,
        Err(e) => {
            shared.log(LogLevel::Error, format!("session signing failed: {e}"));
            shared.write_line(&format_sbdix(32, mo_seq, 2, mt_seq)).await;
            shared.write_line(REPLY_OK).await;
            return;
        }
    };

    {
        let mut state = shared.state.lock().expect("emulator state mutex poisoned");
        state.buffers.bump_sequences();
    }

    let _ = shared.events.send(EmulatorEvent::SbdMessage(SbdMessage {
        momsn: next_mo,
        data,
        serial: SERIAL_NUMBER,
        iridium_latitude: IRIDIUM_LATITUDE,
        iridium_longitude: IRIDIUM_LONGITUDE,
        iridium_cep: IRIDIUM_CEP,
        imei: IMEI.to_string(),
        device_type: DEVICE_TYPE.to_string(),
        transmit_time,
        jwt,
    }));

    shared.write_line(&format_sbdix(0, next_mo, 0, next_mt)).await;
    shared.write_line(REPLY_OK).await;
    shared.log(
        LogLevel::Info,
        format!("SBD session succeeded (MOMSN {next_mo})"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn two_or_more_bars_always_succeed() {
        let mut rng = StdRng::seed_from_u64(1);
        for bars in 2..=5 {
            for _ in 0..50 {
                assert!(session_succeeds(bars, &mut rng));
            }
        }
    }

    #[test]
    fn zero_bars_never_succeed() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert!(!session_succeeds(0, &mut rng));
        }
    }

    #[test]
    fn one_bar_mostly_succeeds() {
        let mut rng = StdRng::seed_from_u64(1);
        let successes = (0..600)
            .filter(|_| session_succeeds(1, &mut rng))
            .count();
        // Expected rate is 5/6; leave generous slack around it.
        assert!((420..=580).contains(&successes), "got {successes}/600");
    }

    #[test]
    fn claims_serialize_with_wire_names() {
        let claims = SessionClaims {
            momsn: 1,
            data: "010203",
            serial: SERIAL_NUMBER,
            iridium_latitude: IRIDIUM_LATITUDE,
            iridium_longitude: IRIDIUM_LONGITUDE,
            iridium_cep: IRIDIUM_CEP,
            imei: IMEI,
            device_type: DEVICE_TYPE,
            transmit_time: "26-08-02 12:00:00",
            iss: ISSUER,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["momsn"], 1);
        assert_eq!(json["data"], "010203");
        assert_eq!(json["serial"], 206899);
        assert_eq!(json["iridium_cep"], 122);
        assert_eq!(json["device_type"], "ROCKBLOCK");
        assert_eq!(json["iss"], "Rock7");
    }
}
