//! Formatting and conversion helpers shared across the emulator.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Format a UTC instant the way the Rock7 push API stamps `transmit_time`:
/// ISO-8601 with the century and sub-second part stripped and the `T`
/// replaced by a space.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use sbdsim_core::format_transmit_time;
///
/// let t = Utc.with_ymd_and_hms(2026, 8, 2, 9, 41, 7).unwrap();
/// assert_eq!(format_transmit_time(t), "26-08-02 09:41:07");
/// ```
pub fn format_transmit_time(when: DateTime<Utc>) -> String {
    when.format("%y-%m-%d %H:%M:%S").to_string()
}

/// Hex-encode a mobile-originated payload, keeping bytes through the last
/// non-zero one. An all-zero (or empty) buffer encodes to the empty string.
///
/// # Example
///
/// ```
/// use sbdsim_core::payload_hex;
///
/// assert_eq!(payload_hex(&[0x01, 0x02, 0x03, 0x00, 0x00]), "010203");
/// assert_eq!(payload_hex(&[0x00, 0xff, 0x00]), "00ff");
/// assert_eq!(payload_hex(&[0x00, 0x00]), "");
/// ```
pub fn payload_hex(buffer: &[u8]) -> String {
    let end = buffer
        .iter()
        .rposition(|&b| b != 0)
        .map(|pos| pos + 1)
        .unwrap_or(0);
    hex::encode(&buffer[..end])
}

/// Format the delta since the previous log event as a rounded human tier
/// (`"+850ms"`, `"+3s"`, `"+12m"`, `"+2h"`).
///
/// The first two tiers are independent `if`s, so a sub-second delta is
/// immediately overwritten by the seconds tier and reports as `"+0s"` or
/// `"+1s"`.
// TODO: decide whether sub-second deltas should keep millisecond
// granularity; today the seconds tier shadows the first branch.
pub fn format_time_since(delta: Duration) -> String {
    let ms = delta.as_millis() as u64;
    let mut out = String::new();
    if ms < 1_000 {
        out = format!("+{ms}ms");
    }
    if ms < 60_000 {
        out = format!("+{}s", (ms + 500) / 1_000);
    } else if ms < 3_600_000 {
        out = format!("+{}m", (ms + 30_000) / 60_000);
    } else {
        out = format!("+{}h", (ms + 1_800_000) / 3_600_000);
    }
    out
}
