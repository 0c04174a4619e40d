//! Iridium 9602/9603 AT text-protocol dialect.
//!
//! The SBD modem speaks CRLF-terminated ASCII command lines in one
//! direction and CRLF-terminated response lines in the other. A command
//! line is split at the first `=`: the left part including the `=` is the
//! *command key* (`AT+SBDWB=`), the remainder is the *detail string*
//! (`120`). Lines without `=` are a bare command key with an empty detail.
//!
//! # Command format
//!
//! ```text
//! <key>[=<detail>]\r\n
//! ```
//!
//! # Response format
//!
//! Responses are one or more CRLF-terminated lines. `OK` / `ERROR`
//! terminate most replies; solution lines carry a `+NAME:` prefix
//! (`+SBDIX: 0, 1, 0, 1, 0, 0`, `+CIEV:0,5`); the single digits `0`..`3`
//! are SBDWB result codes; `READY` announces the switch to binary upload
//! framing.

/// Outbound line terminator. Every line the emulator writes ends with this.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Positive completion reply.
pub const REPLY_OK: &str = "OK";

/// Negative completion reply (unknown command, framing error, bad detail).
pub const REPLY_ERROR: &str = "ERROR";

/// Announces the switch to binary upload framing after `AT+SBDWB=`.
pub const REPLY_READY: &str = "READY";

/// SBDWB result code: payload accepted into the MO buffer.
pub const SBDWB_OK: &str = "0";
/// SBDWB result code: the 60-second upload window elapsed.
pub const SBDWB_TIMEOUT: &str = "1";
/// SBDWB result code: checksum mismatch or malformed upload.
pub const SBDWB_CHECKSUM_MISMATCH: &str = "2";
/// SBDWB result code: length missing, unparsable, or out of range.
pub const SBDWB_BAD_LENGTH: &str = "3";

/// Size of the mobile-originated message buffer in bytes.
pub const MO_BUFFER_LEN: usize = 340;

/// Manufacturer identification (`AT+GMI` / `AT+CGMI`).
pub const MANUFACTURER: &str = "Iridium";

/// Product description (`ATI4`, `AT+GMM` / `AT+CGMM`).
pub const DEVICE_MODEL: &str = "IRIDIUM 9600 Family SBD Transceiver";

/// Software revision level (`ATI3`).
pub const SOFTWARE_REVISION: &str = "TA16005";

/// Hardware specification string (`ATI7`).
pub const HARDWARE_SPEC: &str = "BOOST0.0.0/9602NrvA-D/04/RAW0d";

/// IMEI, also the `AT+GSN` / `AT+CGSN` serial answer.
pub const IMEI: &str = "300534062390910";

/// A command line split into key and detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    /// Everything up to and including the first `=`, or the whole line.
    pub key: &'a str,
    /// Everything after the first `=`, or empty.
    pub detail: &'a str,
}

/// Split a command line at the first `=`.
///
/// # Example
///
/// ```
/// use sbdsim::protocol::parse_command;
///
/// let cmd = parse_command("AT+SBDWB=120");
/// assert_eq!(cmd.key, "AT+SBDWB=");
/// assert_eq!(cmd.detail, "120");
///
/// let bare = parse_command("AT+SBDIX");
/// assert_eq!(bare.key, "AT+SBDIX");
/// assert_eq!(bare.detail, "");
/// ```
pub fn parse_command(line: &str) -> ParsedCommand<'_> {
    match line.find('=') {
        Some(pos) => ParsedCommand {
            key: &line[..=pos],
            detail: &line[pos + 1..],
        },
        None => ParsedCommand {
            key: line,
            detail: "",
        },
    }
}

/// Compute the two-byte SBDWB checksum: the big-endian low 16 bits of the
/// plain byte summation of the payload.
///
/// The sum of a maximal 340-byte payload is 86,700, so a `u32` holds it
/// comfortably.
pub fn checksum(payload: &[u8]) -> [u8; 2] {
    let sum: u32 = payload.iter().map(|&b| u32::from(b)).sum();
    [((sum >> 8) & 0xff) as u8, (sum & 0xff) as u8]
}

/// Parse and range-check an `AT+SBDWB=` detail string.
///
/// Returns the payload length if it is a decimal integer in `1..=340`.
pub fn parse_sbdwb_len(detail: &str) -> Option<usize> {
    let len: usize = detail.trim().parse().ok()?;
    (1..=MO_BUFFER_LEN).contains(&len).then_some(len)
}

/// Decode an `AT+CIER=` detail tuple into `(signal, service)` indicator
/// flags. Only the tuples the firmware accepts are recognized; anything
/// else is a rejected configuration.
pub fn parse_cier_detail(detail: &str) -> Option<(bool, bool)> {
    match detail {
        "0,0,0,0" | "0,1,0,0" | "0,0,1,0" | "1,0,0,0" => Some((false, false)),
        "1,1,0,0" => Some((true, false)),
        "1,0,1,0" => Some((false, true)),
        "1,1,1,0" => Some((true, true)),
        _ => None,
    }
}

/// Format an `+SBDIX` session response line.
///
/// `mo_status` 0 means the MO message was delivered, 32 means the link
/// quality was insufficient, 34 means radio activity is disabled. The two
/// trailing zeros are the MT length and queued-message count, which this
/// emulator does not model.
pub fn format_sbdix(mo_status: u8, mo_seq: u16, mt_status: u8, mt_seq: u16) -> String {
    format!("+SBDIX: {mo_status}, {mo_seq}, {mt_status}, {mt_seq}, 0, 0")
}

/// Format the signal-quality indicator line (`+CIEV:0,<bars>`).
pub fn format_ciev_signal(bars: u8) -> String {
    format!("+CIEV:0,{bars}")
}

/// Format the service-availability indicator line (`+CIEV:1,<0|1>`).
/// Service is available whenever at least one signal bar is present.
pub fn format_ciev_service(bars: u8) -> String {
    format!("+CIEV:1,{}", u8::from(bars >= 1))
}
