//! Mobile-originated / mobile-terminated message buffers.
//!
//! Pure state: the fixed 340-byte MO buffer, the MT text buffer, and the
//! MOMSN/MTMSN sequence counters. The counters move only when a session
//! completes successfully (see the session module).

use crate::protocol::MO_BUFFER_LEN;

/// The SBD message buffer pair and sequence counters.
#[derive(Debug)]
pub struct SbdBuffers {
    mo: [u8; MO_BUFFER_LEN],
    /// Mobile-originated message sequence number.
    pub mo_seq: u16,
    /// Mobile-terminated text buffer.
    pub mt: String,
    /// Mobile-terminated message sequence number.
    pub mt_seq: u16,
}

impl SbdBuffers {
    pub fn new() -> Self {
        Self {
            mo: [0; MO_BUFFER_LEN],
            mo_seq: 0,
            mt: String::new(),
            mt_seq: 0,
        }
    }

    /// The full 340-byte MO buffer, zero padding included.
    pub fn mo(&self) -> &[u8; MO_BUFFER_LEN] {
        &self.mo
    }

    /// The MO payload: everything through the last non-zero byte.
    pub fn mo_payload(&self) -> &[u8] {
        let end = self
            .mo
            .iter()
            .rposition(|&b| b != 0)
            .map(|pos| pos + 1)
            .unwrap_or(0);
        &self.mo[..end]
    }

    /// Zero-fill the MO buffer, then copy `payload` to its head.
    ///
    /// Callers validate the length beforehand; anything longer than the
    /// buffer is truncated rather than overrun.
    pub fn load_mo(&mut self, payload: &[u8]) {
        self.mo.fill(0);
        let n = payload.len().min(MO_BUFFER_LEN);
        self.mo[..n].copy_from_slice(&payload[..n]);
    }

    /// Clear the MO buffer to all zeros (`AT+SBDD0`).
    pub fn clear_mo(&mut self) {
        self.mo.fill(0);
    }

    /// Clear the MT text buffer (`AT+SBDD1`).
    pub fn clear_mt(&mut self) {
        self.mt.clear();
    }

    /// Advance both sequence counters after a successful session.
    pub fn bump_sequences(&mut self) {
        self.mo_seq = self.mo_seq.wrapping_add(1);
        self.mt_seq = self.mt_seq.wrapping_add(1);
    }
}

impl Default for SbdBuffers {
    fn default() -> Self {
        Self::new()
    }
}
