//! Inbound framing demultiplexer.
//!
//! The DTE-facing byte stream is framed one of two ways, and exactly one
//! framing is active at a time:
//!
//! - **Text framing** (command mode): bytes accumulate until a `\r\n`
//!   boundary; the preceding span is delivered as a [`Frame::Line`]
//!   (terminator excluded). Empty lines are legal and become the empty
//!   command. A CRLF-terminated span that is not valid UTF-8 is delivered
//!   as a [`Frame::Chunk`] so the engine can answer it with `ERROR`.
//! - **Binary framing** (inside an `SBDWB` upload): raw bytes with no
//!   decoding, a chunk closing after [`BINARY_IDLE`] with no further byte.
//!   The engine drives this directly off the byte channel; the framer is
//!   detached and any residual partial frame discarded when modes switch.

use bytes::BytesMut;
use std::time::Duration;

/// Inter-byte idle that closes a chunk in binary framing.
pub const BINARY_IDLE: Duration = Duration::from_millis(30);

/// One inbound frame produced by the demultiplexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A CRLF-terminated ASCII command line, terminator stripped.
    Line(String),
    /// Raw bytes that do not form a text line.
    Chunk(Vec<u8>),
}

/// Incremental CRLF line framer for command mode.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: BytesMut,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed inbound bytes and drain every complete frame they produce.
    ///
    /// Incomplete trailing data stays buffered for the next push.
    pub fn push(&mut self, data: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(pos) = find_crlf(&self.buf) {
            let span = self.buf.split_to(pos + 2);
            let body = &span[..pos];
            match std::str::from_utf8(body) {
                Ok(s) => frames.push(Frame::Line(s.to_string())),
                Err(_) => frames.push(Frame::Chunk(body.to_vec())),
            }
        }
        frames
    }

    /// Discard any residual partial frame. Called when the engine switches
    /// framing modes; the switch is atomic and leftovers never leak across.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Number of bytes buffered awaiting a terminator.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let mut framer = LineFramer::new();
        let frames = framer.push(b"AT+SBDIX\r\n");
        assert_eq!(frames, vec![Frame::Line("AT+SBDIX".into())]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn line_split_across_pushes() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"AT+SB").is_empty());
        assert!(framer.push(b"DIX\r").is_empty());
        let frames = framer.push(b"\n");
        assert_eq!(frames, vec![Frame::Line("AT+SBDIX".into())]);
    }

    #[test]
    fn multiple_lines_in_one_push() {
        let mut framer = LineFramer::new();
        let frames = framer.push(b"ATE0\r\nAT&K0\r\n");
        assert_eq!(
            frames,
            vec![Frame::Line("ATE0".into()), Frame::Line("AT&K0".into())]
        );
    }

    #[test]
    fn empty_line_is_a_frame() {
        let mut framer = LineFramer::new();
        let frames = framer.push(b"\r\n");
        assert_eq!(frames, vec![Frame::Line(String::new())]);
    }

    #[test]
    fn non_utf8_span_becomes_chunk() {
        let mut framer = LineFramer::new();
        let frames = framer.push(&[0xfe, 0xff, 0x01, b'\r', b'\n']);
        assert_eq!(frames, vec![Frame::Chunk(vec![0xfe, 0xff, 0x01])]);
    }

    #[test]
    fn bare_cr_or_lf_does_not_terminate() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"ATE0\r").is_empty());
        assert!(framer.push(b"ATE1\n").is_empty());
        // The buffered "ATE0\rATE1\n" still awaits a CRLF.
        assert_eq!(framer.pending(), 10);
    }

    #[test]
    fn clear_discards_partial_frame() {
        let mut framer = LineFramer::new();
        framer.push(b"AT+SBD");
        framer.clear();
        let frames = framer.push(b"IX\r\n");
        assert_eq!(frames, vec![Frame::Line("IX".into())]);
    }
}
