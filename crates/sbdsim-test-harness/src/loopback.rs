//! In-memory duplex serial pair.
//!
//! The emulator side implements [`Transport`]; the DTE side is a plain
//! handle with line-oriented helpers. Bytes written on one side come out
//! on the other in order, with no framing applied -- framing is the
//! emulator's job and exactly what the tests exercise.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

use sbdsim_core::error::{Error, Result};
use sbdsim_core::transport::Transport;

/// How long [`DtePort::read_line`] waits before giving up. Generous enough
/// to cover every in-protocol delay (the 60-second upload window, the
/// 15-30 second session negotiation) under the paused test clock.
const READ_LINE_TIMEOUT: Duration = Duration::from_secs(120);

/// Build a connected emulator-side / DTE-side pair.
pub fn loopback() -> (Box<LoopbackTransport>, DtePort) {
    let (to_emulator_tx, to_emulator_rx) = mpsc::channel(64);
    let (to_dte_tx, to_dte_rx) = mpsc::channel(64);

    let transport = Box::new(LoopbackTransport {
        rx: to_emulator_rx,
        tx: to_dte_tx,
        pending: Vec::new(),
        connected: true,
    });
    let port = DtePort {
        tx: to_emulator_tx,
        rx: to_dte_rx,
        buf: Vec::new(),
    };
    (transport, port)
}

/// The emulator's half of the pair.
pub struct LoopbackTransport {
    rx: mpsc::Receiver<Vec<u8>>,
    tx: mpsc::Sender<Vec<u8>>,
    /// Received bytes not yet copied out (receive buffer was smaller than
    /// the incoming batch).
    pending: Vec<u8>,
    connected: bool,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.tx
            .send(data.to_vec())
            .await
            .map_err(|_| Error::NotConnected)
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        if self.pending.is_empty() {
            match tokio::time::timeout(timeout, self.rx.recv()).await {
                Ok(Some(bytes)) => self.pending = bytes,
                Ok(None) => return Err(Error::NotConnected),
                Err(_) => return Err(Error::Timeout),
            }
        }

        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// The test's half of the pair: what a DTE application would see.
pub struct DtePort {
    tx: mpsc::Sender<Vec<u8>>,
    rx: mpsc::Receiver<Vec<u8>>,
    buf: Vec<u8>,
}

impl DtePort {
    /// Write raw bytes to the emulator (binary upload payloads).
    pub async fn send(&self, bytes: &[u8]) {
        let _ = self.tx.send(bytes.to_vec()).await;
    }

    /// Write one CRLF-terminated command line.
    pub async fn send_line(&self, line: &str) {
        let mut bytes = Vec::with_capacity(line.len() + 2);
        bytes.extend_from_slice(line.as_bytes());
        bytes.extend_from_slice(b"\r\n");
        let _ = self.tx.send(bytes).await;
    }

    /// Read the next CRLF-terminated line, waiting up to the given timeout.
    ///
    /// Returns `None` on timeout or when the emulator side is gone. The
    /// terminator is stripped.
    pub async fn try_read_line(&mut self, timeout: Duration) -> Option<String> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(pos) = self.buf.windows(2).position(|w| w == b"\r\n") {
                let line: Vec<u8> = self.buf.drain(..pos + 2).take(pos).collect();
                return Some(String::from_utf8_lossy(&line).into_owned());
            }

            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(bytes)) => self.buf.extend_from_slice(&bytes),
                Ok(None) => return None,
                Err(_) => return None,
            }
        }
    }

    /// Read the next line with the default in-protocol timeout.
    pub async fn read_line(&mut self) -> Option<String> {
        self.try_read_line(READ_LINE_TIMEOUT).await
    }

    /// Bytes received but not yet consumed as a complete line.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bytes_cross_the_pair_in_both_directions() {
        let (mut transport, mut port) = loopback();

        port.send_line("AT+SBDIX").await;
        let mut buf = [0u8; 64];
        let n = transport
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"AT+SBDIX\r\n");

        transport.send(b"OK\r\n").await.unwrap();
        assert_eq!(port.read_line().await.as_deref(), Some("OK"));
    }

    #[tokio::test]
    async fn receive_handles_small_buffers() {
        let (mut transport, port) = loopback();

        port.send(b"abcdef").await;

        let mut buf = [0u8; 4];
        let n = transport
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!((&buf[..n], n), (&b"abcd"[..], 4));

        let n = transport
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"ef");
    }

    #[tokio::test]
    async fn receive_times_out_when_idle() {
        let (mut transport, _port) = loopback();
        let mut buf = [0u8; 8];
        let result = transport.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn read_line_reassembles_split_writes() {
        let (mut transport, mut port) = loopback();

        transport.send(b"REA").await.unwrap();
        transport.send(b"DY\r\nOK\r").await.unwrap();
        transport.send(b"\n").await.unwrap();

        assert_eq!(port.read_line().await.as_deref(), Some("READY"));
        assert_eq!(port.read_line().await.as_deref(), Some("OK"));
    }

    #[tokio::test]
    async fn try_read_line_times_out_on_silence() {
        let (_transport, mut port) = loopback();
        let line = port.try_read_line(Duration::from_millis(10)).await;
        assert!(line.is_none());
    }

    #[tokio::test]
    async fn closed_transport_rejects_io() {
        let (mut transport, _port) = loopback();
        transport.close().await.unwrap();
        assert!(!transport.is_connected());

        assert!(matches!(
            transport.send(b"OK\r\n").await,
            Err(Error::NotConnected)
        ));
        let mut buf = [0u8; 8];
        assert!(matches!(
            transport.receive(&mut buf, Duration::from_millis(10)).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn dropped_dte_surfaces_as_disconnect() {
        let (mut transport, port) = loopback();
        drop(port);

        let mut buf = [0u8; 8];
        let result = transport.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }
}
