//! Serial port transport for the DTE link.
//!
//! This module provides [`SerialTransport`], which implements the
//! [`Transport`] trait over the emulator's end of a serial-port pair.
//! The Iridium 9602/9603 presents a plain 3-wire serial interface:
//! 8 data bits, 1 stop bit, no parity, 19200 baud by default.
//!
//! # Example
//!
//! ```no_run
//! use sbdsim_transport::SerialTransport;
//! use sbdsim_core::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> sbdsim_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/pts/7", 19200).await?;
//!
//! transport.send(b"READY\r\n").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_millis(100)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sbdsim_core::error::{Error, Result};
use sbdsim_core::transport::Transport;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

/// Serial port transport for the emulator's DTE link.
///
/// Always opens 8N1 with no flow control; the modem's `AT&K` flow-control
/// commands are acknowledged but not acted on, matching the fixed profile
/// here.
pub struct SerialTransport {
    /// The underlying serial port stream.
    port: Option<SerialStream>,
    /// Port name for logging/debugging.
    port_name: String,
}

impl SerialTransport {
    /// Open a serial port with the given baud rate.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g. "/dev/pts/7" on Linux, "COM3" on
    ///   Windows)
    /// * `baud_rate` - Baud rate (the 9602 defaults to 19200)
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        tracing::debug!(port = %port, baud_rate, "opening serial port");

        let mut serial_stream = tokio_serial::new(port, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "failed to open serial port");
                Error::Transport(format!("failed to open serial port {}: {}", port, e))
            })?;

        // De-assert DTR and RTS immediately after opening. The OS asserting
        // DTR on open (a common default) would look like a host-side state
        // change to some DTE stacks on the far end of a virtual pair.
        if let Err(e) = serial_stream.write_data_terminal_ready(false) {
            tracing::warn!(port = %port, error = %e, "failed to de-assert DTR");
        }
        if let Err(e) = serial_stream.write_request_to_send(false) {
            tracing::warn!(port = %port, error = %e, "failed to de-assert RTS");
        }

        tracing::info!(port = %port, baud_rate, "serial port opened");

        Ok(Self {
            port: Some(serial_stream),
            port_name: port.to_string(),
        })
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(port = %self.port_name, bytes = data.len(), data = ?data, "sending data");

        port.write_all(data).await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "failed to send data");
            if e.kind() == std::io::ErrorKind::BrokenPipe
                || e.kind() == std::io::ErrorKind::NotConnected
            {
                Error::NotConnected
            } else {
                Error::Io(e)
            }
        })?;

        // Flush so the DTE sees each response line promptly.
        port.flush().await.map_err(Error::Io)?;

        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(timeout, port.read(buf)).await {
            Ok(Ok(n)) => {
                tracing::trace!(port = %self.port_name, bytes = n, "received data");
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(port = %self.port_name, error = %e, "failed to receive data");
                if e.kind() == std::io::ErrorKind::BrokenPipe
                    || e.kind() == std::io::ErrorKind::NotConnected
                {
                    Err(Error::NotConnected)
                } else {
                    Err(Error::Io(e))
                }
            }
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            tracing::debug!(port = %self.port_name, "closing serial port");

            if let Err(e) = port.flush().await {
                tracing::warn!(port = %self.port_name, error = %e, "failed to flush before closing");
            }

            tracing::info!(port = %self.port_name, "serial port closed");
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.port.is_some() {
            tracing::debug!(port = %self.port_name, "SerialTransport dropped, closing port");
        }
    }
}
