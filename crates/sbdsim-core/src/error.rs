//! Error types for sbdsim.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, protocol-layer, and
//! signer-initialization errors are all captured here.

/// The error type for all sbdsim operations.
///
/// Per the emulator's propagation policy, only construction-time failures
/// (opening the serial pair, loading or generating the signer key) surface
/// through this type to the caller. Protocol-level problems on a running
/// emulator are answered in-band on the serial link (`ERROR`, SBDWB result
/// codes) and reported as log events, never as an `Err`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port open/read/write).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (malformed frame, unexpected binary data).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The signer key could not be loaded, decrypted, or generated.
    #[error("signer error: {0}")]
    Signer(String),

    /// An invalid option was passed to the emulator builder.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the DTE has been established.
    #[error("not connected")]
    NotConnected,

    /// Timed out waiting for data on the transport.
    #[error("timeout waiting for data")]
    Timeout,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
