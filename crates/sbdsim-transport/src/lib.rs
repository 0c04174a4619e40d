//! sbdsim-transport: Serial transport for the sbdsim emulator.
//!
//! Provides [`SerialTransport`], the concrete [`Transport`](sbdsim_core::Transport)
//! over a serial device. In the typical setup the emulator sits on one end
//! of a virtual serial pair (e.g. created with `socat`) and the DTE
//! application opens the other end exactly as it would a physical
//! RockBLOCK.

pub mod serial;

pub use serial::SerialTransport;
