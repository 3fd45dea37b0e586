//! Biogate wire protocols
//!
//! This crate defines the three binary formats the controller speaks:
//!
//! - [`finger`]: the fingerprint module's `EF01` command/acknowledge frames
//!   with a 16-bit additive checksum
//! - [`face`]: the face module's `EFAA` command/reply frames with an XOR
//!   parity byte
//! - [`bus`]: the compact status messages exchanged with the host over CAN
//!
//! # Fingerprint frame
//!
//! ```text
//! ┌───────┬─────────┬─────┬────────┬──────────┬─────────┬──────────┐
//! │ EF 01 │ ADDRESS │ PID │ LENGTH │ CMD/STAT │ PAYLOAD │ CHECKSUM │
//! │ 2B    │ 4B      │ 1B  │ 2B     │ 1B       │ 0–128B  │ 2B       │
//! └───────┴─────────┴─────┴────────┴──────────┴─────────┴──────────┘
//! ```
//!
//! # Face frame
//!
//! ```text
//! ┌───────┬────────┬────────┬─────────┬────────┐
//! │ EF AA │ MSG ID │ LENGTH │ PAYLOAD │ PARITY │
//! │ 2B    │ 1B     │ 2B     │ 0–128B  │ 1B     │
//! └───────┴────────┴────────┴─────────┴────────┘
//! ```
//!
//! All multi-byte fields are big-endian. Nothing in this crate keeps state;
//! the engines in `biogate-drivers` own buffers and workflow tracking.

#![no_std]
#![deny(unsafe_code)]

pub mod bus;
pub mod face;
pub mod finger;
pub mod frame;

pub use bus::{BusError, Request, StatusField, StatusReport, StatusWord};
pub use face::{FaceCommand, FaceDirection, FaceReply, MessageClass};
pub use finger::{FingerCommand, FingerReply, FingerStatus};
pub use frame::FrameError;
