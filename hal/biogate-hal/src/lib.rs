//! Biogate Hardware Abstraction Layer
//!
//! This crate defines the collaborator interfaces the biometric core is
//! written against. The chip-specific wrappers (DMA serial, bxCAN, EXTI
//! pins) live in the firmware binary and implement these traits; host tests
//! implement them with recording doubles.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  biogate-drivers (finger, face engines) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  biogate-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ firmware      │       │ test doubles  │
//! │ (embassy)     │       │ (host)        │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`serial::SerialTx`] - Sensor module serial links
//! - [`bus::BusTx`] - Field bus transmit
//! - [`gpio::InputPin`] - Digital inputs (finger touch, human presence)

#![no_std]
#![deny(unsafe_code)]

pub mod bus;
pub mod gpio;
pub mod serial;

// Re-export key traits at crate root for convenience
pub use bus::{BusFrameId, BusTx};
pub use gpio::{EhInput, InputPin};
pub use serial::{SerialTx, TransferMode};
