//! Sensor module engines
//!
//! This crate drives the two biometric modules on top of the shared
//! services in `biogate-core`:
//!
//! - [`finger`]: fingerprint module (identify, multi-capture auto-enroll,
//!   ring LED notices)
//! - [`face`]: face module (verify, five-direction interactive enroll)
//! - [`supervisor`]: the main-loop body tying both to the host bus
//!
//! Engines never block. Interrupt handlers feed each engine's link through
//! the event registry; the main context calls `poll`.

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod context;
pub mod error;
pub mod face;
pub mod finger;
pub mod supervisor;

pub use context::Shared;
pub use error::EngineError;
pub use face::{FaceEngine, FaceLink};
pub use finger::{FingerEngine, FingerLink, LightMode};
pub use supervisor::{Supervisor, SupervisorEvent};
