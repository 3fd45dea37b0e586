//! Board-agnostic plumbing for the biometric controller
//!
//! Everything here is shared between the interrupt side and the main
//! polling context, so every public type takes `&self` and synchronizes with
//! atomics or `critical-section` mutexes:
//!
//! - Event registry (interrupt → owning component)
//! - Soft-timer scheduler ("daemon")
//! - Bus status channel
//! - Cross-component signals and receive mailboxes
//! - Workflow state tracking
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to the other modules
#[macro_use]
mod fmt;

pub mod config;
pub mod daemon;
pub mod mailbox;
pub mod registry;
pub mod signals;
pub mod status;
pub mod workflow;

pub use daemon::{reached, Daemon, DaemonError, TaskId};
pub use mailbox::{EdgeFlag, RxMailbox};
pub use registry::{EventSink, PeripheralEvent, PeripheralId, Registry, RegistryError};
pub use signals::{LedNotice, NoticeBoard, SharedSignals};
pub use status::StatusChannel;
pub use workflow::{Workflow, WorkflowState};
