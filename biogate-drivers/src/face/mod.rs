//! Face recognition module
//!
//! The module sits on a UART and drives a human-presence output.
//! [`FaceLink`] is the interrupt-side half, registered for both; the
//! presence level is published to the shared signals as it is sampled.

mod engine;
mod enroll;

pub use engine::FaceEngine;
pub use enroll::{CaptureStatus, EnrollAction, EnrollSequence};

use biogate_core::{EdgeFlag, EventSink, PeripheralEvent, RxMailbox, SharedSignals};
use biogate_protocol::face::MAX_FRAME_SIZE;

/// Interrupt-side state of the face module
pub struct FaceLink<'a> {
    rx: RxMailbox<MAX_FRAME_SIZE>,
    identify: EdgeFlag,
    signals: &'a SharedSignals,
}

impl<'a> FaceLink<'a> {
    pub const fn new(signals: &'a SharedSignals) -> Self {
        Self {
            rx: RxMailbox::new(),
            identify: EdgeFlag::new(),
            signals,
        }
    }
}

impl EventSink for FaceLink<'_> {
    fn on_event(&self, event: PeripheralEvent<'_>) {
        match event {
            PeripheralEvent::Received(bytes) => {
                if !self.rx.post(bytes) {
                    warn!("face: rx frame truncated ({} bytes)", bytes.len());
                }
            }
            PeripheralEvent::Level(present) => {
                self.signals.set_human_present(present);
                if present {
                    self.identify.raise();
                }
            }
        }
    }
}
