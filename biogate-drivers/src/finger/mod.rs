//! Fingerprint module
//!
//! The module sits on a UART and raises a touch interrupt line when a
//! finger lands on the sensor. [`FingerLink`] is the interrupt-side half:
//! it is registered in the event registry for both the UART and the touch
//! pin. [`FingerEngine`] is the main-context half.

mod engine;
mod led;

pub use engine::FingerEngine;
pub use led::{LedMachine, LedStep, LightMode};

use biogate_core::{EdgeFlag, EventSink, PeripheralEvent, RxMailbox};
use biogate_protocol::finger::MAX_FRAME_SIZE;

/// Interrupt-side state of the fingerprint module
pub struct FingerLink {
    rx: RxMailbox<MAX_FRAME_SIZE>,
    touch: EdgeFlag,
}

impl Default for FingerLink {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerLink {
    pub const fn new() -> Self {
        Self {
            rx: RxMailbox::new(),
            touch: EdgeFlag::new(),
        }
    }
}

impl EventSink for FingerLink {
    fn on_event(&self, event: PeripheralEvent<'_>) {
        match event {
            PeripheralEvent::Received(bytes) => {
                if !self.rx.post(bytes) {
                    warn!("finger: rx frame truncated ({} bytes)", bytes.len());
                }
            }
            // The touch line interrupts on the edge that matters
            PeripheralEvent::Level(_) => self.touch.raise(),
        }
    }
}
