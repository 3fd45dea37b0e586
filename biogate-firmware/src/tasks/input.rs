//! Module output lines
//!
//! The level is sampled right after the edge and dispatched with it.

use biogate_core::{PeripheralEvent, PeripheralId};
use biogate_hal::{EhInput, InputPin};
use defmt::*;
use embassy_stm32::exti::ExtiInput;

use crate::shared::{PRESENCE_PIN, REGISTRY, TOUCH_PIN};

/// Face module presence output, both edges
#[embassy_executor::task]
pub async fn presence_task(pin: ExtiInput<'static>) {
    info!("Presence task started");

    let mut pin = EhInput::new(pin);
    dispatch_level(PRESENCE_PIN, &pin);

    loop {
        pin.inner_mut().wait_for_any_edge().await;
        dispatch_level(PRESENCE_PIN, &pin);
    }
}

/// Fingerprint module touch output, rising edge only
#[embassy_executor::task]
pub async fn touch_task(pin: ExtiInput<'static>) {
    info!("Touch task started");

    let mut pin = EhInput::new(pin);

    loop {
        pin.inner_mut().wait_for_rising_edge().await;
        dispatch_level(TOUCH_PIN, &pin);
    }
}

fn dispatch_level(id: PeripheralId, pin: &impl InputPin) {
    let level = pin.is_high();
    debug!("Pin {} level {}", id.address, level);
    REGISTRY.dispatch(id, PeripheralEvent::Level(level));
}
