//! Host bus (bxCAN) tasks

use biogate_core::{PeripheralEvent, PeripheralId};
use defmt::*;
use embassy_stm32::can::{CanRx, CanTx, Frame, Id};

use crate::channels::BUS_TX;
use crate::shared::{CAN_BUS, REGISTRY};

/// Receive standard frames and dispatch them by id
#[embassy_executor::task]
pub async fn bus_rx_task(mut rx: CanRx<'static>) {
    info!("Bus RX task started");

    loop {
        match rx.read().await {
            Ok(envelope) => {
                let Id::Standard(id) = envelope.frame.id() else {
                    continue;
                };
                let peripheral = PeripheralId::new(CAN_BUS, id.as_raw() as u32);
                if !REGISTRY.dispatch(peripheral, PeripheralEvent::Received(envelope.frame.data())) {
                    trace!("Bus frame 0x{:03x} ignored", id.as_raw());
                }
            }
            Err(e) => {
                warn!("Bus error: {:?}", e);
            }
        }
    }
}

/// Drain the outbound queue into the transmit mailboxes
#[embassy_executor::task]
pub async fn bus_tx_task(mut tx: CanTx<'static>) {
    info!("Bus TX task started");

    loop {
        let queued = BUS_TX.receive().await;
        match Frame::new_standard(queued.id, &queued.data) {
            Ok(frame) => {
                tx.write(&frame).await;
            }
            Err(_) => {
                warn!("Bus frame 0x{:03x} rejected", queued.id);
            }
        }
    }
}
