//! Sensor module UART tasks
//!
//! Reception uses DMA with idle-line detection: one idle gap ends one
//! module frame, which is dispatched whole.

use biogate_core::{PeripheralEvent, PeripheralId};
use biogate_protocol::{face, finger};
use defmt::*;
use embassy_stm32::mode::Async;
use embassy_stm32::usart::{UartRx, UartTx};

use crate::channels::{SerialQueue, FACE_TX, FINGER_TX};
use crate::shared::{FACE_UART, FINGER_UART, REGISTRY};

#[embassy_executor::task]
pub async fn finger_rx_task(rx: UartRx<'static, Async>) {
    receive::<{ finger::MAX_FRAME_SIZE }>(rx, FINGER_UART).await
}

#[embassy_executor::task]
pub async fn face_rx_task(rx: UartRx<'static, Async>) {
    receive::<{ face::MAX_FRAME_SIZE }>(rx, FACE_UART).await
}

#[embassy_executor::task]
pub async fn finger_tx_task(tx: UartTx<'static, Async>) {
    transmit(tx, &FINGER_TX, FINGER_UART).await
}

#[embassy_executor::task]
pub async fn face_tx_task(tx: UartTx<'static, Async>) {
    transmit(tx, &FACE_TX, FACE_UART).await
}

async fn receive<const N: usize>(mut rx: UartRx<'static, Async>, id: PeripheralId) -> ! {
    info!("UART {} RX task started", id.controller);

    let mut buf = [0u8; N];

    loop {
        match rx.read_until_idle(&mut buf).await {
            Ok(0) => {}
            Ok(n) => {
                trace!("UART {} RX: {} bytes", id.controller, n);
                if !REGISTRY.dispatch(id, PeripheralEvent::Received(&buf[..n])) {
                    warn!("UART {}: no receiver registered", id.controller);
                }
            }
            Err(e) => {
                warn!("UART {} read error: {:?}", id.controller, e);
            }
        }
    }
}

async fn transmit<const N: usize>(
    mut tx: UartTx<'static, Async>,
    queue: &'static SerialQueue<heapless::Vec<u8, N>>,
    id: PeripheralId,
) -> ! {
    info!("UART {} TX task started", id.controller);

    loop {
        let frame = queue.receive().await;
        if let Err(e) = tx.write(&frame).await {
            warn!("UART {} write error: {:?}", id.controller, e);
        }
    }
}
