//! Collaborator trait implementations
//!
//! Transmit calls only copy the frame into a channel; they never wait.

use biogate_hal::{BusFrameId, BusTx, SerialTx, TransferMode};
use heapless::Vec;

use crate::channels::{BusFrame, SerialQueue, BUS_TX};

/// Queue full or frame larger than the queue's slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum QueueError {
    Full,
    TooLong,
}

/// Serial transmitter backed by a frame channel
pub struct QueuedSerial<const N: usize> {
    queue: &'static SerialQueue<Vec<u8, N>>,
}

impl<const N: usize> QueuedSerial<N> {
    pub const fn new(queue: &'static SerialQueue<Vec<u8, N>>) -> Self {
        Self { queue }
    }
}

impl<const N: usize> SerialTx for QueuedSerial<N> {
    type Error = QueueError;

    fn send(&mut self, data: &[u8], mode: TransferMode) -> Result<(), QueueError> {
        // The tx task always drains through DMA
        if mode != TransferMode::Dma {
            defmt::trace!("serial: {} requested, using DMA", mode);
        }
        let frame = Vec::from_slice(data).map_err(|_| QueueError::TooLong)?;
        self.queue.try_send(frame).map_err(|_| QueueError::Full)
    }
}

/// Bus transmitter backed by [`BUS_TX`]
pub struct QueuedBus {
    default_id: BusFrameId,
}

impl QueuedBus {
    pub const fn new(default_id: BusFrameId) -> Self {
        Self { default_id }
    }
}

impl BusTx for QueuedBus {
    type Error = QueueError;

    fn transmit(&mut self, data: &[u8], id: Option<BusFrameId>) -> Result<(), QueueError> {
        let frame = BusFrame {
            id: id.unwrap_or(self.default_id),
            data: Vec::from_slice(data).map_err(|_| QueueError::TooLong)?,
        };
        BUS_TX.try_send(frame).map_err(|_| QueueError::Full)
    }
}
