//! Serial link abstractions
//!
//! The sensor modules are driven over UART. Reception is handled by the
//! peripheral layer (idle-line DMA) and delivered through the event
//! registry, so only the transmit side is a trait here.

/// How a buffer is handed to the UART peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferMode {
    /// Busy-wait until every byte is shifted out
    Polling,
    /// Byte-by-byte from the TX interrupt
    Interrupt,
    /// Whole buffer through a DMA channel
    #[default]
    Dma,
}

/// Serial transmitter
///
/// Implementations must copy `data` before returning; callers reuse their
/// frame buffers immediately.
pub trait SerialTx {
    /// Error type for transmit operations
    type Error;

    /// Send a complete frame
    fn send(&mut self, data: &[u8], mode: TransferMode) -> Result<(), Self::Error>;
}

impl<T: SerialTx + ?Sized> SerialTx for &mut T {
    type Error = T::Error;

    fn send(&mut self, data: &[u8], mode: TransferMode) -> Result<(), Self::Error> {
        (**self).send(data, mode)
    }
}
