//! Field bus abstractions
//!
//! The host is reached over a CAN bus using standard (11-bit) identifiers.
//! Each transmitter has a default identifier; single messages may override
//! it (the identify-success notice uses a higher priority id).

/// Standard 11-bit bus identifier
pub type BusFrameId = u16;

/// Largest classic CAN payload
pub const MAX_BUS_PAYLOAD: usize = 8;

/// Field bus transmitter
pub trait BusTx {
    /// Error type for transmit operations
    type Error;

    /// Queue `data` for transmission
    ///
    /// `id` overrides the transmitter's default identifier when set.
    fn transmit(&mut self, data: &[u8], id: Option<BusFrameId>) -> Result<(), Self::Error>;
}
