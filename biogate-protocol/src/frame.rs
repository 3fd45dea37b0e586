//! Errors shared by the fingerprint and face codecs

/// Errors that can occur during frame encoding or validation
///
/// Framing errors and integrity errors are handled identically by the
/// engines (the frame is dropped), but are kept apart for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Fewer bytes than the header or the declared length requires
    TooShort,
    /// Start marker is not the module's sync word
    BadStartMarker,
    /// Reply came from a different device address
    BadAddress,
    /// Packet identifier is not the expected acknowledge id
    BadPacketId,
    /// Face message class is not reply/note/image
    UnknownClass,
    /// Additive checksum mismatch
    ChecksumMismatch,
    /// XOR parity mismatch
    ParityMismatch,
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
}

impl FrameError {
    /// True for checksum/parity failures, false for framing failures
    pub fn is_integrity(&self) -> bool {
        matches!(self, FrameError::ChecksumMismatch | FrameError::ParityMismatch)
    }
}
