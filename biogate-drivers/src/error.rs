//! Engine error type

use biogate_core::DaemonError;
use biogate_protocol::FrameError;

/// Errors returned by the engines
///
/// Protocol-level failures never panic; they end the current workflow and
/// surface here for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineError {
    /// A workflow is already in flight
    Busy,
    /// Received frame failed validation, or an outbound frame did not fit
    Frame(FrameError),
    /// Serial or bus transmit failed
    Transport,
    /// No scheduler slot left for the engine's timers
    Daemon(DaemonError),
}

impl From<FrameError> for EngineError {
    fn from(err: FrameError) -> Self {
        EngineError::Frame(err)
    }
}

impl From<DaemonError> for EngineError {
    fn from(err: DaemonError) -> Self {
        EngineError::Daemon(err)
    }
}
