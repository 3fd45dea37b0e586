//! Services shared by both engines

use biogate_core::{Daemon, NoticeBoard, SharedSignals, StatusChannel};
use biogate_hal::BusTx;
use biogate_protocol::Request;

use crate::error::EngineError;

/// Borrowed handles to the composition root's shared services
pub struct Shared<'a, B> {
    pub daemon: &'a Daemon,
    pub status: &'a StatusChannel<B>,
    pub signals: &'a SharedSignals,
    pub notices: &'a NoticeBoard,
}

impl<B> Clone for Shared<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for Shared<'_, B> {}

impl<'a, B: BusTx> Shared<'a, B> {
    /// Ask the host for a tone or prompt
    pub fn request(&self, request: Request) -> Result<(), EngineError> {
        self.status.send_request(request).map_err(|_| {
            warn!("bus request {} failed", request.to_byte());
            EngineError::Transport
        })
    }
}
