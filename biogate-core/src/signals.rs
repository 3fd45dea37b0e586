//! Cross-component signals
//!
//! Both engines may raise identify success; the supervisor consumes it. The
//! face module's presence output is written from its edge interrupt and read
//! by the face engine and the supervisor's light selection.

use portable_atomic::{AtomicBool, AtomicU8, Ordering};

/// Flags shared by the engines and the supervisor
pub struct SharedSignals {
    identify_success: AtomicBool,
    human_present: AtomicBool,
}

impl Default for SharedSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedSignals {
    pub const fn new() -> Self {
        Self {
            identify_success: AtomicBool::new(false),
            human_present: AtomicBool::new(false),
        }
    }

    pub fn raise_identify_success(&self) {
        self.identify_success.store(true, Ordering::Release);
    }

    /// Read-and-clear
    pub fn take_identify_success(&self) -> bool {
        self.identify_success.swap(false, Ordering::AcqRel)
    }

    pub fn set_human_present(&self, present: bool) {
        self.human_present.store(present, Ordering::Release);
    }

    pub fn human_present(&self) -> bool {
        self.human_present.load(Ordering::Acquire)
    }
}

/// Transient states of the fingerprint ring LED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LedNotice {
    /// One red blink
    Wrong = 1,
    /// One green blink
    Success = 2,
    /// Breathing in the current light mode colour
    Waiting = 3,
}

impl LedNotice {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(LedNotice::Wrong),
            2 => Some(LedNotice::Success),
            3 => Some(LedNotice::Waiting),
            _ => None,
        }
    }
}

/// LED notices posted for the fingerprint engine by other components
///
/// Holds the latest notice only.
pub struct NoticeBoard(AtomicU8);

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl NoticeBoard {
    const EMPTY: u8 = 0;

    pub const fn new() -> Self {
        Self(AtomicU8::new(Self::EMPTY))
    }

    pub fn post(&self, notice: LedNotice) {
        self.0.store(notice as u8, Ordering::Release);
    }

    pub fn take(&self) -> Option<LedNotice> {
        LedNotice::from_raw(self.0.swap(Self::EMPTY, Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_success_read_and_clear() {
        let signals = SharedSignals::new();
        assert!(!signals.take_identify_success());
        signals.raise_identify_success();
        assert!(signals.take_identify_success());
        assert!(!signals.take_identify_success());
    }

    #[test]
    fn test_presence_is_level() {
        let signals = SharedSignals::new();
        signals.set_human_present(true);
        assert!(signals.human_present());
        assert!(signals.human_present());
        signals.set_human_present(false);
        assert!(!signals.human_present());
    }

    #[test]
    fn test_notice_board_keeps_latest() {
        let board = NoticeBoard::new();
        assert_eq!(board.take(), None);
        board.post(LedNotice::Success);
        board.post(LedNotice::Wrong);
        assert_eq!(board.take(), Some(LedNotice::Wrong));
        assert_eq!(board.take(), None);
    }
}
