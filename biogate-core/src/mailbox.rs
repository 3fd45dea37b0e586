//! Interrupt-to-main handoff primitives
//!
//! Interrupt handlers post, the main poll takes. Taking clears.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Vec;
use portable_atomic::{AtomicBool, Ordering};

/// Single-slot receive buffer
///
/// A newer frame overwrites an unconsumed older one, like a DMA buffer
/// re-armed before the previous contents were decoded.
pub struct RxMailbox<const N: usize> {
    slot: Mutex<RefCell<Vec<u8, N>>>,
    pending: AtomicBool,
}

impl<const N: usize> Default for RxMailbox<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RxMailbox<N> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(RefCell::new(Vec::new())),
            pending: AtomicBool::new(false),
        }
    }

    /// Store a received frame; bytes beyond `N` are dropped
    ///
    /// Returns false if the frame was truncated.
    pub fn post(&self, bytes: &[u8]) -> bool {
        let len = bytes.len().min(N);
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            slot.clear();
            // len <= N
            let _ = slot.extend_from_slice(&bytes[..len]);
            self.pending.store(true, Ordering::Release);
        });
        len == bytes.len()
    }

    /// Take the pending frame, if any
    pub fn take(&self) -> Option<Vec<u8, N>> {
        if !self.is_pending() {
            return None;
        }
        critical_section::with(|cs| {
            if !self.pending.swap(false, Ordering::AcqRel) {
                return None;
            }
            Some(core::mem::take(&mut *self.slot.borrow_ref_mut(cs)))
        })
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// Read-and-clear flag
pub struct EdgeFlag(AtomicBool);

impl Default for EdgeFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns whether the flag was raised, clearing it
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn peek(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_then_take() {
        let mailbox: RxMailbox<8> = RxMailbox::new();
        assert!(mailbox.take().is_none());

        assert!(mailbox.post(&[1, 2, 3]));
        assert!(mailbox.is_pending());
        assert_eq!(&mailbox.take().unwrap()[..], &[1, 2, 3]);
        assert!(mailbox.take().is_none());
    }

    #[test]
    fn test_newer_frame_wins() {
        let mailbox: RxMailbox<8> = RxMailbox::new();
        mailbox.post(&[1, 2, 3]);
        mailbox.post(&[4]);
        assert_eq!(&mailbox.take().unwrap()[..], &[4]);
    }

    #[test]
    fn test_oversized_frame_truncated() {
        let mailbox: RxMailbox<2> = RxMailbox::new();
        assert!(!mailbox.post(&[1, 2, 3]));
        assert_eq!(&mailbox.take().unwrap()[..], &[1, 2]);
    }

    #[test]
    fn test_edge_flag() {
        let flag = EdgeFlag::new();
        assert!(!flag.take());
        flag.raise();
        flag.raise();
        assert!(flag.peek());
        assert!(flag.take());
        assert!(!flag.take());
    }
}
