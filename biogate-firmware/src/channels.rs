//! Inter-task communication channels
//!
//! The engines call the synchronous `SerialTx`/`BusTx` traits; the adapters
//! in [`crate::io`] queue frames here and the transmit tasks drain them.

use biogate_hal::MAX_BUS_PAYLOAD;
use biogate_protocol::{face, finger};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::Vec;

/// Frames waiting for each serial link
const SERIAL_QUEUE_DEPTH: usize = 4;

/// Bus frames waiting for a mailbox
const BUS_QUEUE_DEPTH: usize = 8;

pub type FingerFrame = Vec<u8, { finger::MAX_FRAME_SIZE }>;
pub type FaceFrame = Vec<u8, { face::MAX_FRAME_SIZE }>;

pub type SerialQueue<T> = Channel<CriticalSectionRawMutex, T, SERIAL_QUEUE_DEPTH>;

/// Outbound standard-id bus frame
pub struct BusFrame {
    pub id: u16,
    pub data: Vec<u8, MAX_BUS_PAYLOAD>,
}

/// Command frames for the fingerprint module
pub static FINGER_TX: SerialQueue<FingerFrame> = Channel::new();

/// Command frames for the face module
pub static FACE_TX: SerialQueue<FaceFrame> = Channel::new();

/// Frames for the host bus
pub static BUS_TX: Channel<CriticalSectionRawMutex, BusFrame, BUS_QUEUE_DEPTH> = Channel::new();

/// Daemon serviced; carries the tick timestamp in ms
pub static TICK_SIGNAL: Signal<CriticalSectionRawMutex, u32> = Signal::new();
