//! Bus status channel
//!
//! Inbound: the host writes `(field, value)` pairs into a small snapshot.
//! Enroll requests are edges (consumed on read); day/night, power-save and
//! door-open are levels. While an enrollment runs the channel is locked
//! and updates are discarded.
//!
//! Outbound: identify-success notices, tone/prompt requests and enrollment
//! reports.

use core::cell::RefCell;

use biogate_hal::BusTx;
use biogate_protocol::bus::{self, parse_status_update, StatusReport};
use biogate_protocol::{Request, StatusField, StatusWord};
use critical_section::Mutex;
use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use crate::config::BusConfig;
use crate::registry::{EventSink, PeripheralEvent};

/// Shared status channel over a bus transmitter
pub struct StatusChannel<B> {
    snapshot: [AtomicU8; StatusField::COUNT],
    locked: AtomicBool,
    tx: Mutex<RefCell<B>>,
    config: BusConfig,
}

impl<B: BusTx> StatusChannel<B> {
    pub fn new(tx: B, config: BusConfig) -> Self {
        Self {
            snapshot: Default::default(),
            locked: AtomicBool::new(false),
            tx: Mutex::new(RefCell::new(tx)),
            config,
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Apply a status update payload
    ///
    /// Returns the number of fields written. Nothing is written while locked
    /// or when the payload has odd length.
    pub fn decode(&self, payload: &[u8]) -> usize {
        if self.is_locked() {
            trace!("status update ignored while locked");
            return 0;
        }

        let pairs = match parse_status_update(payload) {
            Ok(pairs) => pairs,
            Err(_) => {
                debug!("status update with odd length {}", payload.len());
                return 0;
            }
        };

        let mut written = 0;
        for (field, value) in pairs {
            self.snapshot[field.slot()].store(value, Ordering::Release);
            written += 1;
        }
        written
    }

    pub fn lock(&self) {
        self.locked.store(true, Ordering::Release);
    }

    pub fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    fn level(&self, field: StatusField) -> bool {
        self.snapshot[field.slot()].load(Ordering::Acquire) != 0
    }

    fn take_edge(&self, field: StatusField) -> bool {
        self.snapshot[field.slot()].swap(0, Ordering::AcqRel) != 0
    }

    /// Read-and-clear
    pub fn take_finger_enroll(&self) -> bool {
        self.take_edge(StatusField::FingerEnroll)
    }

    /// Read-and-clear
    pub fn take_face_enroll(&self) -> bool {
        self.take_edge(StatusField::FaceEnroll)
    }

    pub fn is_day(&self) -> bool {
        self.level(StatusField::Day)
    }

    pub fn power_save(&self) -> bool {
        self.level(StatusField::PowerSave)
    }

    pub fn door_open(&self) -> bool {
        self.level(StatusField::DoorOpen)
    }

    /// Snapshot as a bitfield, edges left unconsumed
    pub fn word(&self) -> StatusWord {
        let mut word = StatusWord::default();
        for index in 1..=StatusField::COUNT as u8 {
            if let Some(field) = StatusField::from_index(index) {
                word.set(field, self.level(field));
            }
        }
        word
    }

    fn transmit(&self, data: &[u8], id: Option<u16>) -> Result<(), B::Error> {
        critical_section::with(|cs| self.tx.borrow_ref_mut(cs).transmit(data, id))
    }

    /// Highest-priority identify success notice
    pub fn send_identify_success(&self) -> Result<(), B::Error> {
        debug!("bus: identify success");
        self.transmit(&[bus::IDENTIFY_SUCCESS], Some(self.config.identify_success_id))
    }

    /// Tone or prompt request on the transmitter's default id
    pub fn send_request(&self, request: Request) -> Result<(), B::Error> {
        trace!("bus: request {}", request.to_byte());
        self.transmit(&[request.to_byte()], None)
    }

    pub fn send_status(&self, report: StatusReport) -> Result<(), B::Error> {
        debug!("bus: report seq {} status {}", report.sequence, report.status);
        self.transmit(&report.to_bytes(), Some(self.config.status_report_id))
    }

    /// Run `f` with the transmitter
    pub fn with_tx<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        critical_section::with(|cs| f(&mut self.tx.borrow_ref_mut(cs)))
    }
}

/// Receive side, bound to the status-update frame id
impl<B: BusTx> EventSink for StatusChannel<B> {
    fn on_event(&self, event: PeripheralEvent<'_>) {
        if let PeripheralEvent::Received(payload) = event {
            self.decode(payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    #[derive(Default)]
    struct RecordingBus {
        sent: Vec<(Vec<u8, 8>, Option<u16>), 8>,
    }

    impl BusTx for RecordingBus {
        type Error = ();

        fn transmit(&mut self, data: &[u8], id: Option<u16>) -> Result<(), ()> {
            let mut bytes: Vec<u8, 8> = Vec::new();
            bytes.extend_from_slice(data).map_err(|_| ())?;
            self.sent.push((bytes, id)).map_err(|_| ())
        }
    }

    fn channel() -> StatusChannel<RecordingBus> {
        StatusChannel::new(RecordingBus::default(), BusConfig::default())
    }

    #[test]
    fn test_day_flag_only() {
        let channel = channel();
        assert_eq!(channel.decode(&[0x02, 0x01]), 1);

        assert!(channel.is_day());
        assert!(!channel.take_finger_enroll());
        assert!(!channel.take_face_enroll());
        assert!(!channel.power_save());
        assert!(!channel.door_open());
    }

    #[test]
    fn test_enroll_flags_are_edges() {
        let channel = channel();
        channel.decode(&[0x01, 0x01, 0x03, 0x01]);

        assert!(channel.take_finger_enroll());
        assert!(!channel.take_finger_enroll());
        assert!(channel.take_face_enroll());
        assert!(!channel.take_face_enroll());
    }

    #[test]
    fn test_locked_ignores_updates() {
        let channel = channel();
        channel.lock();
        assert_eq!(channel.decode(&[0x02, 0x01]), 0);
        assert!(!channel.is_day());

        channel.unlock();
        channel.decode(&[0x05, 0x01]);
        assert!(channel.door_open());
    }

    #[test]
    fn test_odd_length_ignored() {
        let channel = channel();
        assert_eq!(channel.decode(&[0x02, 0x01, 0x04]), 0);
        assert!(!channel.is_day());
    }

    #[test]
    fn test_levels_overwrite() {
        let channel = channel();
        channel.decode(&[0x02, 0x01, 0x04, 0x01]);
        channel.decode(&[0x02, 0x00]);
        assert!(!channel.is_day());
        assert!(channel.power_save());
        assert_eq!(channel.word(), StatusWord(0b0000_1000));
    }

    #[test]
    fn test_event_sink_decodes() {
        let channel = channel();
        channel.on_event(PeripheralEvent::Received(&[0x04, 0x01]));
        channel.on_event(PeripheralEvent::Level(true));
        assert!(channel.power_save());
    }

    #[test]
    fn test_outbound_ids() {
        let channel = channel();
        channel.send_identify_success().unwrap();
        channel.send_request(Request::WrongTone).unwrap();
        channel
            .send_status(StatusReport {
                sequence: 3,
                status: 0x10,
            })
            .unwrap();

        channel.with_tx(|bus| {
            assert_eq!(&bus.sent[0].0[..], &[0x01]);
            assert_eq!(bus.sent[0].1, Some(0x100));
            assert_eq!(&bus.sent[1].0[..], &[0x04]);
            assert_eq!(bus.sent[1].1, None);
            assert_eq!(&bus.sent[2].0[..], &[3, 0x10]);
            assert_eq!(bus.sent[2].1, Some(0x103));
        });
    }
}
