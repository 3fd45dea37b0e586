//! Property-based tests for the fingerprint and face codecs.
//!
//! Frames are built with the crate's own encoders, then checked for
//! validation round-trips and for rejection after single-byte corruption.

use biogate_protocol::face::{self, CommandFrame as FaceFrame};
use biogate_protocol::finger::{self, CommandFrame as FingerFrame, FingerReply, PID_ACK};
use biogate_protocol::{FaceReply, FrameError};
use proptest::prelude::*;

/// Build a fingerprint acknowledge frame by re-tagging an encoded command
fn finger_ack(status: u8, data: &[u8]) -> Vec<u8> {
    let frame = FingerFrame::new(finger::DEFAULT_ADDRESS, status, data).unwrap();
    let mut bytes = frame.encode_to_vec().unwrap().to_vec();
    bytes[6] = PID_ACK;
    let body_end = bytes.len() - 2;
    let sum = finger::checksum(&bytes[6..body_end]);
    bytes[body_end..].copy_from_slice(&sum.to_be_bytes());
    bytes
}

/// Face replies share the command layout, class byte in the msg id slot
fn face_reply(class: u8, body: &[u8]) -> Vec<u8> {
    FaceFrame::new(class, body)
        .unwrap()
        .encode_to_vec()
        .unwrap()
        .to_vec()
}

fn payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=finger::MAX_PAYLOAD_SIZE)
}

proptest! {
    /// Encoded fingerprint commands always validate
    #[test]
    fn prop_finger_command_validates(code in any::<u8>(), data in payload()) {
        let frame = FingerFrame::new(finger::DEFAULT_ADDRESS, code, &data).unwrap();
        let bytes = frame.encode_to_vec().unwrap();

        let (pid, body) = finger::validate(&bytes, finger::DEFAULT_ADDRESS).unwrap();
        prop_assert_eq!(pid, finger::PID_COMMAND);
        prop_assert_eq!(body[0], code);
        prop_assert_eq!(&body[1..], &data[..]);
    }

    /// Acknowledge frames parse back to their status and data
    #[test]
    fn prop_finger_ack_parses(status in any::<u8>(), data in payload()) {
        let bytes = finger_ack(status, &data);
        let reply = FingerReply::parse(&bytes, finger::DEFAULT_ADDRESS).unwrap();

        prop_assert_eq!(reply.status, status);
        prop_assert_eq!(&reply.data[..], &data[..]);
    }

    /// Corrupting the packet id or anything after the length field is caught
    #[test]
    fn prop_finger_flip_rejected(
        status in any::<u8>(),
        data in payload(),
        index in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let mut bytes = finger_ack(status, &data);
        let covered: Vec<usize> = core::iter::once(6).chain(9..bytes.len()).collect();
        let at = covered[index.index(covered.len())];
        bytes[at] ^= flip;

        prop_assert!(FingerReply::parse(&bytes, finger::DEFAULT_ADDRESS).is_err());
    }

    /// A different address is never accepted
    #[test]
    fn prop_finger_wrong_address(address in any::<u32>().prop_filter("not default", |a| *a != finger::DEFAULT_ADDRESS)) {
        let bytes = finger_ack(0x00, &[]);
        prop_assert_eq!(
            FingerReply::parse(&bytes, address),
            Err(FrameError::BadAddress)
        );
    }

    /// Encoded face commands always pass the parity check
    #[test]
    fn prop_face_command_validates(msg_id in any::<u8>(), data in payload()) {
        let bytes = FaceFrame::new(msg_id, &data).unwrap().encode_to_vec().unwrap();

        let (id, body) = face::check_frame(&bytes).unwrap();
        prop_assert_eq!(id, msg_id);
        prop_assert_eq!(body, &data[..]);
    }

    /// Corrupting any parity-covered byte except the length is caught
    #[test]
    fn prop_face_flip_rejected(
        class in 0u8..=2,
        body in prop::collection::vec(any::<u8>(), 1..64),
        index in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let mut bytes = face_reply(class, &body);
        let covered: Vec<usize> = core::iter::once(2).chain(5..bytes.len()).collect();
        let at = covered[index.index(covered.len())];
        bytes[at] ^= flip;

        prop_assert_eq!(FaceReply::parse(&bytes), Err(FrameError::ParityMismatch));
    }

    /// Wrong start markers are rejected by both codecs
    #[test]
    fn prop_wrong_start_marker(marker in any::<u16>(), data in payload()) {
        let mut finger_bytes = finger_ack(0x00, &data);
        if marker != finger::START_MARKER {
            finger_bytes[0..2].copy_from_slice(&marker.to_be_bytes());
            prop_assert_eq!(
                FingerReply::parse(&finger_bytes, finger::DEFAULT_ADDRESS),
                Err(FrameError::BadStartMarker)
            );
        }

        let mut face_bytes = face_reply(0, &[face::cmd::VERIFY, 0x00]);
        if marker != face::START_MARKER {
            face_bytes[0..2].copy_from_slice(&marker.to_be_bytes());
            prop_assert_eq!(FaceReply::parse(&face_bytes), Err(FrameError::BadStartMarker));
        }
    }
}
