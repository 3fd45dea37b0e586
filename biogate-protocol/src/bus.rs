//! Host status bus messages
//!
//! Every message fits a single classic CAN frame:
//!
//! | Id    | Direction | Payload |
//! |-------|-----------|---------|
//! | 0x100 | tx        | `0x01` identify success (highest priority) |
//! | 0x101 | rx        | `(field index, value)` pairs |
//! | 0x102 | tx        | one [`Request`] byte |
//! | 0x103 | tx        | [`StatusReport`] `{sequence, status}` |

/// Identify-success notice
pub const ID_IDENTIFY_SUCCESS: u16 = 0x100;

/// Host status updates
pub const ID_STATUS_UPDATE: u16 = 0x101;

/// Tone and prompt requests
pub const ID_REQUEST: u16 = 0x102;

/// Enrollment outcome reports
pub const ID_STATUS_REPORT: u16 = 0x103;

/// Payload of the identify-success notice
pub const IDENTIFY_SUCCESS: u8 = 0x01;

/// Status byte of a [`StatusReport`]: source in the high nibble, outcome in the low
pub mod report {
    pub const SOURCE_FINGER: u8 = 0x10;
    pub const SOURCE_FACE: u8 = 0x20;

    pub const OUTCOME_SUCCESS: u8 = 0x00;
    pub const OUTCOME_ABORTED: u8 = 0x01;
    pub const OUTCOME_TIMED_OUT: u8 = 0x02;
}

/// Bus message errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Status update payload does not split into pairs
    OddLength,
    /// Report payload has the wrong size
    BadLength,
}

/// Tone/prompt requests played by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Request {
    ShortPrompt = 0x01,
    LongPrompt = 0x02,
    EnrollPrompt = 0x03,
    WrongTone = 0x04,
    SuccessTone = 0x05,
    Test = 0xFF,
}

impl Request {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Request::ShortPrompt),
            0x02 => Some(Request::LongPrompt),
            0x03 => Some(Request::EnrollPrompt),
            0x04 => Some(Request::WrongTone),
            0x05 => Some(Request::SuccessTone),
            0xFF => Some(Request::Test),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Fields of the host status snapshot, addressed by 1-based index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StatusField {
    FingerEnroll = 1,
    Day = 2,
    FaceEnroll = 3,
    PowerSave = 4,
    DoorOpen = 5,
}

impl StatusField {
    /// Number of fields in the snapshot
    pub const COUNT: usize = 5;

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(StatusField::FingerEnroll),
            2 => Some(StatusField::Day),
            3 => Some(StatusField::FaceEnroll),
            4 => Some(StatusField::PowerSave),
            5 => Some(StatusField::DoorOpen),
            _ => None,
        }
    }

    /// Zero-based slot in a snapshot array
    pub fn slot(self) -> usize {
        self as usize - 1
    }

    /// Edge fields are consumed when read; the rest are levels
    pub fn is_edge(self) -> bool {
        matches!(self, StatusField::FingerEnroll | StatusField::FaceEnroll)
    }

    fn bit(self) -> u8 {
        1 << self.slot()
    }
}

/// Iterator over the known `(field, value)` pairs of a status update
#[derive(Debug, Clone)]
pub struct StatusPairs<'a> {
    chunks: core::slice::ChunksExact<'a, u8>,
}

impl Iterator for StatusPairs<'_> {
    type Item = (StatusField, u8);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let pair = self.chunks.next()?;
            if let Some(field) = StatusField::from_index(pair[0]) {
                return Some((field, pair[1]));
            }
        }
    }
}

/// Split a status update into pairs; indices outside 1..=5 are skipped
pub fn parse_status_update(payload: &[u8]) -> Result<StatusPairs<'_>, BusError> {
    if payload.len() % 2 != 0 {
        return Err(BusError::OddLength);
    }
    Ok(StatusPairs {
        chunks: payload.chunks_exact(2),
    })
}

/// Enrollment outcome sent to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusReport {
    pub sequence: u8,
    pub status: u8,
}

impl StatusReport {
    /// Report with `source` and `outcome` from [`report`]
    pub fn new(sequence: u8, source: u8, outcome: u8) -> Self {
        Self {
            sequence,
            status: source | (outcome & 0x0F),
        }
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        [self.sequence, self.status]
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BusError> {
        match bytes {
            [sequence, status] => Ok(Self {
                sequence: *sequence,
                status: *status,
            }),
            _ => Err(BusError::BadLength),
        }
    }
}

/// Compact bitfield view of the status snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusWord(pub u8);

impl StatusWord {
    pub fn contains(&self, field: StatusField) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn set(&mut self, field: StatusField, value: bool) {
        if value {
            self.0 |= field.bit();
        } else {
            self.0 &= !field.bit();
        }
    }

    pub fn with(mut self, field: StatusField) -> Self {
        self.set(field, true);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_flag_pair() {
        let pairs: heapless::Vec<_, 4> = parse_status_update(&[0x02, 0x01]).unwrap().collect();
        assert_eq!(&pairs[..], &[(StatusField::Day, 0x01)]);
    }

    #[test]
    fn test_unknown_indices_skipped() {
        let pairs: heapless::Vec<_, 4> = parse_status_update(&[0x00, 0x01, 0x03, 0x01, 0x09, 0x01])
            .unwrap()
            .collect();
        assert_eq!(&pairs[..], &[(StatusField::FaceEnroll, 0x01)]);
    }

    #[test]
    fn test_odd_length_rejected() {
        assert!(matches!(
            parse_status_update(&[0x01, 0x01, 0x02]),
            Err(BusError::OddLength)
        ));
        assert_eq!(parse_status_update(&[]).unwrap().count(), 0);
    }

    #[test]
    fn test_request_bytes() {
        assert_eq!(Request::WrongTone.to_byte(), 0x04);
        assert_eq!(Request::from_byte(0xFF), Some(Request::Test));
        assert_eq!(Request::from_byte(0x06), None);
    }

    #[test]
    fn test_status_report() {
        let report = StatusReport {
            sequence: 7,
            status: 0x01,
        };
        assert_eq!(report.to_bytes(), [7, 1]);
        assert_eq!(StatusReport::from_bytes(&[7, 1]), Ok(report));
        assert_eq!(StatusReport::from_bytes(&[7]), Err(BusError::BadLength));
    }

    #[test]
    fn test_status_word() {
        let mut word = StatusWord::default().with(StatusField::Day);
        assert!(word.contains(StatusField::Day));
        assert!(!word.contains(StatusField::DoorOpen));
        word.set(StatusField::DoorOpen, true);
        word.set(StatusField::Day, false);
        assert_eq!(word.0, 0b1_0000);
        assert!(StatusField::FingerEnroll.is_edge());
        assert!(!StatusField::PowerSave.is_edge());
    }
}
