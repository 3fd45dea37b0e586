//! Face recognition module protocol
//!
//! Command frame:
//! - START (2 bytes): 0xEFAA
//! - MSG_ID (1 byte)
//! - LENGTH (2 bytes, BE): payload size
//! - PAYLOAD (0-128 bytes)
//! - PARITY (1 byte): XOR of MSG_ID through end of PAYLOAD
//!
//! Reply frame:
//! - START (2 bytes): 0xEFAA
//! - CLASS (1 byte): 0 reply, 1 note, 2 image
//! - LENGTH (2 bytes, BE): counts SUB_ID, RESULT and DATA
//! - SUB_ID (1 byte): echoed command id, or note id
//! - RESULT (1 byte)
//! - DATA
//! - PARITY (1 byte) at offset 5 + LENGTH

use heapless::Vec;

use crate::frame::FrameError;

/// Frame synchronization word
pub const START_MARKER: u16 = 0xEFAA;

/// START + MSG_ID/CLASS + LENGTH
pub const HEADER_LEN: usize = 5;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 128;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = HEADER_LEN + MAX_PAYLOAD_SIZE + 1;

/// Length of the generated user name in an enroll request
pub const USER_NAME_LEN: usize = 32;

/// Command ids
pub mod cmd {
    pub const RESET: u8 = 0x10;
    pub const GET_STATUS: u8 = 0x11;
    pub const VERIFY: u8 = 0x12;
    pub const ENROLL: u8 = 0x13;
    pub const DELETE_ALL: u8 = 0x21;
    pub const SET_UVC_PARAMS: u8 = 0xB1;
}

/// Note ids
pub mod note {
    /// Module finished booting
    pub const READY: u8 = 0x00;
}

/// Reply frame classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MessageClass {
    Reply = 0,
    Note = 1,
    Image = 2,
}

impl MessageClass {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(MessageClass::Reply),
            1 => Some(MessageClass::Note),
            2 => Some(MessageClass::Image),
            _ => None,
        }
    }
}

/// Result codes carried in replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FaceResult {
    Success = 0,
    Rejected = 1,
    Aborted = 2,
    CameraFailed = 4,
    UnknownReason = 5,
    InvalidParam = 6,
    NoMemory = 7,
    UnknownUser = 8,
    MaxUser = 9,
    FaceEnrolled = 10,
    LivenessCheck = 12,
    Timeout = 13,
    Authorization = 14,
    ReadFile = 19,
    WriteFile = 20,
    NoEncrypt = 21,
    NoRgbImage = 23,
}

impl FaceResult {
    pub fn from_byte(byte: u8) -> Option<Self> {
        use FaceResult::*;
        let result = match byte {
            0 => Success,
            1 => Rejected,
            2 => Aborted,
            4 => CameraFailed,
            5 => UnknownReason,
            6 => InvalidParam,
            7 => NoMemory,
            8 => UnknownUser,
            9 => MaxUser,
            10 => FaceEnrolled,
            12 => LivenessCheck,
            13 => Timeout,
            14 => Authorization,
            19 => ReadFile,
            20 => WriteFile,
            21 => NoEncrypt,
            23 => NoRgbImage,
            _ => return None,
        };
        Some(result)
    }
}

/// Module state reported by the status query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FaceState {
    #[default]
    Idle = 0,
    Busy = 1,
    Error = 2,
    Invalid = 3,
}

impl FaceState {
    /// Unknown values map to `Invalid`
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => FaceState::Idle,
            1 => FaceState::Busy,
            2 => FaceState::Error,
            _ => FaceState::Invalid,
        }
    }
}

/// Head pose requested for one enroll capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FaceDirection {
    Undefined = 0x00,
    #[default]
    Front = 0x01,
    Right = 0x02,
    Left = 0x04,
    Down = 0x08,
    Up = 0x10,
}

impl FaceDirection {
    /// Capture order of an interactive enrollment
    pub const ENROLL_ORDER: [FaceDirection; 5] = [
        FaceDirection::Front,
        FaceDirection::Up,
        FaceDirection::Down,
        FaceDirection::Left,
        FaceDirection::Right,
    ];
}

/// XOR parity over `bytes`
pub fn parity(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &byte| acc ^ byte)
}

/// Validate framing and parity
///
/// Returns the MSG_ID/CLASS byte and the LENGTH bytes that follow the
/// header. Bytes past the parity byte are ignored.
pub fn check_frame(bytes: &[u8]) -> Result<(u8, &[u8]), FrameError> {
    if bytes.len() < HEADER_LEN + 1 {
        return Err(FrameError::TooShort);
    }

    if u16::from_be_bytes([bytes[0], bytes[1]]) != START_MARKER {
        return Err(FrameError::BadStartMarker);
    }

    let length = u16::from_be_bytes([bytes[3], bytes[4]]) as usize;
    let parity_offset = HEADER_LEN + length;
    if bytes.len() <= parity_offset {
        return Err(FrameError::TooShort);
    }

    if parity(&bytes[2..parity_offset]) != bytes[parity_offset] {
        return Err(FrameError::ParityMismatch);
    }

    Ok((bytes[2], &bytes[HEADER_LEN..parity_offset]))
}

/// An outbound command frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    pub msg_id: u8,
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl CommandFrame {
    pub fn new(msg_id: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self {
            msg_id,
            payload: payload_vec,
        })
    }

    pub fn empty(msg_id: u8) -> Self {
        Self {
            msg_id,
            payload: Vec::new(),
        }
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len() + 1
    }

    /// Encode this frame into a byte buffer, returning the bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let parity_offset = frame_len - 1;
        buffer[0..2].copy_from_slice(&START_MARKER.to_be_bytes());
        buffer[2] = self.msg_id;
        buffer[3..5].copy_from_slice(&(self.payload.len() as u16).to_be_bytes());
        buffer[HEADER_LEN..parity_offset].copy_from_slice(&self.payload);
        buffer[parity_offset] = parity(&buffer[2..parity_offset]);

        Ok(frame_len)
    }

    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// A validated reply, note or image frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceReply {
    pub class: MessageClass,
    /// Echoed command id for replies, note id for notes
    pub sub_id: u8,
    /// Raw result byte, absent when LENGTH is 1
    pub result: Option<u8>,
    pub data: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl FaceReply {
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        let (class, body) = check_frame(bytes)?;
        let class = MessageClass::from_byte(class).ok_or(FrameError::UnknownClass)?;

        let (&sub_id, rest) = body.split_first().ok_or(FrameError::TooShort)?;
        let (result, rest) = match rest.split_first() {
            Some((&result, rest)) => (Some(result), rest),
            None => (None, rest),
        };

        let mut data = Vec::new();
        data.extend_from_slice(rest)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            class,
            sub_id,
            result,
            data,
        })
    }

    /// True for a reply whose result byte reads success
    pub fn is_success(&self) -> bool {
        self.result == Some(FaceResult::Success as u8)
    }

    pub fn result_code(&self) -> Option<FaceResult> {
        self.result.and_then(FaceResult::from_byte)
    }
}

/// Payload of the verify command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VerifyParams {
    pub power_off_after_verify: bool,
    /// Seconds
    pub timeout: u8,
}

impl Default for VerifyParams {
    fn default() -> Self {
        Self {
            power_off_after_verify: false,
            timeout: 20,
        }
    }
}

impl VerifyParams {
    pub fn to_bytes(&self) -> [u8; 2] {
        [self.power_off_after_verify as u8, self.timeout]
    }
}

/// Payload of the enroll command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnrollParams {
    pub admin: bool,
    pub name: [u8; USER_NAME_LEN],
    pub direction: FaceDirection,
    /// Seconds
    pub timeout: u8,
}

impl EnrollParams {
    /// Parameters with a user name of random lowercase letters derived from `seed`
    pub fn with_seed(seed: u32) -> Self {
        // xorshift32 never leaves zero
        let mut state = if seed == 0 { 0x9E37_79B9 } else { seed };
        let mut name = [0u8; USER_NAME_LEN];
        for byte in name.iter_mut() {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            *byte = b'a' + (state % 26) as u8;
        }

        Self {
            admin: false,
            name,
            direction: FaceDirection::Front,
            timeout: 20,
        }
    }

    pub fn with_direction(mut self, direction: FaceDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_timeout(mut self, timeout: u8) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn admin(mut self) -> Self {
        self.admin = true;
        self
    }

    /// Wire layout: admin, name, direction, timeout
    pub fn to_bytes(&self) -> [u8; USER_NAME_LEN + 3] {
        let mut bytes = [0u8; USER_NAME_LEN + 3];
        bytes[0] = self.admin as u8;
        bytes[1..=USER_NAME_LEN].copy_from_slice(&self.name);
        bytes[USER_NAME_LEN + 1] = self.direction as u8;
        bytes[USER_NAME_LEN + 2] = self.timeout;
        bytes
    }
}

/// USB camera output settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UvcParams {
    /// 0x11 for USB 1.1, 0x20 for USB 2.0
    pub usb_type: u8,
    pub rotate: bool,
    pub mirror: bool,
    pub jpeg_quality: u8,
}

impl Default for UvcParams {
    fn default() -> Self {
        Self {
            usb_type: 0x11,
            rotate: false,
            mirror: false,
            jpeg_quality: 99,
        }
    }
}

impl UvcParams {
    pub fn to_bytes(&self) -> [u8; 3] {
        [
            self.usb_type,
            (self.rotate as u8) | (self.mirror as u8) << 1,
            self.jpeg_quality,
        ]
    }
}

/// Commands the controller issues to the face module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaceCommand {
    Reset,
    GetStatus,
    Verify(VerifyParams),
    Enroll(EnrollParams),
    DeleteAll,
    SetUvcParams(UvcParams),
}

impl FaceCommand {
    pub fn msg_id(&self) -> u8 {
        match self {
            FaceCommand::Reset => cmd::RESET,
            FaceCommand::GetStatus => cmd::GET_STATUS,
            FaceCommand::Verify(_) => cmd::VERIFY,
            FaceCommand::Enroll(_) => cmd::ENROLL,
            FaceCommand::DeleteAll => cmd::DELETE_ALL,
            FaceCommand::SetUvcParams(_) => cmd::SET_UVC_PARAMS,
        }
    }

    pub fn to_frame(&self) -> Result<CommandFrame, FrameError> {
        let msg_id = self.msg_id();
        match self {
            FaceCommand::Verify(params) => CommandFrame::new(msg_id, &params.to_bytes()),
            FaceCommand::Enroll(params) => CommandFrame::new(msg_id, &params.to_bytes()),
            FaceCommand::SetUvcParams(params) => CommandFrame::new(msg_id, &params.to_bytes()),
            FaceCommand::Reset | FaceCommand::GetStatus | FaceCommand::DeleteAll => {
                Ok(CommandFrame::empty(msg_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(class: u8, body: &[u8]) -> Vec<u8, MAX_FRAME_SIZE> {
        let mut frame: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
        frame.extend_from_slice(&START_MARKER.to_be_bytes()).unwrap();
        frame.push(class).unwrap();
        frame
            .extend_from_slice(&(body.len() as u16).to_be_bytes())
            .unwrap();
        frame.extend_from_slice(body).unwrap();
        let p = parity(&frame[2..]);
        frame.push(p).unwrap();
        frame
    }

    #[test]
    fn test_reset_frame_bytes() {
        let frame = FaceCommand::Reset.to_frame().unwrap().encode_to_vec().unwrap();
        assert_eq!(&frame[..], &[0xEF, 0xAA, 0x10, 0x00, 0x00, 0x10]);
    }

    #[test]
    fn test_verify_frame_bytes() {
        let frame = FaceCommand::Verify(VerifyParams::default())
            .to_frame()
            .unwrap()
            .encode_to_vec()
            .unwrap();
        // 0x12 ^ 0x00 ^ 0x02 ^ 0x00 ^ 0x14
        assert_eq!(&frame[..], &[0xEF, 0xAA, 0x12, 0x00, 0x02, 0x00, 0x14, 0x04]);
    }

    #[test]
    fn test_parse_verify_success() {
        let frame = reply(0, &[cmd::VERIFY, 0x00, 0x01, 0x02]);
        let parsed = FaceReply::parse(&frame).unwrap();

        assert_eq!(parsed.class, MessageClass::Reply);
        assert_eq!(parsed.sub_id, cmd::VERIFY);
        assert!(parsed.is_success());
        assert_eq!(&parsed.data[..], &[0x01, 0x02]);
    }

    #[test]
    fn test_parse_ready_note() {
        let frame = reply(1, &[note::READY]);
        let parsed = FaceReply::parse(&frame).unwrap();

        assert_eq!(parsed.class, MessageClass::Note);
        assert_eq!(parsed.sub_id, note::READY);
        assert_eq!(parsed.result, None);
    }

    #[test]
    fn test_parse_rejects_bad_frames() {
        assert_eq!(FaceReply::parse(&[0xEF, 0xAA, 0x00]), Err(FrameError::TooShort));

        let mut frame = reply(0, &[cmd::ENROLL, 0x00]);
        frame[1] = 0xAB;
        assert_eq!(FaceReply::parse(&frame), Err(FrameError::BadStartMarker));

        let mut frame = reply(0, &[cmd::ENROLL, 0x00]);
        frame[6] ^= 0x40;
        assert_eq!(FaceReply::parse(&frame), Err(FrameError::ParityMismatch));

        let frame = reply(7, &[cmd::ENROLL, 0x00]);
        assert_eq!(FaceReply::parse(&frame), Err(FrameError::UnknownClass));

        let frame = reply(0, &[]);
        assert_eq!(FaceReply::parse(&frame), Err(FrameError::TooShort));
    }

    #[test]
    fn test_declared_length_beyond_frame() {
        let mut frame = reply(0, &[cmd::VERIFY, 0x00]);
        frame[4] = 0x10;
        assert_eq!(FaceReply::parse(&frame), Err(FrameError::TooShort));
    }

    #[test]
    fn test_enroll_params_layout() {
        let params = EnrollParams::with_seed(42).with_direction(FaceDirection::Left);
        let bytes = params.to_bytes();

        assert_eq!(bytes.len(), 35);
        assert_eq!(bytes[0], 0);
        assert!(bytes[1..33].iter().all(|b| b.is_ascii_lowercase()));
        assert_eq!(bytes[33], 0x04);
        assert_eq!(bytes[34], 20);
    }

    #[test]
    fn test_enroll_names_vary_with_seed() {
        let a = EnrollParams::with_seed(1);
        let b = EnrollParams::with_seed(2);
        assert_ne!(a.name, b.name);
        assert_eq!(a.name, EnrollParams::with_seed(1).name);
        assert!(EnrollParams::with_seed(0).name.iter().all(|b| b.is_ascii_lowercase()));
    }

    #[test]
    fn test_uvc_params() {
        let params = UvcParams {
            rotate: true,
            mirror: true,
            ..Default::default()
        };
        assert_eq!(params.to_bytes(), [0x11, 0x03, 99]);
    }

    #[test]
    fn test_state_and_result_tables() {
        assert_eq!(FaceState::from_byte(1), FaceState::Busy);
        assert_eq!(FaceState::from_byte(9), FaceState::Invalid);
        assert_eq!(FaceResult::from_byte(13), Some(FaceResult::Timeout));
        assert_eq!(FaceResult::from_byte(3), None);
    }

    #[test]
    fn test_enroll_order() {
        let codes: [u8; 5] = FaceDirection::ENROLL_ORDER.map(|d| d as u8);
        assert_eq!(codes, [0x01, 0x10, 0x08, 0x04, 0x02]);
    }
}
