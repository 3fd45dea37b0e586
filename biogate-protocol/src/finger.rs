//! Fingerprint module protocol
//!
//! Frame format (all fields big-endian):
//! - START (2 bytes): 0xEF01
//! - ADDRESS (4 bytes): module address, 0xFFFFFFFF by default
//! - PID (1 byte): 0x01 for commands, 0x07 for acknowledgements
//! - LENGTH (2 bytes): bytes following LENGTH, checksum included
//! - CMD (commands) or STATUS (acknowledgements), 1 byte
//! - PAYLOAD (0-128 bytes)
//! - CHECKSUM (2 bytes): truncated sum of PID through end of PAYLOAD

use heapless::Vec;

use crate::frame::FrameError;

/// Frame synchronization word
pub const START_MARKER: u16 = 0xEF01;

/// Factory default module address
pub const DEFAULT_ADDRESS: u32 = 0xFFFF_FFFF;

/// Handshake password programmed into the modules we ship
pub const DEFAULT_PASSWORD: u32 = 0x7864_1644;

/// Packet id of a command frame
pub const PID_COMMAND: u8 = 0x01;

/// Packet id of an acknowledge frame
pub const PID_ACK: u8 = 0x07;

/// START + ADDRESS + PID + LENGTH
pub const HEADER_LEN: usize = 9;

/// Size of the trailing checksum
pub const CHECKSUM_LEN: usize = 2;

/// Maximum payload size in bytes (excluding command/status byte)
pub const MAX_PAYLOAD_SIZE: usize = 128;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = HEADER_LEN + 1 + MAX_PAYLOAD_SIZE + CHECKSUM_LEN;

/// The checksum starts at the packet id, right after the address
const CHECKSUM_START: usize = 6;

/// Command codes
pub mod cmd {
    /// Wipe the template library
    pub const DELETE_ALL: u8 = 0x0D;
    /// Change the handshake password
    pub const SET_PASSWORD: u8 = 0x12;
    /// Verify the handshake password
    pub const VERIFY_PASSWORD: u8 = 0x13;
    /// Change the module address
    pub const SET_CHIP_ADDRESS: u8 = 0x15;
    /// Number of enrolled templates
    pub const GET_USER_COUNT: u8 = 0x1D;
    /// Multi-capture automatic enrollment
    pub const AUTO_ENROLL: u8 = 0x31;
    /// Automatic capture + search
    pub const AUTO_IDENTIFY: u8 = 0x32;
    /// Enter low-power state
    pub const SLEEP: u8 = 0x33;
    /// Liveness check
    pub const HANDSHAKE: u8 = 0x35;
    /// Ring LED control
    pub const LED_CONTROL: u8 = 0x3C;
}

/// Stage codes carried in the first payload byte of automatic-mode replies
pub mod stage {
    /// Auto-identify: search finished, status tells match / no match
    pub const IDENTIFY_RESULT: u8 = 0x05;
    /// Auto-enroll: templates merged after the last capture
    pub const ENROLL_FINAL: u8 = 0x02;
    /// Auto-enroll: one capture accepted
    pub const ENROLL_CAPTURE: u8 = 0x03;
}

/// Confirmation codes returned in the STATUS byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FingerStatus {
    Ok = 0x00,
    PacketError = 0x01,
    NoFinger = 0x02,
    ImageCaptureFail = 0x03,
    ImageTooDry = 0x04,
    ImageTooWet = 0x05,
    ImageTooMessy = 0x06,
    FewFeaturePoints = 0x07,
    FingerNotMatch = 0x08,
    NoFingerFound = 0x09,
    MergeFail = 0x0A,
    AddressOutOfRange = 0x0B,
    ReadTemplateFail = 0x0C,
    UploadFeatureFail = 0x0D,
    CannotReceiveData = 0x0E,
    UploadImageFail = 0x0F,
    DeleteTemplateFail = 0x10,
    ClearLibraryFail = 0x11,
    EnterLowPowerFail = 0x12,
    WrongPassword = 0x13,
    NoValidImage = 0x15,
    UpgradeFail = 0x16,
    FingerNotMoved = 0x17,
    FlashError = 0x18,
    RandomNumberFail = 0x19,
    InvalidRegister = 0x1A,
    RegisterSettingError = 0x1B,
    NotebookPageError = 0x1C,
    PortOperationFail = 0x1D,
    EnrollFail = 0x1E,
    LibraryFull = 0x1F,
    WrongDeviceAddress = 0x20,
    PasswordError = 0x21,
    TemplateNotEmpty = 0x22,
    TemplateEmpty = 0x23,
    LibraryEmpty = 0x24,
    EntryCountError = 0x25,
    Timeout = 0x26,
    FingerExists = 0x27,
    FeatureAssociated = 0x28,
    SensorOperationFail = 0x29,
    ModuleInfoNotEmpty = 0x2A,
    ModuleInfoEmpty = 0x2B,
    OtpOperationFail = 0x2C,
    KeyGenerationFail = 0x2D,
    KeyNotExist = 0x2E,
    AlgorithmFail = 0x2F,
    AlgorithmResultError = 0x30,
    FunctionNotMatch = 0x31,
    KeyLocked = 0x32,
    SmallImageArea = 0x33,
    UnusableImage = 0x34,
    IllegalData = 0x35,
    Reserved = 0x36,
}

impl FingerStatus {
    /// Parse a status from its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        use FingerStatus::*;
        let status = match byte {
            0x00 => Ok,
            0x01 => PacketError,
            0x02 => NoFinger,
            0x03 => ImageCaptureFail,
            0x04 => ImageTooDry,
            0x05 => ImageTooWet,
            0x06 => ImageTooMessy,
            0x07 => FewFeaturePoints,
            0x08 => FingerNotMatch,
            0x09 => NoFingerFound,
            0x0A => MergeFail,
            0x0B => AddressOutOfRange,
            0x0C => ReadTemplateFail,
            0x0D => UploadFeatureFail,
            0x0E => CannotReceiveData,
            0x0F => UploadImageFail,
            0x10 => DeleteTemplateFail,
            0x11 => ClearLibraryFail,
            0x12 => EnterLowPowerFail,
            0x13 => WrongPassword,
            0x15 => NoValidImage,
            0x16 => UpgradeFail,
            0x17 => FingerNotMoved,
            0x18 => FlashError,
            0x19 => RandomNumberFail,
            0x1A => InvalidRegister,
            0x1B => RegisterSettingError,
            0x1C => NotebookPageError,
            0x1D => PortOperationFail,
            0x1E => EnrollFail,
            0x1F => LibraryFull,
            0x20 => WrongDeviceAddress,
            0x21 => PasswordError,
            0x22 => TemplateNotEmpty,
            0x23 => TemplateEmpty,
            0x24 => LibraryEmpty,
            0x25 => EntryCountError,
            0x26 => Timeout,
            0x27 => FingerExists,
            0x28 => FeatureAssociated,
            0x29 => SensorOperationFail,
            0x2A => ModuleInfoNotEmpty,
            0x2B => ModuleInfoEmpty,
            0x2C => OtpOperationFail,
            0x2D => KeyGenerationFail,
            0x2E => KeyNotExist,
            0x2F => AlgorithmFail,
            0x30 => AlgorithmResultError,
            0x31 => FunctionNotMatch,
            0x32 => KeyLocked,
            0x33 => SmallImageArea,
            0x34 => UnusableImage,
            0x35 => IllegalData,
            0x36 => Reserved,
            _ => return None,
        };
        Some(status)
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Returns true if the command completed successfully
    pub fn is_ok(&self) -> bool {
        *self == FingerStatus::Ok
    }
}

/// 16-bit truncated additive checksum
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(byte as u16))
}

/// An outbound command frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    /// Target module address
    pub address: u32,
    /// Command code
    pub code: u8,
    /// Command-specific payload
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl CommandFrame {
    /// Create a new command frame
    pub fn new(address: u32, code: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            address,
            code,
            payload: payload_vec,
        })
    }

    /// Create a command with no payload
    pub fn empty(address: u32, code: u8) -> Self {
        Self {
            address,
            code,
            payload: Vec::new(),
        }
    }

    /// Total encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + 1 + self.payload.len() + CHECKSUM_LEN
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let length = (1 + self.payload.len() + CHECKSUM_LEN) as u16;
        let body_end = HEADER_LEN + 1 + self.payload.len();

        buffer[0..2].copy_from_slice(&START_MARKER.to_be_bytes());
        buffer[2..6].copy_from_slice(&self.address.to_be_bytes());
        buffer[6] = PID_COMMAND;
        buffer[7..9].copy_from_slice(&length.to_be_bytes());
        buffer[9] = self.code;
        buffer[10..body_end].copy_from_slice(&self.payload);

        let sum = checksum(&buffer[CHECKSUM_START..body_end]);
        buffer[body_end..frame_len].copy_from_slice(&sum.to_be_bytes());

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// Validate framing and checksum of a raw frame
///
/// Returns the packet id and the bytes between LENGTH and CHECKSUM
/// (command/status byte plus payload). Bytes past the declared length are
/// ignored.
pub fn validate(bytes: &[u8], address: u32) -> Result<(u8, &[u8]), FrameError> {
    if bytes.len() < HEADER_LEN {
        return Err(FrameError::TooShort);
    }

    if u16::from_be_bytes([bytes[0], bytes[1]]) != START_MARKER {
        return Err(FrameError::BadStartMarker);
    }

    if u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]) != address {
        return Err(FrameError::BadAddress);
    }

    let length = u16::from_be_bytes([bytes[7], bytes[8]]) as usize;
    if length < 1 + CHECKSUM_LEN {
        return Err(FrameError::TooShort);
    }

    let frame_len = HEADER_LEN + length;
    if bytes.len() < frame_len {
        return Err(FrameError::TooShort);
    }

    let body_end = frame_len - CHECKSUM_LEN;
    let expected = checksum(&bytes[CHECKSUM_START..body_end]);
    let received = u16::from_be_bytes([bytes[body_end], bytes[body_end + 1]]);
    if expected != received {
        return Err(FrameError::ChecksumMismatch);
    }

    Ok((bytes[6], &bytes[HEADER_LEN..body_end]))
}

/// A validated acknowledge frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerReply {
    /// Raw confirmation code
    pub status: u8,
    /// Reply payload (stage code first for automatic-mode commands)
    pub data: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl FingerReply {
    /// Parse and validate an acknowledge frame from `address`
    pub fn parse(bytes: &[u8], address: u32) -> Result<Self, FrameError> {
        let (pid, body) = validate(bytes, address)?;
        if pid != PID_ACK {
            return Err(FrameError::BadPacketId);
        }

        let mut data = Vec::new();
        data.extend_from_slice(&body[1..])
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            status: body[0],
            data,
        })
    }

    /// Decoded confirmation code, if it is a known one
    pub fn status(&self) -> Option<FingerStatus> {
        FingerStatus::from_byte(self.status)
    }

    /// True when the confirmation code is OK
    pub fn is_ok(&self) -> bool {
        self.status == FingerStatus::Ok.to_byte()
    }

    /// Stage code of an automatic-mode reply (0 when absent)
    pub fn stage(&self) -> u8 {
        self.data.first().copied().unwrap_or(0)
    }
}

/// Ring LED animation modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LedMode {
    Breath = 1,
    Blink = 2,
    AlwaysOn = 3,
    AlwaysOff = 4,
    GradualOn = 5,
    GradualOff = 6,
}

/// Ring LED colours (RGB bitmask: red=4, green=2, blue=1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LedColor {
    None = 0,
    Blue = 1,
    Green = 2,
    GreenBlue = 3,
    Red = 4,
    RedBlue = 5,
    RedGreen = 6,
    White = 7,
}

/// Payload of the LED control command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedParams {
    pub mode: LedMode,
    pub start_color: LedColor,
    pub end_color: LedColor,
    /// Number of animation cycles, 0 = forever
    pub loop_times: u8,
}

impl Default for LedParams {
    fn default() -> Self {
        Self {
            mode: LedMode::Breath,
            start_color: LedColor::GreenBlue,
            end_color: LedColor::GreenBlue,
            loop_times: 0,
        }
    }
}

impl LedParams {
    /// LED switched off
    pub fn off() -> Self {
        Self::default().with_mode(LedMode::AlwaysOff)
    }

    /// Single blink in `color`
    pub fn blink_once(color: LedColor) -> Self {
        Self::default()
            .with_mode(LedMode::Blink)
            .with_loop_times(1)
            .with_start_color(color)
    }

    /// Endless breathing in `color`
    pub fn breathe(color: LedColor) -> Self {
        Self::default()
            .with_mode(LedMode::Breath)
            .with_start_color(color)
            .with_end_color(color)
    }

    pub fn with_mode(mut self, mode: LedMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_start_color(mut self, color: LedColor) -> Self {
        self.start_color = color;
        self
    }

    pub fn with_end_color(mut self, color: LedColor) -> Self {
        self.end_color = color;
        self
    }

    pub fn with_loop_times(mut self, loop_times: u8) -> Self {
        self.loop_times = loop_times;
        self
    }

    /// Wire layout: mode, start colour, end colour, loop count
    pub fn to_bytes(&self) -> [u8; 4] {
        [
            self.mode as u8,
            self.start_color as u8,
            self.end_color as u8,
            self.loop_times,
        ]
    }
}

/// Payload of the auto-enroll command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AutoEnrollParams {
    /// Template slot to store into
    pub id: u16,
    /// Number of captures
    pub times: u8,
    /// Backlight turns off after a good capture
    pub led_auto_off: bool,
    /// Image pre-processing
    pub pre_process: bool,
    /// Suppress per-stage status replies
    pub no_return_states: bool,
    /// Allow overwriting an occupied slot
    pub allow_id_cover: bool,
    /// Reject fingers already enrolled
    pub no_duplicate: bool,
    /// Do not require lifting the finger between captures
    pub no_leave_after_enroll: bool,
}

impl Default for AutoEnrollParams {
    fn default() -> Self {
        Self {
            id: 0,
            times: 5,
            led_auto_off: true,
            pre_process: true,
            no_return_states: false,
            allow_id_cover: false,
            no_duplicate: true,
            no_leave_after_enroll: false,
        }
    }
}

impl AutoEnrollParams {
    /// Control bits, LSB first in declaration order
    pub fn flags(&self) -> u8 {
        (self.led_auto_off as u8)
            | (self.pre_process as u8) << 1
            | (self.no_return_states as u8) << 2
            | (self.allow_id_cover as u8) << 3
            | (self.no_duplicate as u8) << 4
            | (self.no_leave_after_enroll as u8) << 5
    }

    /// Wire layout: id (BE), times, reserved, flags
    pub fn to_bytes(&self) -> [u8; 5] {
        let id = self.id.to_be_bytes();
        [id[0], id[1], self.times, 0, self.flags()]
    }
}

/// Payload of the auto-identify command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AutoIdentifyParams {
    /// Match score threshold (1-28)
    pub score_threshold: u8,
    /// Template to compare against, 0xFFFF searches the whole library
    pub id: u16,
    pub led_auto_off: bool,
    pub pre_process: bool,
    pub no_return_states: bool,
}

impl Default for AutoIdentifyParams {
    fn default() -> Self {
        Self {
            score_threshold: 20,
            id: 0xFFFF,
            led_auto_off: true,
            pre_process: true,
            no_return_states: false,
        }
    }
}

impl AutoIdentifyParams {
    pub fn flags(&self) -> u8 {
        (self.led_auto_off as u8) | (self.pre_process as u8) << 1 | (self.no_return_states as u8) << 2
    }

    /// Wire layout: threshold, id (BE), reserved, flags
    pub fn to_bytes(&self) -> [u8; 5] {
        let id = self.id.to_be_bytes();
        [self.score_threshold, id[0], id[1], 0, self.flags()]
    }
}

/// Commands the controller issues to the fingerprint module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FingerCommand {
    AutoEnroll(AutoEnrollParams),
    AutoIdentify(AutoIdentifyParams),
    GetUserCount,
    SetPassword(u32),
    VerifyPassword(u32),
    SetChipAddress(u32),
    LedControl(LedParams),
    DeleteAll,
    Handshake,
    Sleep,
}

impl FingerCommand {
    /// Command code on the wire
    pub fn code(&self) -> u8 {
        match self {
            FingerCommand::AutoEnroll(_) => cmd::AUTO_ENROLL,
            FingerCommand::AutoIdentify(_) => cmd::AUTO_IDENTIFY,
            FingerCommand::GetUserCount => cmd::GET_USER_COUNT,
            FingerCommand::SetPassword(_) => cmd::SET_PASSWORD,
            FingerCommand::VerifyPassword(_) => cmd::VERIFY_PASSWORD,
            FingerCommand::SetChipAddress(_) => cmd::SET_CHIP_ADDRESS,
            FingerCommand::LedControl(_) => cmd::LED_CONTROL,
            FingerCommand::DeleteAll => cmd::DELETE_ALL,
            FingerCommand::Handshake => cmd::HANDSHAKE,
            FingerCommand::Sleep => cmd::SLEEP,
        }
    }

    /// Build the command frame for the module at `address`
    pub fn to_frame(&self, address: u32) -> Result<CommandFrame, FrameError> {
        let code = self.code();
        match self {
            FingerCommand::AutoEnroll(params) => {
                CommandFrame::new(address, code, &params.to_bytes())
            }
            FingerCommand::AutoIdentify(params) => {
                CommandFrame::new(address, code, &params.to_bytes())
            }
            FingerCommand::SetPassword(value)
            | FingerCommand::VerifyPassword(value)
            | FingerCommand::SetChipAddress(value) => {
                CommandFrame::new(address, code, &value.to_be_bytes())
            }
            FingerCommand::LedControl(params) => {
                CommandFrame::new(address, code, &params.to_bytes())
            }
            FingerCommand::GetUserCount
            | FingerCommand::DeleteAll
            | FingerCommand::Handshake
            | FingerCommand::Sleep => Ok(CommandFrame::empty(address, code)),
        }
    }
}
