//! Configuration type definitions
//!
//! Defaults match the modules and host we ship against. The firmware build
//! script generates a [`DeviceConfig`] from `device.toml`.

use biogate_hal::BusFrameId;
use biogate_protocol::bus;
use biogate_protocol::finger::{DEFAULT_ADDRESS, DEFAULT_PASSWORD};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fingerprint module settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FingerConfig {
    /// Module address
    pub address: u32,
    /// Handshake password
    pub password: u32,
    /// Captures per enrollment
    pub enroll_captures: u8,
    /// Auto-identify match threshold
    pub score_threshold: u8,
    /// Delay before a posted LED notice is shown
    pub led_notice_ms: u32,
    /// Time a transient notice stays before reverting to breathing
    pub led_revert_ms: u32,
    /// Refresh period of the breathing animation
    pub led_idle_ms: u32,
    /// Minimum spacing of identify attempts
    pub verify_gate_ms: u32,
    /// Enrollment abandoned after this long
    pub enroll_timeout_ms: u32,
}

impl Default for FingerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            password: DEFAULT_PASSWORD,
            enroll_captures: 5,
            score_threshold: 20,
            led_notice_ms: 200,
            led_revert_ms: 800,
            led_idle_ms: 2000,
            verify_gate_ms: 1000,
            enroll_timeout_ms: 20_000,
        }
    }
}

/// Face module settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FaceConfig {
    /// Module-side verify timeout, seconds
    pub verify_timeout_s: u8,
    /// Module-side capture timeout, seconds
    pub capture_timeout_s: u8,
    /// Verify retry period while someone is present
    pub identify_retry_ms: u32,
    /// Pause before the enroll prompt
    pub lead_in_ms: u32,
    /// Pause between the enroll prompt and the first capture
    pub prompt_gap_ms: u32,
    /// Controller-side bound on one capture
    pub capture_timeout_ms: u32,
    /// Pause after a successful capture
    pub settle_ms: u32,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            verify_timeout_s: 20,
            capture_timeout_s: 20,
            identify_retry_ms: 21_000,
            lead_in_ms: 2_500,
            prompt_gap_ms: 500,
            capture_timeout_ms: 20_000,
            settle_ms: 2_000,
        }
    }
}

/// Host bus identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    pub identify_success_id: BusFrameId,
    pub status_update_id: BusFrameId,
    /// Default transmit id, used for requests
    pub request_id: BusFrameId,
    pub status_report_id: BusFrameId,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            identify_success_id: bus::ID_IDENTIFY_SUCCESS,
            status_update_id: bus::ID_STATUS_UPDATE,
            request_id: bus::ID_REQUEST,
            status_report_id: bus::ID_STATUS_REPORT,
        }
    }
}

/// Startup and success pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SupervisorConfig {
    /// Settling time before the first module command
    pub boot_delay_ms: u32,
    /// Time allowed for the user-count reply
    pub user_count_wait_ms: u32,
    /// Identify successes are not repeated within this window
    pub success_hold_ms: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            boot_delay_ms: 500,
            user_count_wait_ms: 100,
            success_hold_ms: 3_000,
        }
    }
}

/// Complete board configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceConfig {
    pub finger: FingerConfig,
    pub face: FaceConfig,
    pub bus: BusConfig,
    pub supervisor: SupervisorConfig,
    /// Daemon tick interval
    pub tick_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            finger: FingerConfig::default(),
            face: FaceConfig::default(),
            bus: BusConfig::default(),
            supervisor: SupervisorConfig::default(),
            tick_ms: 10,
        }
    }
}
