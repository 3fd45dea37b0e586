//! Ring LED notification machine
//!
//! Each step emits one LED command. A transient notice (wrong, success)
//! shows once, then the machine falls back to the breathing animation:
//! the next step comes after the revert delay, later ones at idle pacing.

use biogate_core::config::FingerConfig;
use biogate_core::LedNotice;
use biogate_protocol::finger::{LedColor, LedParams};

/// Colour scheme of the breathing animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LightMode {
    Day,
    Night,
    #[default]
    Off,
}

/// Output of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedStep {
    pub params: LedParams,
    /// Delay until the next step
    pub next_period_ms: u32,
}

#[derive(Debug, Clone)]
pub struct LedMachine {
    notice: LedNotice,
    mode: LightMode,
}

impl Default for LedMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl LedMachine {
    pub fn new() -> Self {
        Self {
            notice: LedNotice::Waiting,
            mode: LightMode::Off,
        }
    }

    pub fn set_notice(&mut self, notice: LedNotice) {
        self.notice = notice;
    }

    pub fn notice(&self) -> LedNotice {
        self.notice
    }

    pub fn set_light_mode(&mut self, mode: LightMode) {
        self.mode = mode;
    }

    pub fn light_mode(&self) -> LightMode {
        self.mode
    }

    pub fn step(&mut self, config: &FingerConfig) -> LedStep {
        let step = match self.notice {
            LedNotice::Wrong => LedStep {
                params: LedParams::blink_once(LedColor::Red),
                next_period_ms: config.led_revert_ms,
            },
            LedNotice::Success => LedStep {
                params: LedParams::blink_once(LedColor::Green),
                next_period_ms: config.led_revert_ms,
            },
            LedNotice::Waiting => LedStep {
                params: self.waiting_params(),
                next_period_ms: config.led_idle_ms,
            },
        };
        self.notice = LedNotice::Waiting;
        step
    }

    fn waiting_params(&self) -> LedParams {
        match self.mode {
            LightMode::Day => LedParams::breathe(LedColor::GreenBlue),
            LightMode::Night => LedParams::breathe(LedColor::RedBlue),
            LightMode::Off => LedParams::off(),
        }
    }
}
