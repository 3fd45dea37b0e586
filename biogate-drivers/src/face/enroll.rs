//! Interactive face enrollment sequence
//!
//! ```text
//! LeadIn ─▶ PromptGap ─▶ Capture[0] ─▶ Settle[0] ─▶ Capture[1] ─▶ … ─▶ Settle[4] ─▶ Done
//!                            │ fail / timeout
//!                            ▼
//!                          Done
//! ```
//!
//! The sequence only decides what happens next; the engine performs the
//! returned [`EnrollAction`]s.

use biogate_core::config::FaceConfig;
use biogate_core::reached;
use biogate_protocol::face::EnrollParams;
use biogate_protocol::FaceDirection;

/// Result of the capture in flight, as decoded from module replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureStatus {
    #[default]
    Pending,
    Succeeded,
    Failed,
}

/// What the engine should do after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollAction {
    Wait,
    /// Play the enroll prompt
    Prompt,
    /// Send an enroll command for this direction
    StartCapture(EnrollParams),
    /// Capture accepted, settling before the next one
    CaptureAccepted,
    /// All directions captured
    Completed,
    /// Module reported a failure
    Failed,
    /// Module stayed silent past the capture bound
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    LeadIn,
    PromptGap,
    Capture(usize),
    Settle(usize),
    Done,
}

#[derive(Debug, Clone)]
pub struct EnrollSequence {
    phase: Phase,
    deadline_ms: u32,
    params: EnrollParams,
    config: FaceConfig,
}

impl EnrollSequence {
    /// `params` carries the user name shared by every capture
    pub fn new(now_ms: u32, params: EnrollParams, config: &FaceConfig) -> Self {
        Self {
            phase: Phase::LeadIn,
            deadline_ms: now_ms.wrapping_add(config.lead_in_ms),
            params,
            config: *config,
        }
    }

    pub fn step(&mut self, now_ms: u32, capture: CaptureStatus) -> EnrollAction {
        match self.phase {
            Phase::LeadIn => {
                if !reached(now_ms, self.deadline_ms) {
                    return EnrollAction::Wait;
                }
                self.phase = Phase::PromptGap;
                self.deadline_ms = now_ms.wrapping_add(self.config.prompt_gap_ms);
                EnrollAction::Prompt
            }
            Phase::PromptGap => {
                if !reached(now_ms, self.deadline_ms) {
                    return EnrollAction::Wait;
                }
                self.start_capture(0, now_ms)
            }
            Phase::Capture(index) => match capture {
                CaptureStatus::Failed => {
                    self.phase = Phase::Done;
                    EnrollAction::Failed
                }
                CaptureStatus::Succeeded => {
                    self.phase = Phase::Settle(index);
                    self.deadline_ms = now_ms.wrapping_add(self.config.settle_ms);
                    EnrollAction::CaptureAccepted
                }
                CaptureStatus::Pending if reached(now_ms, self.deadline_ms) => {
                    self.phase = Phase::Done;
                    EnrollAction::TimedOut
                }
                CaptureStatus::Pending => EnrollAction::Wait,
            },
            Phase::Settle(index) => {
                if !reached(now_ms, self.deadline_ms) {
                    return EnrollAction::Wait;
                }
                if index + 1 < FaceDirection::ENROLL_ORDER.len() {
                    self.start_capture(index + 1, now_ms)
                } else {
                    self.phase = Phase::Done;
                    EnrollAction::Completed
                }
            }
            Phase::Done => EnrollAction::Wait,
        }
    }

    fn start_capture(&mut self, index: usize, now_ms: u32) -> EnrollAction {
        self.phase = Phase::Capture(index);
        self.deadline_ms = now_ms.wrapping_add(self.config.capture_timeout_ms);
        EnrollAction::StartCapture(
            self.params
                .with_direction(FaceDirection::ENROLL_ORDER[index])
                .with_timeout(self.config.capture_timeout_s),
        )
    }

    /// Index of the direction being captured or settled
    pub fn direction_index(&self) -> Option<usize> {
        match self.phase {
            Phase::Capture(index) | Phase::Settle(index) => Some(index),
            _ => None,
        }
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.phase, Phase::Capture(_))
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }
}
