//! Controller main-loop body
//!
//! Owns both engines. The firmware calls [`Supervisor::poll`] in a loop with
//! the current time; nothing here blocks.
//!
//! Boot: wait for the modules to settle, query the fingerprint user count,
//! give the reply time to arrive, then report ready and start the LED.

use biogate_core::config::SupervisorConfig;
use biogate_core::{reached, LedNotice, WorkflowState};
use biogate_hal::{BusTx, SerialTx};
use biogate_protocol::bus::report;
use biogate_protocol::{Request, StatusReport};
use heapless::Vec;

use crate::context::Shared;
use crate::face::FaceEngine;
use crate::finger::{FingerEngine, LightMode};

/// Notable things that happened during a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupervisorEvent {
    /// Boot finished
    Ready,
    /// Someone was identified; the host was notified
    IdentifySuccess,
    /// An enrollment ended and was reported to the host
    EnrollmentReported(StatusReport),
}

/// Events per poll
pub const MAX_EVENTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BootPhase {
    Settling { until: u32 },
    AwaitingUserCount { until: u32 },
    Running,
}

/// Coordinates the engines and the host
pub struct Supervisor<'a, FS, CS, B> {
    finger: FingerEngine<'a, FS, B>,
    face: FaceEngine<'a, CS, B>,
    shared: Shared<'a, B>,
    config: SupervisorConfig,
    phase: BootPhase,
    hold_until: Option<u32>,
    report_sequence: u8,
}

impl<'a, FS: SerialTx, CS: SerialTx, B: BusTx> Supervisor<'a, FS, CS, B> {
    pub fn new(
        finger: FingerEngine<'a, FS, B>,
        face: FaceEngine<'a, CS, B>,
        shared: Shared<'a, B>,
        config: SupervisorConfig,
        now_ms: u32,
    ) -> Self {
        Self {
            finger,
            face,
            shared,
            config,
            phase: BootPhase::Settling {
                until: now_ms.wrapping_add(config.boot_delay_ms),
            },
            hold_until: None,
            report_sequence: 0,
        }
    }

    pub fn poll(&mut self, now_ms: u32) -> Vec<SupervisorEvent, MAX_EVENTS> {
        let mut events = Vec::new();

        self.finger.poll();
        self.face.poll(now_ms);

        match self.phase {
            BootPhase::Settling { until } => {
                if reached(now_ms, until) {
                    if let Err(err) = self.finger.get_user_count() {
                        warn!("supervisor: user count query failed: {}", err);
                    }
                    self.phase = BootPhase::AwaitingUserCount {
                        until: now_ms.wrapping_add(self.config.user_count_wait_ms),
                    };
                }
                return events;
            }
            BootPhase::AwaitingUserCount { until } => {
                if !reached(now_ms, until) {
                    return events;
                }
                info!("supervisor: ready, {} templates", self.finger.user_count());
                self.phase = BootPhase::Running;
                self.finger.resume_led();
                let _ = events.push(SupervisorEvent::Ready);
            }
            BootPhase::Running => {}
        }

        if self.handle_identify_success(now_ms) {
            let _ = events.push(SupervisorEvent::IdentifySuccess);
        }

        // The request stays latched until a pending identify resolves
        if !self.finger.is_identifying() && self.shared.status.take_finger_enroll() {
            if let Err(err) = self.finger.auto_enroll() {
                warn!("supervisor: finger enroll not started: {}", err);
            }
        }
        if self.shared.status.take_face_enroll() {
            if let Err(err) = self.face.enroll_interactive(now_ms) {
                warn!("supervisor: face enroll not started: {}", err);
            }
        }

        self.finger.set_light_mode(self.light_mode());

        if let Some(outcome) = self.finger.take_outcome() {
            if let Some(report) = self.report(report::SOURCE_FINGER, outcome) {
                let _ = events.push(SupervisorEvent::EnrollmentReported(report));
            }
        }
        if let Some(outcome) = self.face.take_outcome() {
            if let Some(report) = self.report(report::SOURCE_FACE, outcome) {
                let _ = events.push(SupervisorEvent::EnrollmentReported(report));
            }
        }

        events
    }

    /// Successes raised while a previous one is held are dropped
    fn handle_identify_success(&mut self, now_ms: u32) -> bool {
        if let Some(until) = self.hold_until {
            if !reached(now_ms, until) {
                return false;
            }
            self.hold_until = None;
            self.shared.signals.take_identify_success();
        }

        if !self.shared.signals.take_identify_success() {
            return false;
        }

        info!("supervisor: identify success");
        if self.shared.status.send_identify_success().is_err() {
            warn!("supervisor: identify notice not sent");
        }
        if let Err(err) = self.shared.request(Request::SuccessTone) {
            warn!("supervisor: {}", err);
        }
        self.finger.set_notice(LedNotice::Success);
        self.hold_until = Some(now_ms.wrapping_add(self.config.success_hold_ms));
        true
    }

    fn light_mode(&self) -> LightMode {
        match (self.shared.signals.human_present(), self.shared.status.is_day()) {
            (true, true) => LightMode::Day,
            (true, false) => LightMode::Night,
            (false, _) => LightMode::Off,
        }
    }

    fn report(&mut self, source: u8, outcome: WorkflowState) -> Option<StatusReport> {
        let outcome = match outcome {
            WorkflowState::Success => report::OUTCOME_SUCCESS,
            WorkflowState::Aborted => report::OUTCOME_ABORTED,
            WorkflowState::TimedOut => report::OUTCOME_TIMED_OUT,
            WorkflowState::Idle | WorkflowState::AwaitingResponse => return None,
        };

        let status_report = StatusReport::new(self.report_sequence, source, outcome);
        self.report_sequence = self.report_sequence.wrapping_add(1);
        if self.shared.status.send_status(status_report).is_err() {
            warn!("supervisor: enrollment report not sent");
        }
        Some(status_report)
    }

    pub fn is_ready(&self) -> bool {
        self.phase == BootPhase::Running
    }

    pub fn is_holding(&self) -> bool {
        self.hold_until.is_some()
    }

    pub fn finger(&self) -> &FingerEngine<'a, FS, B> {
        &self.finger
    }

    pub fn finger_mut(&mut self) -> &mut FingerEngine<'a, FS, B> {
        &mut self.finger
    }

    pub fn face(&self) -> &FaceEngine<'a, CS, B> {
        &self.face
    }

    pub fn face_mut(&mut self) -> &mut FaceEngine<'a, CS, B> {
        &mut self.face
    }
}
