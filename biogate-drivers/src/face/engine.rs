//! Face engine
//!
//! Verify is single-shot: one command, one reply. While someone stands in
//! front of the module the identify timer repeats the verify at the retry
//! period; when they leave it is paused.

use biogate_core::config::FaceConfig;
use biogate_core::{LedNotice, NoticeBoard, TaskId, Workflow, WorkflowState};
use biogate_hal::{BusTx, SerialTx, TransferMode};
use biogate_protocol::face::{cmd, note, EnrollParams, FaceState, UvcParams, VerifyParams};
use biogate_protocol::{FaceCommand, FaceReply, MessageClass, Request};

use super::enroll::{CaptureStatus, EnrollAction, EnrollSequence};
use super::FaceLink;
use crate::context::Shared;
use crate::error::EngineError;

/// Main-context driver of the face module
pub struct FaceEngine<'a, S, B> {
    link: &'a FaceLink<'a>,
    serial: S,
    shared: Shared<'a, B>,
    config: FaceConfig,
    /// Fingerprint LED notices, when bound
    finger: Option<&'a NoticeBoard>,

    identify_task: TaskId,
    workflow: Workflow,
    enroll: Option<EnrollSequence>,
    capture: CaptureStatus,
    init_finished: bool,
    face_state: FaceState,
    name_seed: u32,
}

impl<'a, S: SerialTx, B: BusTx> FaceEngine<'a, S, B> {
    pub fn new(
        link: &'a FaceLink<'a>,
        serial: S,
        shared: Shared<'a, B>,
        config: FaceConfig,
    ) -> Result<Self, EngineError> {
        let identify_task = shared.daemon.create_paused(config.identify_retry_ms)?;

        Ok(Self {
            link,
            serial,
            shared,
            config,
            finger: None,
            identify_task,
            workflow: Workflow::new(),
            enroll: None,
            capture: CaptureStatus::Pending,
            init_finished: false,
            face_state: FaceState::Idle,
            name_seed: 0x2545_F491,
        })
    }

    /// Route enrollment feedback to the fingerprint ring LED
    pub fn bind_finger(&mut self, notices: &'a NoticeBoard) {
        self.finger = Some(notices);
    }

    /// Mix board-unique entropy into generated user names
    pub fn seed_names(&mut self, seed: u32) {
        self.name_seed ^= seed;
    }

    /// Process pending replies, the enrollment sequence and identify requests
    pub fn poll(&mut self, now_ms: u32) {
        if let Some(frame) = self.link.rx.take() {
            if let Err(err) = self.decode(&frame) {
                debug!("face: reply dropped: {}", err);
            }
        }

        if let Some(sequence) = self.enroll.as_mut() {
            let action = sequence.step(now_ms, self.capture);
            if let Err(err) = self.perform(action) {
                warn!("face: enrollment step failed: {}", err);
            }
        }

        let retry = self.shared.daemon.take_fired(self.identify_task);
        if self.link.identify.take() || retry {
            if let Err(err) = self.identify() {
                warn!("face: verify failed: {}", err);
            }
        }
    }

    /// Verify whoever is in front of the module
    ///
    /// Keeps the retry timer running while presence is signalled. Returns
    /// false without sending while an enrollment is in flight.
    pub fn identify(&mut self) -> Result<bool, EngineError> {
        if self.shared.signals.human_present() {
            self.shared.daemon.resume(self.identify_task);
        } else {
            self.shared.daemon.pause(self.identify_task);
        }

        if self.workflow.is_in_flight() {
            return Ok(false);
        }

        let params = VerifyParams {
            timeout: self.config.verify_timeout_s,
            ..Default::default()
        };
        self.send_command(FaceCommand::Verify(params))?;
        Ok(true)
    }

    /// Start the five-direction enrollment
    pub fn enroll_interactive(&mut self, now_ms: u32) -> Result<(), EngineError> {
        if !self.workflow.begin() {
            return Err(EngineError::Busy);
        }

        self.name_seed = self
            .name_seed
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223)
            ^ now_ms;
        let params = EnrollParams::with_seed(self.name_seed);
        self.enroll = Some(EnrollSequence::new(now_ms, params, &self.config));
        self.capture = CaptureStatus::Pending;
        info!("face: enrollment started");
        Ok(())
    }

    fn perform(&mut self, action: EnrollAction) -> Result<(), EngineError> {
        match action {
            EnrollAction::Wait => Ok(()),
            EnrollAction::Prompt => self.shared.request(Request::EnrollPrompt),
            EnrollAction::StartCapture(params) => {
                debug!("face: capture direction {}", params.direction as u8);
                self.capture = CaptureStatus::Pending;
                self.shared.status.lock();
                self.send_command(FaceCommand::Enroll(params))
            }
            EnrollAction::CaptureAccepted => match self.finger {
                Some(notices) => {
                    notices.post(LedNotice::Success);
                    self.shared.request(Request::ShortPrompt)
                }
                None => Ok(()),
            },
            EnrollAction::Completed => {
                info!("face: enrollment complete");
                self.finish_enroll(WorkflowState::Success);
                self.shared.request(Request::LongPrompt)
            }
            EnrollAction::Failed => {
                warn!("face: enrollment aborted by module");
                self.finish_enroll(WorkflowState::Aborted);
                self.signal_failure()
            }
            EnrollAction::TimedOut => {
                warn!("face: enrollment capture timed out");
                self.finish_enroll(WorkflowState::TimedOut);
                let reset = self.reset();
                let failure = self.signal_failure();
                reset.and(failure)
            }
        }
    }

    fn finish_enroll(&mut self, outcome: WorkflowState) {
        self.enroll = None;
        self.capture = CaptureStatus::Pending;
        self.workflow.finish(outcome);
        self.shared.status.unlock();
    }

    fn signal_failure(&mut self) -> Result<(), EngineError> {
        match self.finger {
            Some(notices) => {
                notices.post(LedNotice::Wrong);
                self.shared.request(Request::WrongTone)
            }
            None => Ok(()),
        }
    }

    /// Validate a reply, note or image frame and act on it
    pub fn decode(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        let reply = FaceReply::parse(bytes)?;

        match reply.class {
            MessageClass::Image => Ok(()),
            MessageClass::Note => {
                if reply.sub_id == note::READY {
                    info!("face: module ready");
                    self.init_finished = true;
                }
                Ok(())
            }
            MessageClass::Reply => match reply.sub_id {
                cmd::GET_STATUS => {
                    if let Some(&state) = reply.data.first() {
                        self.face_state = FaceState::from_byte(state);
                    }
                    Ok(())
                }
                cmd::VERIFY => {
                    // A verify sent before the enrollment began resolves unseen
                    if self.workflow.is_in_flight() {
                        debug!("face: verify result {} ignored while enrolling", reply.result);
                    } else if reply.is_success() {
                        info!("face: match");
                        self.shared.signals.raise_identify_success();
                    }
                    Ok(())
                }
                cmd::ENROLL => {
                    if reply.is_success() {
                        self.capture = CaptureStatus::Succeeded;
                        Ok(())
                    } else {
                        debug!("face: enroll result {}", reply.result);
                        self.capture = CaptureStatus::Failed;
                        self.reset()
                    }
                }
                _ => Ok(()),
            },
        }
    }

    /// Frame and send a command
    pub fn send_command(&mut self, command: FaceCommand) -> Result<(), EngineError> {
        let frame = command.to_frame()?.encode_to_vec()?;
        self.serial
            .send(&frame, TransferMode::Dma)
            .map_err(|_| {
                warn!("face: serial send failed");
                EngineError::Transport
            })
    }

    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.send_command(FaceCommand::Reset)
    }

    pub fn get_status(&mut self) -> Result<(), EngineError> {
        self.send_command(FaceCommand::GetStatus)
    }

    pub fn delete_all(&mut self) -> Result<(), EngineError> {
        self.send_command(FaceCommand::DeleteAll)
    }

    pub fn set_uvc_params(&mut self, params: UvcParams) -> Result<(), EngineError> {
        self.send_command(FaceCommand::SetUvcParams(params))
    }

    pub fn is_init_finished(&self) -> bool {
        self.init_finished
    }

    pub fn face_state(&self) -> FaceState {
        self.face_state
    }

    pub fn is_enrolling(&self) -> bool {
        self.workflow.is_in_flight()
    }

    pub fn workflow_state(&self) -> WorkflowState {
        self.workflow.state()
    }

    pub fn take_outcome(&mut self) -> Option<WorkflowState> {
        self.workflow.take_outcome()
    }

    /// Index of the direction being captured or settled
    pub fn enroll_direction(&self) -> Option<usize> {
        self.enroll.as_ref().and_then(EnrollSequence::direction_index)
    }

    pub fn is_identify_timer_running(&self) -> bool {
        !self.shared.daemon.is_paused(self.identify_task)
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biogate_core::config::BusConfig;
    use biogate_core::{Daemon, EventSink, PeripheralEvent, SharedSignals, StatusChannel};
    use biogate_protocol::face::{parity, MAX_FRAME_SIZE};
    use heapless::Vec;

    #[derive(Default)]
    struct Serial {
        ids: Vec<u8, 16>,
    }

    impl SerialTx for Serial {
        type Error = ();

        fn send(&mut self, data: &[u8], _mode: TransferMode) -> Result<(), ()> {
            self.ids.push(data[2]).map_err(|_| ())
        }
    }

    struct Bus;

    impl BusTx for Bus {
        type Error = ();

        fn transmit(&mut self, _data: &[u8], _id: Option<u16>) -> Result<(), ()> {
            Ok(())
        }
    }

    fn reply(class: u8, body: &[u8]) -> Vec<u8, MAX_FRAME_SIZE> {
        let mut frame: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
        frame.extend_from_slice(&[0xEF, 0xAA, class]).unwrap();
        frame
            .extend_from_slice(&(body.len() as u16).to_be_bytes())
            .unwrap();
        frame.extend_from_slice(body).unwrap();
        let p = parity(&frame[2..]);
        frame.push(p).unwrap();
        frame
    }

    #[test]
    fn test_ready_note_and_status() {
        let signals = SharedSignals::new();
        let link = FaceLink::new(&signals);
        let daemon: Daemon = Daemon::new();
        let status = StatusChannel::new(Bus, BusConfig::default());
        let notices = NoticeBoard::new();
        let shared = Shared {
            daemon: &daemon,
            status: &status,
            signals: &signals,
            notices: &notices,
        };
        let mut engine =
            FaceEngine::new(&link, Serial::default(), shared, FaceConfig::default()).unwrap();

        engine.decode(&reply(1, &[note::READY])).unwrap();
        assert!(engine.is_init_finished());

        engine.decode(&reply(0, &[cmd::GET_STATUS, 0x00, 0x01])).unwrap();
        assert_eq!(engine.face_state(), FaceState::Busy);

        // Image frames are ignored
        engine.decode(&reply(2, &[0x00, 0x00, 0xAB])).unwrap();
    }

    #[test]
    fn test_presence_drives_identify_timer() {
        let signals = SharedSignals::new();
        let link = FaceLink::new(&signals);
        let daemon: Daemon = Daemon::new();
        let status = StatusChannel::new(Bus, BusConfig::default());
        let notices = NoticeBoard::new();
        let shared = Shared {
            daemon: &daemon,
            status: &status,
            signals: &signals,
            notices: &notices,
        };
        let mut engine =
            FaceEngine::new(&link, Serial::default(), shared, FaceConfig::default()).unwrap();

        link.on_event(PeripheralEvent::Level(true));
        engine.poll(0);
        assert!(engine.is_identify_timer_running());
        assert_eq!(&engine.serial().ids[..], &[cmd::VERIFY]);

        daemon.service_all(21_000);
        engine.poll(21_000);
        assert_eq!(engine.serial().ids.len(), 2);

        link.on_event(PeripheralEvent::Level(false));
        daemon.service_all(42_000);
        engine.poll(42_000);
        assert!(!engine.is_identify_timer_running());
    }

    #[test]
    fn test_failed_enroll_reply_resets_module() {
        let signals = SharedSignals::new();
        let link = FaceLink::new(&signals);
        let daemon: Daemon = Daemon::new();
        let status = StatusChannel::new(Bus, BusConfig::default());
        let notices = NoticeBoard::new();
        let shared = Shared {
            daemon: &daemon,
            status: &status,
            signals: &signals,
            notices: &notices,
        };
        let mut engine =
            FaceEngine::new(&link, Serial::default(), shared, FaceConfig::default()).unwrap();

        engine.decode(&reply(0, &[cmd::ENROLL, 0x0A])).unwrap();
        assert_eq!(&engine.serial().ids[..], &[cmd::RESET]);
    }

    #[test]
    fn test_verify_reply_ignored_while_enrolling() {
        let signals = SharedSignals::new();
        let link = FaceLink::new(&signals);
        let daemon: Daemon = Daemon::new();
        let status = StatusChannel::new(Bus, BusConfig::default());
        let notices = NoticeBoard::new();
        let shared = Shared {
            daemon: &daemon,
            status: &status,
            signals: &signals,
            notices: &notices,
        };
        let mut engine =
            FaceEngine::new(&link, Serial::default(), shared, FaceConfig::default()).unwrap();

        assert!(engine.identify().unwrap());
        engine.enroll_interactive(0).unwrap();
        engine.poll(2_500);
        engine.poll(3_000);
        assert_eq!(engine.enroll_direction(), Some(0));

        engine.decode(&reply(0, &[cmd::VERIFY, 0x00, 0x00, 0x01])).unwrap();
        assert!(!signals.take_identify_success());
        assert!(engine.is_enrolling());

        // Matches count again once the enrollment has resolved
        engine.decode(&reply(0, &[cmd::ENROLL, 0x0A])).unwrap();
        engine.poll(3_100);
        assert!(!engine.is_enrolling());
        engine.decode(&reply(0, &[cmd::VERIFY, 0x00, 0x00, 0x01])).unwrap();
        assert!(signals.take_identify_success());
    }
}
