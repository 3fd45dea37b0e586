//! Fingerprint engine
//!
//! Tracks one outstanding command at a time and routes each acknowledge by
//! it. LED control frames are fire-and-forget and never replace the
//! outstanding command.
//!
//! Timers (all daemon tasks owned by the engine):
//! - LED: paces the notification machine
//! - gate: re-opens identify after the verify gate period
//! - enroll: fallback that abandons a stuck enrollment

use biogate_core::config::FingerConfig;
use biogate_core::{LedNotice, TaskId, Workflow, WorkflowState};
use biogate_hal::{BusTx, SerialTx, TransferMode};
use biogate_protocol::finger::{
    cmd, stage, AutoEnrollParams, AutoIdentifyParams, LedParams,
};
use biogate_protocol::{FingerCommand, FingerReply, Request};

use super::led::{LedMachine, LightMode};
use super::FingerLink;
use crate::context::Shared;
use crate::error::EngineError;

/// Main-context driver of the fingerprint module
pub struct FingerEngine<'a, S, B> {
    link: &'a FingerLink,
    serial: S,
    shared: Shared<'a, B>,
    config: FingerConfig,

    led_task: TaskId,
    gate_task: TaskId,
    enroll_task: TaskId,

    /// Command code awaiting its acknowledge, 0 when none
    waiting_command: u8,
    user_count: u8,
    captures_remaining: u8,
    allow_verify: bool,
    workflow: Workflow,
    led: LedMachine,
}

impl<'a, S: SerialTx, B: BusTx> FingerEngine<'a, S, B> {
    /// Create the engine and its timers
    pub fn new(
        link: &'a FingerLink,
        serial: S,
        shared: Shared<'a, B>,
        config: FingerConfig,
    ) -> Result<Self, EngineError> {
        let led_task = shared.daemon.create_paused(config.led_idle_ms)?;
        let gate_task = shared.daemon.create(config.verify_gate_ms)?;
        let enroll_task = shared.daemon.create_paused(config.enroll_timeout_ms)?;

        Ok(Self {
            link,
            serial,
            shared,
            config,
            led_task,
            gate_task,
            enroll_task,
            waiting_command: 0,
            user_count: 0,
            captures_remaining: 0,
            allow_verify: true,
            workflow: Workflow::new(),
            led: LedMachine::new(),
        })
    }

    /// Process pending replies, timers and touch requests
    ///
    /// A pending reply is decoded first so an enrollment's progress is never
    /// delayed behind identify handling.
    pub fn poll(&mut self) {
        if let Some(frame) = self.link.rx.take() {
            if let Err(err) = self.decode(&frame) {
                debug!("finger: reply dropped: {}", err);
            }
        }

        if let Some(notice) = self.shared.notices.take() {
            self.set_notice(notice);
        }

        if self.shared.daemon.take_fired(self.gate_task) {
            self.allow_verify = true;
        }

        if self.shared.daemon.take_fired(self.enroll_task) {
            warn!("finger: enrollment timed out");
            if let Err(err) = self.abort_enroll(WorkflowState::TimedOut) {
                warn!("finger: {}", err);
            }
        }

        if self.shared.daemon.take_fired(self.led_task) {
            let step = self.led.step(&self.config);
            self.shared.daemon.set_period(self.led_task, step.next_period_ms);
            if let Err(err) = self.send_command(FingerCommand::LedControl(step.params)) {
                warn!("finger: LED update failed: {}", err);
            }
        }

        if self.link.touch.take() {
            if let Err(err) = self.identify() {
                warn!("finger: identify failed: {}", err);
            }
        }
    }

    /// Start an auto-identify
    ///
    /// Returns false without sending while enrolling or while the verify
    /// gate is closed.
    pub fn identify(&mut self) -> Result<bool, EngineError> {
        if self.workflow.is_in_flight() || !self.allow_verify {
            return Ok(false);
        }

        let params = AutoIdentifyParams {
            score_threshold: self.config.score_threshold,
            ..Default::default()
        };
        self.allow_verify = false;
        self.shared.daemon.reload(self.gate_task);
        self.send_command(FingerCommand::AutoIdentify(params))?;
        Ok(true)
    }

    /// Start a multi-capture enrollment into the next free template slot
    ///
    /// Refused while an auto-identify awaits its result; the acknowledge
    /// would otherwise be routed into the enrollment.
    pub fn auto_enroll(&mut self) -> Result<(), EngineError> {
        if self.is_identifying() || !self.workflow.begin() {
            return Err(EngineError::Busy);
        }

        self.shared.daemon.pause(self.led_task);
        self.user_count = self.user_count.wrapping_add(1);
        self.captures_remaining = self.config.enroll_captures;
        self.shared.status.lock();
        self.shared.daemon.resume(self.enroll_task);
        info!(
            "finger: enrolling template {} ({} captures)",
            self.user_count,
            self.captures_remaining
        );

        let params = AutoEnrollParams {
            id: self.user_count as u16,
            times: self.config.enroll_captures,
            ..Default::default()
        };
        let prompt = self.shared.request(Request::EnrollPrompt);
        self.send_command(FingerCommand::LedControl(LedParams::off()))?;
        self.send_command(FingerCommand::AutoEnroll(params))?;
        prompt
    }

    /// Validate an acknowledge and route it by the outstanding command
    pub fn decode(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        let reply = match FingerReply::parse(bytes, self.config.address) {
            Ok(reply) => reply,
            Err(err) => {
                // An enrollment keeps waiting; its fallback timer resolves it
                if !self.workflow.is_in_flight() {
                    self.waiting_command = 0;
                }
                return Err(err.into());
            }
        };

        match self.waiting_command {
            cmd::AUTO_IDENTIFY => self.on_identify_reply(&reply),
            cmd::AUTO_ENROLL => self.on_enroll_reply(&reply),
            cmd::GET_USER_COUNT => {
                if let Some(&count) = reply.data.get(1) {
                    self.user_count = count;
                    debug!("finger: {} templates enrolled", count);
                }
                self.waiting_command = 0;
                Ok(())
            }
            _ => {
                if !reply.is_ok() {
                    debug!(
                        "finger: command {} failed with status {}",
                        self.waiting_command,
                        reply.status
                    );
                }
                self.waiting_command = 0;
                Ok(())
            }
        }
    }

    fn on_identify_reply(&mut self, reply: &FingerReply) -> Result<(), EngineError> {
        if reply.stage() != stage::IDENTIFY_RESULT {
            return Ok(());
        }
        self.waiting_command = 0;

        if reply.is_ok() {
            info!("finger: match");
            self.shared.signals.raise_identify_success();
            Ok(())
        } else {
            debug!("finger: no match (status {})", reply.status);
            self.set_notice(LedNotice::Wrong);
            self.shared.request(Request::WrongTone)
        }
    }

    fn on_enroll_reply(&mut self, reply: &FingerReply) -> Result<(), EngineError> {
        if !reply.is_ok() {
            warn!("finger: enrollment failed with status {}", reply.status);
            return self.abort_enroll(WorkflowState::Aborted);
        }

        match reply.stage() {
            stage::ENROLL_CAPTURE => {
                self.captures_remaining = self.captures_remaining.saturating_sub(1);
                self.shared.request(Request::ShortPrompt)
            }
            stage::ENROLL_FINAL if self.captures_remaining == 1 => self.complete_enroll(),
            _ => Ok(()),
        }
    }

    fn complete_enroll(&mut self) -> Result<(), EngineError> {
        info!("finger: template {} enrolled", self.user_count);
        self.captures_remaining = 0;
        self.workflow.finish(WorkflowState::Success);
        self.shared.status.unlock();
        self.shared.daemon.pause(self.enroll_task);
        self.waiting_command = 0;
        self.set_notice(LedNotice::Success);
        self.shared.request(Request::LongPrompt)
    }

    fn abort_enroll(&mut self, outcome: WorkflowState) -> Result<(), EngineError> {
        self.captures_remaining = 0;
        self.workflow.finish(outcome);
        self.shared.status.unlock();
        self.shared.daemon.pause(self.enroll_task);
        self.waiting_command = 0;
        self.set_notice(LedNotice::Wrong);
        self.shared.request(Request::WrongTone)
    }

    /// Show a transient LED notice, then revert to breathing
    pub fn set_notice(&mut self, notice: LedNotice) {
        self.led.set_notice(notice);
        self.shared
            .daemon
            .set_period(self.led_task, self.config.led_notice_ms);
        self.shared.daemon.resume(self.led_task);
    }

    pub fn set_light_mode(&mut self, mode: LightMode) {
        self.led.set_light_mode(mode);
    }

    pub fn light_mode(&self) -> LightMode {
        self.led.light_mode()
    }

    /// Start the LED animation
    pub fn resume_led(&mut self) {
        self.shared.daemon.resume(self.led_task);
    }

    /// Frame and send a command
    pub fn send_command(&mut self, command: FingerCommand) -> Result<(), EngineError> {
        let frame = command.to_frame(self.config.address)?.encode_to_vec()?;
        if !matches!(command, FingerCommand::LedControl(_)) {
            self.waiting_command = command.code();
        }
        self.serial
            .send(&frame, TransferMode::Dma)
            .map_err(|_| {
                warn!("finger: serial send failed");
                EngineError::Transport
            })
    }

    pub fn get_user_count(&mut self) -> Result<(), EngineError> {
        self.send_command(FingerCommand::GetUserCount)
    }

    pub fn verify_password(&mut self) -> Result<(), EngineError> {
        self.send_command(FingerCommand::VerifyPassword(self.config.password))
    }

    pub fn set_password(&mut self, password: u32) -> Result<(), EngineError> {
        self.send_command(FingerCommand::SetPassword(password))
    }

    pub fn set_chip_address(&mut self, address: u32) -> Result<(), EngineError> {
        self.send_command(FingerCommand::SetChipAddress(address))
    }

    pub fn led_control(&mut self, params: LedParams) -> Result<(), EngineError> {
        self.send_command(FingerCommand::LedControl(params))
    }

    pub fn delete_all(&mut self) -> Result<(), EngineError> {
        self.send_command(FingerCommand::DeleteAll)
    }

    pub fn handshake(&mut self) -> Result<(), EngineError> {
        self.send_command(FingerCommand::Handshake)
    }

    pub fn sleep(&mut self) -> Result<(), EngineError> {
        self.send_command(FingerCommand::Sleep)
    }

    /// No acknowledge outstanding
    pub fn is_received(&self) -> bool {
        self.waiting_command == 0
    }

    /// An auto-identify has been sent and its result is still pending
    pub fn is_identifying(&self) -> bool {
        self.waiting_command == cmd::AUTO_IDENTIFY
    }

    pub fn waiting_command(&self) -> u8 {
        self.waiting_command
    }

    pub fn user_count(&self) -> u8 {
        self.user_count
    }

    pub fn captures_remaining(&self) -> u8 {
        self.captures_remaining
    }

    pub fn can_identify(&self) -> bool {
        self.allow_verify && !self.workflow.is_in_flight()
    }

    pub fn is_enrolling(&self) -> bool {
        self.workflow.is_in_flight()
    }

    pub fn workflow_state(&self) -> WorkflowState {
        self.workflow.state()
    }

    /// Consume the outcome of a finished enrollment
    pub fn take_outcome(&mut self) -> Option<WorkflowState> {
        self.workflow.take_outcome()
    }

    pub fn led_notice(&self) -> LedNotice {
        self.led.notice()
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
    use biogate_core::{Daemon, NoticeBoard, SharedSignals, StatusChannel};
    use biogate_protocol::finger::{checksum, DEFAULT_ADDRESS, MAX_FRAME_SIZE, PID_ACK};
    use heapless::Vec;

    #[derive(Default)]
    struct Serial {
        frames: Vec<Vec<u8, MAX_FRAME_SIZE>, 16>,
    }

    impl SerialTx for Serial {
        type Error = ();

        fn send(&mut self, data: &[u8], _mode: TransferMode) -> Result<(), ()> {
            let mut frame = Vec::new();
            frame.extend_from_slice(data).map_err(|_| ())?;
            self.frames.push(frame).map_err(|_| ())
        }
    }

    #[derive(Default)]
    struct Bus {
        requests: Vec<u8, 16>,
    }

    impl BusTx for Bus {
        type Error = ();

        fn transmit(&mut self, data: &[u8], _id: Option<u16>) -> Result<(), ()> {
            self.requests.push(data[0]).map_err(|_| ())
        }
    }

    fn ack(status: u8, data: &[u8]) -> Vec<u8, MAX_FRAME_SIZE> {
        let mut frame: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
        frame.extend_from_slice(&[0xEF, 0x01]).unwrap();
        frame.extend_from_slice(&DEFAULT_ADDRESS.to_be_bytes()).unwrap();
        frame.push(PID_ACK).unwrap();
        frame
            .extend_from_slice(&((data.len() + 3) as u16).to_be_bytes())
            .unwrap();
        frame.push(status).unwrap();
        frame.extend_from_slice(data).unwrap();
        let sum = checksum(&frame[6..]);
        frame.extend_from_slice(&sum.to_be_bytes()).unwrap();
        frame
    }

    struct Fixture {
        link: FingerLink,
        daemon: Daemon,
        status: StatusChannel<Bus>,
        signals: SharedSignals,
        notices: NoticeBoard,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                link: FingerLink::new(),
                daemon: Daemon::new(),
                status: StatusChannel::new(Bus::default(), BusConfig::default()),
                signals: SharedSignals::new(),
                notices: NoticeBoard::new(),
            }
        }

        fn engine(&self) -> FingerEngine<'_, Serial, Bus> {
            let shared = Shared {
                daemon: &self.daemon,
                status: &self.status,
                signals: &self.signals,
                notices: &self.notices,
            };
            FingerEngine::new(&self.link, Serial::default(), shared, FingerConfig::default())
                .unwrap()
        }
    }

    #[test]
    fn test_user_count_reply() {
        let fixture = Fixture::new();
        let mut engine = fixture.engine();

        engine.get_user_count().unwrap();
        assert_eq!(engine.waiting_command(), cmd::GET_USER_COUNT);
        engine.decode(&ack(0x00, &[0x00, 0x07])).unwrap();

        assert_eq!(engine.user_count(), 7);
        assert!(engine.is_received());
    }

    #[test]
    fn test_identify_gate() {
        let fixture = Fixture::new();
        let mut engine = fixture.engine();

        assert!(engine.identify().unwrap());
        assert!(!engine.identify().unwrap());
        assert_eq!(engine.serial().frames.len(), 1);

        fixture.daemon.service_all(1000);
        engine.poll();
        assert!(engine.can_identify());
    }

    #[test]
    fn test_identify_match_raises_success() {
        let fixture = Fixture::new();
        let mut engine = fixture.engine();

        engine.identify().unwrap();
        engine.decode(&ack(0x00, &[stage::IDENTIFY_RESULT, 0x00, 0x01])).unwrap();

        assert!(fixture.signals.take_identify_success());
        assert!(engine.is_received());
    }

    #[test]
    fn test_led_frames_do_not_replace_outstanding() {
        let fixture = Fixture::new();
        let mut engine = fixture.engine();

        engine.identify().unwrap();
        engine.led_control(LedParams::off()).unwrap();
        assert_eq!(engine.waiting_command(), cmd::AUTO_IDENTIFY);
    }

    #[test]
    fn test_enroll_rejected_while_in_flight() {
        let fixture = Fixture::new();
        let mut engine = fixture.engine();

        engine.auto_enroll().unwrap();
        assert_eq!(engine.auto_enroll(), Err(EngineError::Busy));
        assert!(fixture.status.is_locked());
        assert!(!engine.identify().unwrap());
    }

    #[test]
    fn test_bad_frame_clears_outstanding_when_idle() {
        let fixture = Fixture::new();
        let mut engine = fixture.engine();

        engine.handshake().unwrap();
        let mut frame = ack(0x00, &[]);
        frame[0] = 0x00;
        assert!(engine.decode(&frame).is_err());
        assert!(engine.is_received());
    }
}
