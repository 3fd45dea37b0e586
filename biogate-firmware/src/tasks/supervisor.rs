//! Main polling context

use biogate_drivers::{Supervisor, SupervisorEvent};
use biogate_protocol::{face, finger};
use defmt::*;

use crate::channels::TICK_SIGNAL;
use crate::io::{QueuedBus, QueuedSerial};

pub type FingerSerial = QueuedSerial<{ finger::MAX_FRAME_SIZE }>;
pub type FaceSerial = QueuedSerial<{ face::MAX_FRAME_SIZE }>;
pub type BoardSupervisor = Supervisor<'static, FingerSerial, FaceSerial, QueuedBus>;

/// Poll once per daemon tick
#[embassy_executor::task]
pub async fn supervisor_task(mut supervisor: BoardSupervisor) {
    info!("Supervisor task started");

    loop {
        let now = TICK_SIGNAL.wait().await;

        for event in supervisor.poll(now) {
            match event {
                SupervisorEvent::Ready => {
                    info!("Ready, {} fingerprint templates", supervisor.finger().user_count());
                }
                SupervisorEvent::IdentifySuccess => info!("Access granted"),
                SupervisorEvent::EnrollmentReported(report) => {
                    info!("Enrollment report seq {} status 0x{:02x}", report.sequence, report.status);
                }
            }
        }
    }
}
