//! Embassy async tasks
//!
//! Receive tasks stand in for the interrupt side: they copy what arrived
//! and dispatch it through the registry. The supervisor task is the main
//! polling context.

pub mod bus;
pub mod input;
pub mod serial;
pub mod supervisor;
pub mod tick;

pub use bus::{bus_rx_task, bus_tx_task};
pub use input::{presence_task, touch_task};
pub use serial::{face_rx_task, face_tx_task, finger_rx_task, finger_tx_task};
pub use supervisor::{supervisor_task, BoardSupervisor, FaceSerial, FingerSerial};
pub use tick::tick_task;
