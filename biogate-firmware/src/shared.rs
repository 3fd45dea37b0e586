//! Process-wide services and peripheral identities
//!
//! These live for the whole program; the receive tasks reach the owning
//! component through [`REGISTRY`].

use biogate_core::{Daemon, NoticeBoard, PeripheralId, Registry, SharedSignals};
use biogate_drivers::{FaceLink, FingerLink};

/// USART1, fingerprint module
pub const FINGER_UART: PeripheralId = PeripheralId::new(1, 0);

/// USART2, face module
pub const FACE_UART: PeripheralId = PeripheralId::new(2, 0);

/// bxCAN; the address is the standard frame id
pub const CAN_BUS: u8 = 3;

/// GPIO port B edge lines; the address is the pin number
pub const EXTI_PORT_B: u8 = 4;

/// PB0, face module human-presence output
pub const PRESENCE_PIN: PeripheralId = PeripheralId::new(EXTI_PORT_B, 0);

/// PB1, fingerprint module touch output
pub const TOUCH_PIN: PeripheralId = PeripheralId::new(EXTI_PORT_B, 1);

pub static REGISTRY: Registry<'static> = Registry::new();
pub static DAEMON: Daemon = Daemon::new();
pub static SIGNALS: SharedSignals = SharedSignals::new();

/// Fingerprint LED notices, posted by the face engine too
pub static NOTICES: NoticeBoard = NoticeBoard::new();

pub static FINGER_LINK: FingerLink = FingerLink::new();
pub static FACE_LINK: FaceLink<'static> = FaceLink::new(&SIGNALS);
