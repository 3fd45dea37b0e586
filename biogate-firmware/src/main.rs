//! Biogate - Biometric Access-Control Endpoint Firmware
//!
//! Main firmware binary for STM32F103 boards. Drives a fingerprint module
//! (USART1) and a face recognition module (USART2) and reports to the
//! host over CAN.
//!
//! Pin map:
//! - PA9/PA10: USART1 TX/RX, fingerprint module
//! - PA2/PA3: USART2 TX/RX, face module
//! - PA12/PA11: CAN TX/RX
//! - PB0: face module presence output
//! - PB1: fingerprint module touch output

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::can::filter::Mask32;
use embassy_stm32::can::{self, Can, Fifo};
use embassy_stm32::exti::{self, ExtiInput};
use embassy_stm32::gpio::Pull;
use embassy_stm32::peripherals::{CAN, USART1, USART2};
use embassy_stm32::usart::{self, Uart};
use embassy_stm32::bind_interrupts;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use biogate_core::StatusChannel;
use biogate_drivers::{FaceEngine, FingerEngine, Shared, Supervisor};

use crate::channels::{FACE_TX, FINGER_TX};
use crate::config::{CAN_BITRATE, DEVICE_CONFIG};
use crate::io::{QueuedBus, QueuedSerial};
use crate::shared::{
    CAN_BUS, DAEMON, FACE_LINK, FACE_UART, FINGER_LINK, FINGER_UART, NOTICES, PRESENCE_PIN,
    REGISTRY, SIGNALS, TOUCH_PIN,
};

mod channels;
mod config;
mod io;
mod shared;
mod tasks;

bind_interrupts!(struct Irqs {
    USART1 => usart::InterruptHandler<USART1>;
    USART2 => usart::InterruptHandler<USART2>;
    USB_LP_CAN1_RX0 => can::Rx0InterruptHandler<CAN>;
    CAN1_RX1 => can::Rx1InterruptHandler<CAN>;
    CAN1_SCE => can::SceInterruptHandler<CAN>;
    USB_HP_CAN1_TX => can::TxInterruptHandler<CAN>;
    EXTI0 => exti::InterruptHandler<embassy_stm32::interrupt::typelevel::EXTI0>;
    EXTI1 => exti::InterruptHandler<embassy_stm32::interrupt::typelevel::EXTI1>;
});

/// Fingerprint module factory baud rate
const FINGER_BAUD: u32 = 57_600;

/// Face module baud rate
const FACE_BAUD: u32 = 115_200;

// The CAN driver disables the peripheral on drop, so it must live forever
static CAN_DRIVER: StaticCell<Can<'static>> = StaticCell::new();
static STATUS: StaticCell<StatusChannel<QueuedBus>> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Biogate firmware starting...");

    let p = embassy_stm32::init(Default::default());
    info!("Peripherals initialized");

    let config = DEVICE_CONFIG;

    // Fingerprint module UART
    let mut finger_uart_config = usart::Config::default();
    finger_uart_config.baudrate = FINGER_BAUD;
    let finger_uart = Uart::new(
        p.USART1,
        p.PA10, // RX
        p.PA9,  // TX
        Irqs,
        p.DMA1_CH4,
        p.DMA1_CH5,
        finger_uart_config,
    )
    .unwrap();
    let (finger_tx, finger_rx) = finger_uart.split();

    // Face module UART
    let mut face_uart_config = usart::Config::default();
    face_uart_config.baudrate = FACE_BAUD;
    let face_uart = Uart::new(
        p.USART2,
        p.PA3, // RX
        p.PA2, // TX
        Irqs,
        p.DMA1_CH7,
        p.DMA1_CH6,
        face_uart_config,
    )
    .unwrap();
    let (face_tx, face_rx) = face_uart.split();

    info!("UARTs initialized");

    // Host bus
    let can = CAN_DRIVER.init(Can::new(p.CAN, p.PA11, p.PA12, Irqs));
    can.modify_filters()
        .enable_bank(0, Fifo::Fifo0, Mask32::accept_all());
    can.modify_config().set_bitrate(CAN_BITRATE);
    can.enable().await;
    let (bus_tx, bus_rx) = can.split();

    info!("CAN initialized at {} bit/s", CAN_BITRATE);

    // Module output lines
    let presence = ExtiInput::new(p.PB0, p.EXTI0, Pull::Down, Irqs);
    let touch = ExtiInput::new(p.PB1, p.EXTI1, Pull::Down, Irqs);

    // Shared services and engines
    let status: &'static StatusChannel<QueuedBus> = STATUS.init(StatusChannel::new(
        QueuedBus::new(config.bus.request_id),
        config.bus,
    ));
    let shared = Shared {
        daemon: &DAEMON,
        status,
        signals: &SIGNALS,
        notices: &NOTICES,
    };

    let finger = unwrap!(FingerEngine::new(
        &FINGER_LINK,
        QueuedSerial::new(&FINGER_TX),
        shared,
        config.finger,
    ));
    let mut face = unwrap!(FaceEngine::new(
        &FACE_LINK,
        QueuedSerial::new(&FACE_TX),
        shared,
        config.face,
    ));
    face.bind_finger(&NOTICES);
    face.seed_names(board_seed());

    // Route peripheral events to their owners
    unwrap!(REGISTRY.register(FINGER_UART, &FINGER_LINK));
    unwrap!(REGISTRY.register(TOUCH_PIN, &FINGER_LINK));
    unwrap!(REGISTRY.register(FACE_UART, &FACE_LINK));
    unwrap!(REGISTRY.register(PRESENCE_PIN, &FACE_LINK));
    unwrap!(REGISTRY.register(
        biogate_core::PeripheralId::new(CAN_BUS, config.bus.status_update_id as u32),
        status,
    ));
    info!("{} peripheral bindings", REGISTRY.len());

    let supervisor = Supervisor::new(
        finger,
        face,
        shared,
        config.supervisor,
        tasks::tick::now_ms(),
    );

    // Spawn tasks
    spawner.spawn(tasks::tick_task(config.tick_ms)).unwrap();
    spawner.spawn(tasks::finger_rx_task(finger_rx)).unwrap();
    spawner.spawn(tasks::finger_tx_task(finger_tx)).unwrap();
    spawner.spawn(tasks::face_rx_task(face_rx)).unwrap();
    spawner.spawn(tasks::face_tx_task(face_tx)).unwrap();
    spawner.spawn(tasks::bus_rx_task(bus_rx)).unwrap();
    spawner.spawn(tasks::bus_tx_task(bus_tx)).unwrap();
    spawner.spawn(tasks::presence_task(presence)).unwrap();
    spawner.spawn(tasks::touch_task(touch)).unwrap();
    spawner.spawn(tasks::supervisor_task(supervisor)).unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Fold the 96-bit device id into a name seed
fn board_seed() -> u32 {
    embassy_stm32::uid::uid()
        .chunks(4)
        .fold(0u32, |seed, chunk| {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            seed.rotate_left(7) ^ u32::from_le_bytes(word)
        })
}
