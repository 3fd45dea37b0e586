//! Daemon tick
//!
//! Services every soft timer, then wakes the supervisor with the same
//! timestamp.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};

use crate::channels::TICK_SIGNAL;
use crate::shared::DAEMON;

/// Milliseconds since boot, wrapping
pub fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}

#[embassy_executor::task]
pub async fn tick_task(tick_ms: u32) {
    info!("Tick task started ({} ms)", tick_ms);

    let mut ticker = Ticker::every(Duration::from_millis(tick_ms as u64));

    loop {
        ticker.next().await;

        let now = now_ms();
        for task in DAEMON.service_all(now) {
            trace!("daemon task {} fired", task.index());
        }

        TICK_SIGNAL.signal(now);
    }
}
