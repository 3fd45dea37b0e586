//! Property-based tests for the soft-timer scheduler.
//!
//! A running task is driven by a random sequence of tick advances and the
//! observed fires are checked against the period contract.

use biogate_core::Daemon;
use proptest::prelude::*;

/// Tick advances between services, in ms
fn advances() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..250, 1..64)
}

proptest! {
    /// Never fires before `period` since the last fire, at most once per service
    #[test]
    fn prop_fires_respect_period(
        period in 1u32..200,
        start in any::<u32>(),
        steps in advances(),
    ) {
        let daemon: Daemon<4> = Daemon::new();
        daemon.service_all(start);
        let task = daemon.create(period).unwrap();

        let mut now = start;
        let mut last_fire = start;
        for step in steps {
            now = now.wrapping_add(step);
            let fired = daemon.service_all(now);
            prop_assert!(fired.len() <= 1);

            let due = now.wrapping_sub(last_fire) >= period;
            prop_assert_eq!(fired.len() == 1, due);
            prop_assert_eq!(daemon.take_fired(task), due);
            if due {
                last_fire = now;
            }
        }
    }

    /// A paused task never fires, whatever the elapsed time
    #[test]
    fn prop_paused_never_fires(period in 0u32..200, steps in advances()) {
        let daemon: Daemon<4> = Daemon::new();
        let task = daemon.create(period).unwrap();
        daemon.pause(task);

        let mut now = 0u32;
        for step in steps {
            now = now.wrapping_add(step);
            prop_assert!(daemon.service_all(now).is_empty());
            prop_assert!(!daemon.take_fired(task));
        }
    }

    /// Resume restarts the period from the latest service time
    #[test]
    fn prop_resume_reloads(period in 2u32..200, idle in 0u32..10_000, early in 1u32..200) {
        let daemon: Daemon<4> = Daemon::new();
        let task = daemon.create_paused(period).unwrap();

        daemon.service_all(idle);
        daemon.resume(task);

        let early = early.min(period - 1);
        prop_assert!(daemon.service_all(idle + early).is_empty());
        prop_assert_eq!(daemon.service_all(idle + period).len(), 1);
    }
}
