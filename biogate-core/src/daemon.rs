//! Soft-timer scheduler ("daemon")
//!
//! A fixed table of periodic tasks serviced by a single hardware tick. The
//! tick calls [`Daemon::service_all`], which latches a fired flag on every
//! due task; the owning component consumes the latch from its main-context
//! poll with [`Daemon::take_fired`].
//!
//! Time is a wrapping millisecond counter. A task fires when
//! `now - last_fire >= period` and it is running. There is no catch-up: a
//! late tick fires each due task once.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Vec;

/// Table size
pub const DAEMON_CAPACITY: usize = 25;

/// Scheduler errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DaemonError {
    /// Every slot is taken
    Full,
}

/// True once the wrapping clock `now_ms` has reached `deadline_ms`
///
/// Valid while the two are less than half the counter range apart.
pub fn reached(now_ms: u32, deadline_ms: u32) -> bool {
    (now_ms.wrapping_sub(deadline_ms) as i32) >= 0
}

/// Task handle
///
/// Carries the slot generation, so a handle outliving [`Daemon::remove`]
/// never reaches a task created later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId {
    slot: u8,
    generation: u8,
}

impl TaskId {
    pub fn index(&self) -> usize {
        self.slot as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy)]
struct Task {
    period_ms: u32,
    last_fire_ms: u32,
    state: TaskState,
    fired: bool,
}

struct Table<const N: usize> {
    tasks: [Option<Task>; N],
    /// Bumped each time a slot is freed
    generations: [u8; N],
    /// Timestamp of the most recent service
    now_ms: u32,
    /// Hardware tick enabled
    active: bool,
}

impl<const N: usize> Table<N> {
    fn id(&self, slot: usize) -> TaskId {
        TaskId {
            slot: slot as u8,
            generation: self.generations[slot],
        }
    }

    fn get(&self, id: TaskId) -> Option<&Task> {
        let slot = id.index();
        if self.generations.get(slot) != Some(&id.generation) {
            return None;
        }
        self.tasks[slot].as_ref()
    }

    fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        let slot = id.index();
        if self.generations.get(slot) != Some(&id.generation) {
            return None;
        }
        self.tasks[slot].as_mut()
    }
}

/// Periodic task table
pub struct Daemon<const N: usize = DAEMON_CAPACITY> {
    table: Mutex<RefCell<Table<N>>>,
}

impl<const N: usize> Default for Daemon<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Daemon<N> {
    pub const fn new() -> Self {
        Self {
            table: Mutex::new(RefCell::new(Table {
                tasks: [None; N],
                generations: [0; N],
                now_ms: 0,
                active: true,
            })),
        }
    }

    /// Create a running task
    pub fn create(&self, period_ms: u32) -> Result<TaskId, DaemonError> {
        self.insert(period_ms, TaskState::Running)
    }

    /// Create a paused task
    pub fn create_paused(&self, period_ms: u32) -> Result<TaskId, DaemonError> {
        self.insert(period_ms, TaskState::Paused)
    }

    fn insert(&self, period_ms: u32, state: TaskState) -> Result<TaskId, DaemonError> {
        critical_section::with(|cs| {
            let mut table = self.table.borrow_ref_mut(cs);
            let now_ms = table.now_ms;
            let slot = table
                .tasks
                .iter()
                .position(Option::is_none)
                .ok_or(DaemonError::Full)?;
            table.tasks[slot] = Some(Task {
                period_ms,
                last_fire_ms: now_ms,
                state,
                fired: false,
            });
            Ok(table.id(slot))
        })
    }

    /// Free a task slot; the handle goes stale
    pub fn remove(&self, task: TaskId) {
        critical_section::with(|cs| {
            let mut table = self.table.borrow_ref_mut(cs);
            if table.get(task).is_some() {
                let slot = task.index();
                table.tasks[slot] = None;
                let generation = &mut table.generations[slot];
                *generation = generation.wrapping_add(1);
            }
        })
    }

    /// Stop firing; a latched but unconsumed fire is discarded
    pub fn pause(&self, task: TaskId) {
        self.update(task, |task, _| {
            task.state = TaskState::Paused;
            task.fired = false;
        });
    }

    /// Start firing again, counting the period from now
    pub fn resume(&self, task: TaskId) {
        self.update(task, |task, now_ms| {
            task.state = TaskState::Running;
            task.last_fire_ms = now_ms;
        });
    }

    /// Restart the current period from now
    pub fn reload(&self, task: TaskId) {
        self.update(task, |task, now_ms| task.last_fire_ms = now_ms);
    }

    pub fn set_period(&self, task: TaskId, period_ms: u32) {
        self.update(task, |task, _| task.period_ms = period_ms);
    }

    fn update(&self, task: TaskId, f: impl FnOnce(&mut Task, u32)) {
        critical_section::with(|cs| {
            let mut table = self.table.borrow_ref_mut(cs);
            let now_ms = table.now_ms;
            if let Some(task) = table.get_mut(task) {
                f(task, now_ms);
            }
        })
    }

    pub fn period(&self, task: TaskId) -> Option<u32> {
        self.read(task, |task| task.period_ms)
    }

    pub fn is_paused(&self, task: TaskId) -> bool {
        self.read(task, |task| task.state == TaskState::Paused)
            .unwrap_or(true)
    }

    fn read<T>(&self, task: TaskId, f: impl FnOnce(&Task) -> T) -> Option<T> {
        critical_section::with(|cs| {
            self.table.borrow_ref(cs).get(task).map(f)
        })
    }

    /// Service every task once; called from the tick
    ///
    /// Returns the tasks that fired, in slot order. Does nothing while the
    /// tick is halted.
    pub fn service_all(&self, now_ms: u32) -> Vec<TaskId, N> {
        let mut fired = Vec::new();
        critical_section::with(|cs| {
            let mut table = self.table.borrow_ref_mut(cs);
            if !table.active {
                return;
            }
            table.now_ms = now_ms;

            for index in 0..N {
                let Some(task) = table.tasks[index].as_mut() else { continue };
                if task.state != TaskState::Running {
                    continue;
                }
                if now_ms.wrapping_sub(task.last_fire_ms) >= task.period_ms {
                    task.last_fire_ms = now_ms;
                    task.fired = true;
                    // Capacity is N, one entry per slot
                    let _ = fired.push(table.id(index));
                }
            }
        });
        fired
    }

    /// Consume a latched fire
    pub fn take_fired(&self, task: TaskId) -> bool {
        critical_section::with(|cs| {
            match self.table.borrow_ref_mut(cs).get_mut(task) {
                Some(task) => core::mem::replace(&mut task.fired, false),
                None => false,
            }
        })
    }

    /// Timestamp of the most recent service
    pub fn now(&self) -> u32 {
        critical_section::with(|cs| self.table.borrow_ref(cs).now_ms)
    }

    /// Disable the tick; every timer freezes
    pub fn halt(&self) {
        critical_section::with(|cs| self.table.borrow_ref_mut(cs).active = false);
        debug!("daemon halted");
    }

    /// Re-enable the tick
    pub fn start(&self) {
        critical_section::with(|cs| self.table.borrow_ref_mut(cs).active = true);
        debug!("daemon started");
    }

    pub fn is_active(&self) -> bool {
        critical_section::with(|cs| self.table.borrow_ref(cs).active)
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.table.borrow_ref(cs).tasks.iter().flatten().count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reached_wraps() {
        assert!(reached(100, 100));
        assert!(!reached(99, 100));
        assert!(reached(3, u32::MAX - 2));
        assert!(!reached(u32::MAX - 2, 3));
    }

    #[test]
    fn test_fires_after_period() {
        let daemon: Daemon<4> = Daemon::new();
        let task = daemon.create(100).unwrap();

        assert!(daemon.service_all(50).is_empty());
        assert!(!daemon.take_fired(task));

        assert_eq!(&daemon.service_all(100)[..], &[task]);
        assert!(daemon.take_fired(task));
        assert!(!daemon.take_fired(task));

        assert!(daemon.service_all(150).is_empty());
        assert_eq!(daemon.service_all(200).len(), 1);
    }

    #[test]
    fn test_no_catch_up() {
        let daemon: Daemon<4> = Daemon::new();
        let task = daemon.create(10).unwrap();

        // Five periods late, fires once
        assert_eq!(daemon.service_all(50).len(), 1);
        assert!(daemon.take_fired(task));
        assert!(daemon.service_all(55).is_empty());
    }

    #[test]
    fn test_firing_order_is_registration_order() {
        let daemon: Daemon<4> = Daemon::new();
        let a = daemon.create(10).unwrap();
        let b = daemon.create(5).unwrap();
        let c = daemon.create(20).unwrap();

        assert_eq!(&daemon.service_all(20)[..], &[a, b, c]);
    }

    #[test]
    fn test_pause_and_resume() {
        let daemon: Daemon<4> = Daemon::new();
        let task = daemon.create(100).unwrap();

        daemon.service_all(100);
        daemon.pause(task);
        assert!(!daemon.take_fired(task));
        assert!(daemon.is_paused(task));
        assert!(daemon.service_all(500).is_empty());

        daemon.resume(task);
        assert!(daemon.service_all(550).is_empty());
        assert_eq!(&daemon.service_all(600)[..], &[task]);
    }

    #[test]
    fn test_create_paused() {
        let daemon: Daemon<4> = Daemon::new();
        let task = daemon.create_paused(10).unwrap();
        assert!(daemon.service_all(1000).is_empty());
        daemon.resume(task);
        assert_eq!(daemon.service_all(1010).len(), 1);
    }

    #[test]
    fn test_reload_and_set_period() {
        let daemon: Daemon<4> = Daemon::new();
        let task = daemon.create(100).unwrap();

        daemon.service_all(90);
        daemon.reload(task);
        assert!(daemon.service_all(100).is_empty());
        assert_eq!(daemon.service_all(190).len(), 1);

        daemon.set_period(task, 20);
        assert_eq!(daemon.period(task), Some(20));
        assert_eq!(daemon.service_all(210).len(), 1);
    }

    #[test]
    fn test_wrapping_time() {
        let daemon: Daemon<4> = Daemon::new();
        daemon.service_all(u32::MAX - 5);
        let task = daemon.create(10).unwrap();

        assert!(daemon.service_all(2).is_empty());
        assert_eq!(&daemon.service_all(4)[..], &[task]);
    }

    #[test]
    fn test_halt_freezes() {
        let daemon: Daemon<4> = Daemon::new();
        let task = daemon.create(10).unwrap();

        daemon.halt();
        assert!(daemon.service_all(100).is_empty());
        assert!(!daemon.take_fired(task));
        assert_eq!(daemon.now(), 0);

        daemon.start();
        assert_eq!(daemon.service_all(100).len(), 1);
    }

    #[test]
    fn test_capacity_and_remove() {
        let daemon: Daemon<2> = Daemon::new();
        let a = daemon.create(1).unwrap();
        daemon.create(1).unwrap();
        assert_eq!(daemon.create(1), Err(DaemonError::Full));

        daemon.remove(a);
        assert_eq!(daemon.len(), 1);
        assert!(!daemon.take_fired(a));
        assert!(daemon.create_paused(1).is_ok());
    }

    #[test]
    fn test_removed_handle_is_stale() {
        let daemon: Daemon<1> = Daemon::new();
        let old = daemon.create(10).unwrap();
        daemon.remove(old);

        let new = daemon.create(10).unwrap();
        assert_eq!(new.index(), old.index());
        assert_ne!(new, old);

        daemon.pause(old);
        daemon.set_period(old, 50);
        daemon.remove(old);
        assert!(!daemon.is_paused(new));
        assert_eq!(daemon.period(new), Some(10));
        assert_eq!(daemon.len(), 1);

        assert_eq!(&daemon.service_all(10)[..], &[new]);
        assert!(!daemon.take_fired(old));
        assert!(daemon.take_fired(new));
    }
}
