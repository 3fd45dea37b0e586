//! Event registry
//!
//! Interrupt handlers know which peripheral fired (controller + address),
//! not which component owns it. Components register an [`EventSink`] for
//! each peripheral identity they own; the handler calls
//! [`Registry::dispatch`] to reach it.
//!
//! Sinks must be O(1): copy a few bytes, raise a flag, return.

use core::cell::RefCell;

use critical_section::Mutex;

/// Default registry capacity
pub const REGISTRY_CAPACITY: usize = 16;

/// Identity of a peripheral instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeripheralId {
    /// Controller handle (UART number, CAN instance, EXTI port)
    pub controller: u8,
    /// Address within the controller (pin number, frame id, 0 for UARTs)
    pub address: u32,
}

impl PeripheralId {
    pub const fn new(controller: u8, address: u32) -> Self {
        Self {
            controller,
            address,
        }
    }
}

/// What happened on the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeripheralEvent<'a> {
    /// A receive completed (idle line or frame), with the bytes received
    Received(&'a [u8]),
    /// A digital input changed, with the level sampled in the handler
    Level(bool),
}

/// Receiver of peripheral events, called from interrupt context
pub trait EventSink {
    fn on_event(&self, event: PeripheralEvent<'_>);
}

/// Registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// Every slot is taken
    Full,
    /// The identity is already registered
    DuplicateIdentity,
    /// The handle does not refer to a live registration
    UnknownHandle,
}

/// Registration handle, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Handle(u8);

#[derive(Clone, Copy)]
struct Entry<'a> {
    id: PeripheralId,
    sink: &'a (dyn EventSink + Sync),
}

/// Fixed-capacity table of peripheral → sink bindings
pub struct Registry<'a, const N: usize = REGISTRY_CAPACITY> {
    entries: Mutex<RefCell<[Option<Entry<'a>>; N]>>,
}

impl<'a, const N: usize> Default for Registry<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> Registry<'a, N> {
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(RefCell::new([None; N])),
        }
    }

    /// Bind `sink` to `id`
    pub fn register(
        &self,
        id: PeripheralId,
        sink: &'a (dyn EventSink + Sync),
    ) -> Result<Handle, RegistryError> {
        critical_section::with(|cs| {
            let mut entries = self.entries.borrow_ref_mut(cs);

            if entries.iter().flatten().any(|entry| entry.id == id) {
                return Err(RegistryError::DuplicateIdentity);
            }

            let slot = entries
                .iter()
                .position(Option::is_none)
                .ok_or(RegistryError::Full)?;
            entries[slot] = Some(Entry { id, sink });
            Ok(Handle(slot as u8))
        })
    }

    /// Remove a binding
    pub fn unregister(&self, handle: Handle) -> Result<(), RegistryError> {
        critical_section::with(|cs| {
            let mut entries = self.entries.borrow_ref_mut(cs);
            match entries.get_mut(handle.0 as usize) {
                Some(slot @ Some(_)) => {
                    *slot = None;
                    Ok(())
                }
                _ => Err(RegistryError::UnknownHandle),
            }
        })
    }

    /// Deliver `event` to the sink bound to `id`
    ///
    /// Returns false when nothing is registered for `id`.
    pub fn dispatch(&self, id: PeripheralId, event: PeripheralEvent<'_>) -> bool {
        let sink = critical_section::with(|cs| {
            self.entries
                .borrow_ref(cs)
                .iter()
                .flatten()
                .find(|entry| entry.id == id)
                .map(|entry| entry.sink)
        });

        match sink {
            Some(sink) => {
                sink.on_event(event);
                true
            }
            None => {
                trace!("no sink for controller {} address {}", id.controller, id.address);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.entries.borrow_ref(cs).iter().flatten().count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        bytes: AtomicUsize,
        edges: AtomicUsize,
    }

    impl EventSink for CountingSink {
        fn on_event(&self, event: PeripheralEvent<'_>) {
            match event {
                PeripheralEvent::Received(data) => {
                    self.bytes.fetch_add(data.len(), Ordering::Relaxed);
                }
                PeripheralEvent::Level(_) => {
                    self.edges.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    const UART1: PeripheralId = PeripheralId::new(1, 0);
    const PA8: PeripheralId = PeripheralId::new(0xA, 8);

    #[test]
    fn test_dispatch_reaches_owner() {
        let sink = CountingSink::default();
        let other = CountingSink::default();
        let registry: Registry<'_, 4> = Registry::new();

        registry.register(UART1, &sink).unwrap();
        registry.register(PA8, &other).unwrap();

        assert!(registry.dispatch(UART1, PeripheralEvent::Received(&[1, 2, 3])));
        assert!(registry.dispatch(PA8, PeripheralEvent::Level(true)));

        assert_eq!(sink.bytes.load(Ordering::Relaxed), 3);
        assert_eq!(sink.edges.load(Ordering::Relaxed), 0);
        assert_eq!(other.edges.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_unknown_identity_not_delivered() {
        let registry: Registry<'_, 4> = Registry::new();
        assert!(!registry.dispatch(UART1, PeripheralEvent::Level(false)));
    }

    #[test]
    fn test_duplicate_rejected() {
        let sink = CountingSink::default();
        let registry: Registry<'_, 4> = Registry::new();

        registry.register(UART1, &sink).unwrap();
        assert_eq!(
            registry.register(UART1, &sink),
            Err(RegistryError::DuplicateIdentity)
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_capacity_enforced() {
        let sink = CountingSink::default();
        let registry: Registry<'_, 2> = Registry::new();

        registry.register(PeripheralId::new(0, 0), &sink).unwrap();
        registry.register(PeripheralId::new(0, 1), &sink).unwrap();
        assert_eq!(
            registry.register(PeripheralId::new(0, 2), &sink),
            Err(RegistryError::Full)
        );
    }

    #[test]
    fn test_unregister_frees_slot() {
        let sink = CountingSink::default();
        let registry: Registry<'_, 1> = Registry::new();

        let handle = registry.register(UART1, &sink).unwrap();
        registry.unregister(handle).unwrap();
        assert!(registry.is_empty());
        assert!(!registry.dispatch(UART1, PeripheralEvent::Received(&[0])));
        assert_eq!(registry.unregister(handle), Err(RegistryError::UnknownHandle));

        registry.register(PA8, &sink).unwrap();
        assert_eq!(registry.capacity(), 1);
    }
}
