//! GPIO pin abstractions
//!
//! Only digital inputs are needed by the core: the fingerprint module's
//! touch interrupt line and the face module's human-presence output.

/// Digital input pin
///
/// Implementations should handle the actual hardware register reading
/// for the specific chip.
pub trait InputPin {
    /// Check if the pin reads high (logic 1)
    fn is_high(&self) -> bool;

    /// Check if the pin reads low (logic 0)
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// Adapter for pins implementing the `embedded-hal` 1.0 input trait
///
/// embedded-hal reads take `&mut self` and are fallible; a failed read is
/// reported as low, which the presence logic treats as "nobody there".
pub struct EhInput<P> {
    pin: core::cell::RefCell<P>,
}

impl<P: embedded_hal::digital::InputPin> EhInput<P> {
    /// Wrap an embedded-hal input pin
    pub fn new(pin: P) -> Self {
        Self {
            pin: core::cell::RefCell::new(pin),
        }
    }

    /// Wrapped pin, e.g. to await an edge
    pub fn inner_mut(&mut self) -> &mut P {
        self.pin.get_mut()
    }

    /// Release the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin.into_inner()
    }
}

impl<P: embedded_hal::digital::InputPin> InputPin for EhInput<P> {
    fn is_high(&self) -> bool {
        self.pin.borrow_mut().is_high().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    struct FakePin(bool);

    impl embedded_hal::digital::ErrorType for FakePin {
        type Error = Infallible;
    }

    impl embedded_hal::digital::InputPin for FakePin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.0)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.0)
        }
    }

    #[test]
    fn test_eh_adapter_reads_level() {
        let high = EhInput::new(FakePin(true));
        assert!(high.is_high());
        assert!(!high.is_low());

        let low = EhInput::new(FakePin(false));
        assert!(low.is_low());
        assert!(!low.into_inner().0);
    }
}
