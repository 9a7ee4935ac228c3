//! Time abstraction for different platforms

use core::sync::atomic::{AtomicU32, Ordering};

/// Time source trait
///
/// Abstracts the millisecond clock for both std and embedded platforms. The
/// protocol only looks at the low 16 bits.
pub trait TimeSource {
    /// Milliseconds since an arbitrary start, wrapping
    fn now_millis(&self) -> u32;

    /// Current time on the 16-bit protocol clock
    fn now_protocol(&self) -> u16 {
        self.now_millis() as u16
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now_millis(&self) -> u32 {
        (**self).now_millis()
    }
}

/// Clock advanced by the firmware, e.g. from a SysTick handler
///
/// Only plain loads and stores are used so it also works on cores without
/// atomic read-modify-write.
#[derive(Debug, Default)]
pub struct TickClock {
    millis: AtomicU32,
}

impl TickClock {
    pub const fn new() -> Self {
        Self {
            millis: AtomicU32::new(0),
        }
    }

    pub fn set(&self, millis: u32) {
        self.millis.store(millis, Ordering::Relaxed);
    }

    /// Single-writer increment
    pub fn advance(&self, millis: u32) {
        let now = self.millis.load(Ordering::Relaxed);
        self.millis.store(now.wrapping_add(millis), Ordering::Relaxed);
    }
}

impl TimeSource for TickClock {
    fn now_millis(&self) -> u32 {
        self.millis.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_clock_wraps() {
        let clock = TickClock::new();
        clock.set(65_535);
        assert_eq!(clock.now_protocol(), 65_535);
        clock.advance(2);
        assert_eq!(clock.now_millis(), 65_537);
        assert_eq!(clock.now_protocol(), 1);
    }

    #[test]
    fn test_reference_is_a_time_source() {
        let clock = TickClock::new();
        clock.set(42);
        let by_ref: &dyn TimeSource = &&clock;
        assert_eq!(by_ref.now_millis(), 42);
    }
}
