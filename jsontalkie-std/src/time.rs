//! Std time implementation

use std::time::Instant;

use jsontalkie_core::TimeSource;

/// Standard library time source
///
/// Milliseconds since the source was created, wrapping at `u32::MAX`.
#[derive(Debug, Clone, Copy)]
pub struct StdTimeSource {
    start: Instant,
}

impl StdTimeSource {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for StdTimeSource {
    fn now_millis(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}
