//! Tokio tick driver

use std::future::Future;
use std::time::Duration;

use jsontalkie_core::{BroadcastRouter, Repeater, TimeSource};
use log::info;
use tokio::time::MissedTickBehavior;

/// Default scheduling period
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Anything driven by one cooperative pass at a time
pub trait Tick {
    fn tick(&mut self);
}

impl<TS: TimeSource, const MAX_TALKERS: usize, const MAX_LINKS: usize, const QUEUE_SIZE: usize>
    Tick for BroadcastRouter<'_, TS, MAX_TALKERS, MAX_LINKS, QUEUE_SIZE>
{
    fn tick(&mut self) {
        BroadcastRouter::tick(self);
    }
}

impl<TS: TimeSource, const MAX_LINKS: usize, const QUEUE_SIZE: usize> Tick
    for Repeater<'_, TS, MAX_LINKS, QUEUE_SIZE>
{
    fn tick(&mut self) {
        Repeater::tick(self);
    }
}

/// Tick `target` every `period` until `shutdown` resolves
///
/// Missed ticks are skipped rather than bunched up.
pub async fn drive<T, F>(target: &mut T, period: Duration, shutdown: F) -> u64
where
    T: Tick + ?Sized,
    F: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut ticks = 0u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {
                target.tick();
                ticks += 1;
            }
        }
    }
    info!("Tick driver stopped after {} ticks", ticks);
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter(u32);

    impl Tick for Counter {
        fn tick(&mut self) {
            self.0 += 1;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_until_shutdown() {
        let mut counter = Counter::default();
        let ticks = drive(
            &mut counter,
            Duration::from_millis(10),
            tokio::time::sleep(Duration::from_millis(95)),
        )
        .await;
        assert_eq!(ticks, u64::from(counter.0));
        assert!(counter.0 >= 9);
    }
}
