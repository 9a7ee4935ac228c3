//! Bridge between an uplink side and a downlink side

use crate::error::TalkieError;
use crate::router::{BroadcastRouter, RouterConfig};
use crate::routing::LinkId;
use crate::time::TimeSource;
use crate::traits::Transport;

/// Router without local talkers
///
/// Every verified record received on one side is forwarded to the other
/// (and, from a downlink, to the sibling downlinks). Malformed, tampered and
/// replayed records stop here.
#[derive(Debug)]
pub struct Repeater<'a, TS: TimeSource, const MAX_LINKS: usize, const QUEUE_SIZE: usize> {
    router: BroadcastRouter<'a, TS, 0, MAX_LINKS, QUEUE_SIZE>,
}

impl<'a, TS: TimeSource, const MAX_LINKS: usize, const QUEUE_SIZE: usize>
    Repeater<'a, TS, MAX_LINKS, QUEUE_SIZE>
{
    pub fn new(clock: TS, config: RouterConfig) -> Self {
        Self {
            router: BroadcastRouter::new(clock, config),
        }
    }

    pub fn add_uplink(&mut self, transport: &'a mut dyn Transport) -> Result<LinkId, TalkieError> {
        self.router.add_uplink(transport)
    }

    pub fn add_downlink(
        &mut self,
        transport: &'a mut dyn Transport,
    ) -> Result<LinkId, TalkieError> {
        self.router.add_downlink(transport)
    }

    pub fn tick(&mut self) {
        self.router.tick();
    }

    pub fn drops(&self) -> u16 {
        self.router.drops()
    }

    pub fn router(&self) -> &BroadcastRouter<'a, TS, 0, MAX_LINKS, QUEUE_SIZE> {
        &self.router
    }
}
