//! In-process link between two routers of the same program
//!
//! A [`LocalBus`] holds one bounded frame queue per direction. Splitting it
//! yields two [`LocalPort`]s, each a [`Transport`] that can be registered as
//! an uplink or downlink of a different router, so a board can host a
//! repeater or a second router next to its own without a physical wire.

use core::cell::RefCell;

use log::trace;

use crate::error::TransportError;
use crate::protocol::{ByteBuffer, MESSAGE_CAPACITY};
use crate::traits::Transport;

type Frame = ByteBuffer<MESSAGE_CAPACITY>;
type Lane<const DEPTH: usize> = RefCell<heapless::Deque<Frame, DEPTH>>;

/// Two frame queues, one per direction, each holding up to `DEPTH` records
pub struct LocalBus<const DEPTH: usize> {
    east: Lane<DEPTH>,
    west: Lane<DEPTH>,
}

impl<const DEPTH: usize> LocalBus<DEPTH> {
    pub const fn new() -> Self {
        Self {
            east: RefCell::new(heapless::Deque::new()),
            west: RefCell::new(heapless::Deque::new()),
        }
    }

    /// Both ends of the bus; what one sends the other receives
    pub fn split(&mut self) -> (LocalPort<'_, DEPTH>, LocalPort<'_, DEPTH>) {
        let bus: &Self = self;
        (
            LocalPort::new(&bus.west, &bus.east),
            LocalPort::new(&bus.east, &bus.west),
        )
    }
}

impl<const DEPTH: usize> Default for LocalBus<DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}

/// One end of a [`LocalBus`]
pub struct LocalPort<'b, const DEPTH: usize> {
    inbox: &'b Lane<DEPTH>,
    outbox: &'b Lane<DEPTH>,
    current: Frame,
}

impl<'b, const DEPTH: usize> LocalPort<'b, DEPTH> {
    fn new(inbox: &'b Lane<DEPTH>, outbox: &'b Lane<DEPTH>) -> Self {
        Self {
            inbox,
            outbox,
            current: Frame::new(),
        }
    }

    /// Frames waiting to be received on this end
    pub fn pending(&self) -> usize {
        self.inbox.try_borrow().map(|lane| lane.len()).unwrap_or(0)
    }
}

impl<const DEPTH: usize> Transport for LocalPort<'_, DEPTH> {
    fn class_name(&self) -> &'static str {
        "LocalBus"
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut frame = Frame::new();
        if !frame.replace(bytes) {
            return Err(TransportError::FrameTooLarge);
        }
        let mut lane = self
            .outbox
            .try_borrow_mut()
            .map_err(|_| TransportError::Busy)?;
        lane.push_back(frame).map_err(|_| {
            trace!("Local bus full at {} frames", DEPTH);
            TransportError::Busy
        })
    }

    fn receive(&mut self) -> Option<&[u8]> {
        let frame = self.inbox.try_borrow_mut().ok()?.pop_front()?;
        self.current = frame;
        Some(self.current.as_slice())
    }
}
