//! What a talker sees of the router while it handles one message

use crate::error::TalkieError;
use crate::protocol::{CompactMessage, MessageKind};
use crate::routing::Origin;
use crate::talker::TalkerName;

/// Router state exposed through SYS introspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterStatus {
    pub board: &'static str,
    pub drops: u16,
    pub max_delay_ms: u16,
    /// Class of the link the current message came through
    pub socket: &'static str,
}

impl RouterStatus {
    /// Socket name reported for messages that never crossed a link
    pub const LOCAL_SOCKET: &'static str = "Local";
}

impl Default for RouterStatus {
    fn default() -> Self {
        Self {
            board: "",
            drops: 0,
            max_delay_ms: 0,
            socket: Self::LOCAL_SOCKET,
        }
    }
}

/// Delivery side of the router, as seen from inside a dispatch pass
pub trait Outbox {
    /// Route a reply back to where the current request came from
    fn reply(&mut self, message: CompactMessage) -> bool;

    /// Route a new message according to `origin`
    ///
    /// [`Origin::Remote`] goes out on every link, [`Origin::Local`] to the
    /// sibling talkers and [`Origin::Loopback`] back into the poster. Local
    /// deliveries are queued until the current pass is over.
    fn post(&mut self, message: CompactMessage, origin: Origin) -> bool;
}

pub struct Context<'c> {
    name: TalkerName,
    origin: Origin,
    now: u16,
    status: RouterStatus,
    outbox: &'c mut dyn Outbox,
    reply_suppressed: bool,
}

impl<'c> Context<'c> {
    pub fn new(
        name: TalkerName,
        origin: Origin,
        now: u16,
        status: RouterStatus,
        outbox: &'c mut dyn Outbox,
    ) -> Self {
        Self {
            name,
            origin,
            now,
            status,
            outbox,
            reply_suppressed: false,
        }
    }

    /// Name of the talker being dispatched
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Origin of the message being handled, [`Origin::None`] in `on_loop`
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Protocol clock at the start of the pass
    pub fn now(&self) -> u16 {
        self.now
    }

    pub fn status(&self) -> &RouterStatus {
        &self.status
    }

    /// New record from this talker, stamped with the current time
    pub fn compose(&self, kind: MessageKind) -> Result<CompactMessage, TalkieError> {
        let mut message = CompactMessage::compose(kind, &self.name)?;
        if !message.set_identity(self.now) {
            return Err(TalkieError::BufferOverflow {
                capacity: crate::protocol::MESSAGE_CAPACITY,
                required: message.len() + 5,
            });
        }
        Ok(message)
    }

    pub fn post(&mut self, message: CompactMessage, origin: Origin) -> bool {
        self.outbox.post(message, origin)
    }

    /// Drop the reply to the current request and mark it handled
    ///
    /// Used by actions that turn the request into a new exchange of their
    /// own, e.g. a CALL answered by a looped-back PING.
    pub fn suppress_reply(&mut self) {
        self.reply_suppressed = true;
    }

    pub fn is_reply_suppressed(&self) -> bool {
        self.reply_suppressed
    }

    pub(crate) fn reply(&mut self, message: CompactMessage) -> bool {
        if self.reply_suppressed {
            return false;
        }
        self.outbox.reply(message)
    }
}
