//! Named endpoint dispatching requests to its manifesto

use log::{debug, trace, warn};
use xxhash_rust::xxh32::xxh32;

use crate::context::Context;
use crate::error::TalkieError;
use crate::manifesto::{find_action, Manifesto, NOT_FOUND};
use crate::protocol::{key, Ack, CompactMessage, MessageKind, SysCode, Value, ValueType};
use crate::routing::Match;

pub const MAX_NAME_LENGTH: usize = 16;
pub const MAX_DESCRIPTION_LENGTH: usize = 32;

/// Talker name, also the `f` of every record it sends
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TalkerName(heapless::String<MAX_NAME_LENGTH>);

impl TryFrom<&str> for TalkerName {
    type Error = TalkieError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.is_empty() || value.bytes().any(|b| b == b'"' || b == b'\\') {
            return Err(TalkieError::MalformedMessage);
        }
        let name = heapless::String::try_from(value).map_err(|_| TalkieError::NameTooLong {
            max_length: MAX_NAME_LENGTH,
            actual_length: value.len(),
        })?;
        Ok(TalkerName(name))
    }
}

impl core::ops::Deref for TalkerName {
    type Target = heapless::String<MAX_NAME_LENGTH>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl core::fmt::Display for TalkerName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default channel: xxh32 over name, description and class, folded to 8 bits
pub fn derive_channel(name: &str, description: &str, class_name: &str) -> u8 {
    let hash = [description, class_name]
        .iter()
        .fold(xxh32(name.as_bytes(), 0), |seed, part| {
            xxh32(part.as_bytes(), seed)
        });
    hash.to_le_bytes().iter().fold(0u8, |acc, byte| acc ^ byte)
}

pub struct Talker<'a> {
    name: TalkerName,
    description: heapless::String<MAX_DESCRIPTION_LENGTH>,
    channel: u8,
    muted: bool,
    actions: u16,
    manifesto: &'a mut dyn Manifesto,
}

impl<'a> Talker<'a> {
    pub fn new(
        name: &str,
        description: &str,
        manifesto: &'a mut dyn Manifesto,
    ) -> Result<Self, TalkieError> {
        let name = TalkerName::try_from(name)?;
        if description.bytes().any(|b| b == b'"' || b == b'\\') {
            return Err(TalkieError::MalformedMessage);
        }
        let description = heapless::String::try_from(description).map_err(|_| {
            TalkieError::NameTooLong {
                max_length: MAX_DESCRIPTION_LENGTH,
                actual_length: description.len(),
            }
        })?;
        let channel = derive_channel(&name, &description, manifesto.class_name());
        Ok(Self {
            name,
            description,
            channel,
            muted: false,
            actions: 0,
            manifesto,
        })
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub fn name(&self) -> &TalkerName {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn set_channel(&mut self, channel: u8) {
        self.channel = channel;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// A muted talker still executes requests but only answers SYS
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// RUN/SET/GET actions executed so far, wrapping
    pub fn actions(&self) -> u16 {
        self.actions
    }

    pub fn manifesto(&self) -> &dyn Manifesto {
        &*self.manifesto
    }

    /// How the target of `message` relates to this talker
    pub fn matches(&self, message: &CompactMessage) -> Match {
        match message.value_type(key::TO) {
            ValueType::Void => {
                if message.kind().is_broadcastable() {
                    Match::Any
                } else {
                    Match::Fail
                }
            }
            _ => match message.to() {
                Some(Value::Str(name)) if name == self.name.as_str() => Match::ByName,
                Some(Value::Number(channel)) if channel == u32::from(self.channel) => {
                    Match::ByChannel
                }
                _ => Match::Fail,
            },
        }
    }

    /// Dispatch one request; the message is consumed and becomes the reply
    pub fn handle(&mut self, mut message: CompactMessage, context: &mut Context<'_>) {
        let kind = message.kind();
        trace!("{} handling {} from {:?}", self.name, kind, message.from());
        match kind {
            MessageKind::Talk => {
                let described = message.set_string(key::data(0), &self.description)
                    && message.set_number(key::data(1), u32::from(self.channel));
                if described {
                    self.reply(message, kind, context);
                }
            }
            MessageKind::Channel => {
                self.handle_channel(&mut message);
                if message.set_number(key::data(0), u32::from(self.channel)) {
                    self.reply(message, kind, context);
                }
            }
            MessageKind::Ping => self.reply(message, kind, context),
            MessageKind::Run | MessageKind::Set | MessageKind::Get => {
                let ack = self.handle_call(kind, &mut message, context);
                if message.set_number(key::ACK, ack as u32) {
                    self.reply(message, kind, context);
                }
            }
            MessageKind::List => self.handle_list(message, context),
            MessageKind::Sys => {
                self.handle_sys(&mut message, context);
                self.reply(message, kind, context);
            }
            MessageKind::Echo => self.manifesto.echo(&message, context),
            MessageKind::Error => self.manifesto.error(&message, context),
            MessageKind::Noise => debug!("{} ignoring noise", self.name),
        }
    }

    /// Give the manifesto its per-tick slot
    pub fn on_loop(&mut self, context: &mut Context<'_>) {
        self.manifesto.on_loop(context);
    }

    fn handle_channel(&mut self, message: &mut CompactMessage) {
        if !message.contains(key::data(0)) {
            return;
        }
        let ack = match message.get_number(key::data(0)) {
            Some(channel) => match u8::try_from(channel) {
                Ok(channel) => {
                    self.channel = channel;
                    Ack::Roger
                }
                Err(_) => Ack::Negative,
            },
            None => Ack::SayAgain,
        };
        if !message.set_number(key::ACK, ack as u32) {
            warn!("{} could not acknowledge channel change", self.name);
        }
    }

    fn handle_call(
        &mut self,
        kind: MessageKind,
        message: &mut CompactMessage,
        context: &mut Context<'_>,
    ) -> Ack {
        let index = match message.value(key::data(0)) {
            Some(target) => find_action(self.manifesto.actions(kind), target),
            None => NOT_FOUND,
        };
        if index == NOT_FOUND {
            debug!("{} has no {} action {:?}", self.name, kind, message.value(key::data(0)));
            return Ack::SayAgain;
        }

        let ack = match kind {
            MessageKind::Run => Ack::from_outcome(self.manifesto.run(index, context)),
            MessageKind::Set => {
                let Some(value) = message.get_number(key::data(1)) else {
                    return Ack::SayAgain;
                };
                Ack::from_outcome(self.manifesto.set(index, value, context))
            }
            MessageKind::Get => match self.manifesto.get(index, context) {
                Some(value) if message.set_number(key::data(1), value) => Ack::Roger,
                _ => Ack::Negative,
            },
            _ => return Ack::SayAgain,
        };
        self.actions = self.actions.wrapping_add(1);
        ack
    }

    fn handle_list(&self, request: CompactMessage, context: &mut Context<'_>) {
        if self.manifesto.is_empty() {
            let mut reply = request;
            if reply.set_number(key::ACK, Ack::Nil as u32) {
                self.reply(reply, MessageKind::List, context);
            }
            return;
        }

        for kind in [MessageKind::Run, MessageKind::Set, MessageKind::Get] {
            for (index, action) in self.manifesto.actions(kind).iter().enumerate() {
                let mut reply = request.clone();
                let listed = reply.set_number(key::SUB_CODE, kind as u32)
                    && reply.set_number(key::data(0), index as u32)
                    && reply.set_string(key::data(1), action.name)
                    && reply.set_string(key::data(2), action.description);
                if listed {
                    self.reply(reply, MessageKind::List, context);
                } else {
                    warn!("{} cannot list {} action {}", self.name, kind, action.name);
                }
            }
        }
    }

    fn handle_sys(&mut self, message: &mut CompactMessage, context: &Context<'_>) {
        let status = context.status();
        let code = message.get_number(key::SUB_CODE).and_then(SysCode::from_u32);
        let answered = match code {
            Some(SysCode::Board) => message.set_string(key::data(0), status.board),
            Some(SysCode::Mute) => {
                if let Some(muted) = message.get_number(key::data(0)) {
                    self.muted = muted != 0;
                }
                message.set_number(key::data(0), u32::from(self.muted))
            }
            Some(SysCode::Drops) => message.set_number(key::data(0), u32::from(status.drops)),
            Some(SysCode::Delay) => {
                message.set_number(key::data(0), u32::from(status.max_delay_ms))
            }
            Some(SysCode::Socket) => message.set_string(key::data(0), status.socket),
            Some(SysCode::Talker) => {
                message.set_string(key::data(0), &self.name)
                    && message.set_string(key::data(1), &self.description)
            }
            Some(SysCode::Manifesto) => {
                message.set_string(key::data(0), self.manifesto.class_name())
            }
            None => false,
        };
        let ack = if answered { Ack::Roger } else { Ack::SayAgain };
        if !message.set_number(key::ACK, ack as u32) {
            warn!("{} could not acknowledge sys request", self.name);
        }
    }

    /// Turn the request into an ECHO back to its sender
    fn reply(&self, mut message: CompactMessage, original: MessageKind, context: &mut Context<'_>) {
        if self.muted && original != MessageKind::Sys {
            trace!("{} is muted, {} reply dropped", self.name, original);
            return;
        }
        let Some(sender) = message.from().and_then(|from| TalkerName::try_from(from).ok()) else {
            debug!("{} cannot reply to a record without sender", self.name);
            return;
        };
        let addressed = message.set_string(key::TO, &sender)
            && message.set_string(key::FROM, &self.name)
            && message.set_number(key::ORIGINAL, original as u32)
            && message.set_kind(MessageKind::Echo);
        if !addressed {
            warn!("{} reply to {} does not fit", self.name, sender);
            return;
        }
        context.reply(message);
    }
}

impl core::fmt::Debug for Talker<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Talker")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("channel", &self.channel)
            .field("muted", &self.muted)
            .field("actions", &self.actions)
            .field("manifesto", &self.manifesto.class_name())
            .finish()
    }
}
