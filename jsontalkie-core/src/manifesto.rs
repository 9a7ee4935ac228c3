//! Per-device command tables

use crate::context::Context;
use crate::protocol::{CompactMessage, MessageKind, Value};

/// Index returned when an action cannot be resolved
pub const NOT_FOUND: u8 = 255;

/// Named entry of a RUN, SET or GET table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    pub name: &'static str,
    pub description: &'static str,
}

impl Action {
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }
}

/// Pluggable per-device behaviour behind a [`Talker`](crate::talker::Talker)
///
/// Action indices are positions in the table returned by `runs`, `sets` or
/// `gets`. Tables are limited to 255 entries since 255 is [`NOT_FOUND`].
pub trait Manifesto {
    /// Class name reported by SYS introspection and mixed into the channel
    fn class_name(&self) -> &'static str;

    fn runs(&self) -> &[Action] {
        &[]
    }

    fn sets(&self) -> &[Action] {
        &[]
    }

    fn gets(&self) -> &[Action] {
        &[]
    }

    /// Execute RUN action `index`; `false` is acknowledged as NEGATIVE
    fn run(&mut self, _index: u8, _context: &mut Context<'_>) -> bool {
        false
    }

    /// Execute SET action `index` with `value`
    fn set(&mut self, _index: u8, _value: u32, _context: &mut Context<'_>) -> bool {
        false
    }

    /// Read GET action `index`; `None` is acknowledged as NEGATIVE
    fn get(&mut self, _index: u8, _context: &mut Context<'_>) -> Option<u32> {
        None
    }

    /// An ECHO addressed to this talker
    fn echo(&mut self, _message: &CompactMessage, _context: &mut Context<'_>) {}

    /// An ERROR addressed to this talker
    fn error(&mut self, _message: &CompactMessage, _context: &mut Context<'_>) {}

    /// Called once per router tick
    fn on_loop(&mut self, _context: &mut Context<'_>) {}

    /// Table for a CALL kind, empty for anything else
    fn actions(&self, kind: MessageKind) -> &[Action] {
        match kind {
            MessageKind::Run => self.runs(),
            MessageKind::Set => self.sets(),
            MessageKind::Get => self.gets(),
            _ => &[],
        }
    }

    fn is_empty(&self) -> bool {
        self.runs().is_empty() && self.sets().is_empty() && self.gets().is_empty()
    }
}

/// Resolve an action by name (linear scan) or by index
pub fn find_action(actions: &[Action], target: Value<'_>) -> u8 {
    let index = match target {
        Value::Str(name) => actions.iter().position(|action| action.name == name),
        Value::Number(index) => usize::try_from(index)
            .ok()
            .filter(|&index| index < actions.len()),
    };
    match index {
        Some(index) if index < NOT_FOUND as usize => index as u8,
        _ => NOT_FOUND,
    }
}
