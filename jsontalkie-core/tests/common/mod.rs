#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use jsontalkie_core::{
    key, Action, CompactMessage, Context, Manifesto, MessageKind, Origin, Transport,
    TransportError,
};

/// Both ends of an in-memory link: what the router will receive and what it sent
#[derive(Clone, Default)]
pub struct Wire {
    inbox: Rc<RefCell<VecDeque<Vec<u8>>>>,
    sent: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl Wire {
    pub fn inject(&self, bytes: &[u8]) {
        self.inbox.borrow_mut().push_back(bytes.to_vec());
    }

    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        self.sent.borrow_mut().drain(..).collect()
    }
}

pub struct MemoryLink {
    class_name: &'static str,
    wire: Wire,
    current: Vec<u8>,
}

impl MemoryLink {
    pub fn new(class_name: &'static str) -> (Self, Wire) {
        let wire = Wire::default();
        let link = Self {
            class_name,
            wire: wire.clone(),
            current: Vec::new(),
        };
        (link, wire)
    }
}

impl Transport for MemoryLink {
    fn class_name(&self) -> &'static str {
        self.class_name
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.wire.sent.borrow_mut().push(bytes.to_vec());
        Ok(())
    }

    fn receive(&mut self) -> Option<&[u8]> {
        self.current = self.wire.inbox.borrow_mut().pop_front()?;
        Some(&self.current)
    }
}

pub type Journal = Rc<RefCell<Vec<CompactMessage>>>;

pub const RUNS: [Action; 2] = [
    Action::new("on", "Light up"),
    Action::new("probe", "Ping myself"),
];

/// Manifesto recording what reaches it
#[derive(Default)]
pub struct Probe {
    pub echoes: Journal,
    pub errors: Journal,
    pub runs: Rc<Cell<u32>>,
    /// Posted once from the first `on_loop`
    pub loop_post: Option<(MessageKind, Option<&'static str>, Origin)>,
}

impl Manifesto for Probe {
    fn class_name(&self) -> &'static str {
        "Probe"
    }

    fn runs(&self) -> &[Action] {
        &RUNS
    }

    fn run(&mut self, index: u8, context: &mut Context<'_>) -> bool {
        self.runs.set(self.runs.get() + 1);
        if index == 1 {
            let Ok(ping) = context.compose(MessageKind::Ping) else {
                return false;
            };
            context.suppress_reply();
            return context.post(ping, Origin::Loopback);
        }
        true
    }

    fn echo(&mut self, message: &CompactMessage, _context: &mut Context<'_>) {
        self.echoes.borrow_mut().push(message.clone());
    }

    fn error(&mut self, message: &CompactMessage, _context: &mut Context<'_>) {
        self.errors.borrow_mut().push(message.clone());
    }

    fn on_loop(&mut self, context: &mut Context<'_>) {
        let Some((kind, to, origin)) = self.loop_post.take() else {
            return;
        };
        let mut message = context.compose(kind).unwrap();
        if let Some(to) = to {
            assert!(message.set_string(key::TO, to));
        }
        assert!(context.post(message, origin));
    }
}

/// Request from a remote peer called `caller`
pub fn request(kind: MessageKind, to: Option<&str>, identity: u16) -> CompactMessage {
    let mut message = CompactMessage::compose(kind, "caller").unwrap();
    assert!(message.set_identity(identity));
    if let Some(to) = to {
        assert!(message.set_string(key::TO, to));
    }
    message
}

/// Wire bytes with a valid checksum
pub fn seal(mut message: CompactMessage) -> Vec<u8> {
    assert!(message.insert_checksum());
    message.as_bytes().to_vec()
}

pub fn parse(bytes: &[u8]) -> CompactMessage {
    CompactMessage::from_bytes(bytes).unwrap()
}
