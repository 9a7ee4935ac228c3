//! Delivery of records among local talkers and across links
//!
//! One cooperative pass per [`BroadcastRouter::tick`]: inbound frames are
//! verified and fanned out to matching talkers, each recipient working on its
//! own copy, and whatever no talker consumed is forwarded to the other side.
//! Messages posted by talkers for local delivery wait in a bounded queue
//! until the current pass is over.

use log::{debug, info, trace, warn};

use crate::context::{Context, Outbox, RouterStatus};
use crate::error::{TalkieError, TransportError};
use crate::guard::{ReplayGuard, DEFAULT_MAX_DELAY_MS};
use crate::protocol::{
    key, trim_noise, ByteBuffer, CompactMessage, ErrorCode, MessageKind, ValueType,
    MESSAGE_CAPACITY,
};
use crate::routing::{LinkId, LinkRole, Match, Origin};
use crate::talker::Talker;
use crate::time::TimeSource;
use crate::traits::Transport;

/// Runtime settings of a router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    /// Board identity reported by SYS and used as sender of router errors
    pub board: &'static str,
    /// Tolerated reordering of CALLs, 0 for links that cannot reorder
    pub max_delay_ms: u16,
    /// Frames taken from a single link per tick
    pub receive_burst: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            board: "JsonTalkie",
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            receive_burst: 4,
        }
    }
}

/// Delivery waiting for the end of the current pass
#[derive(Debug, Clone)]
struct Pending {
    message: CompactMessage,
    origin: Origin,
    sender: usize,
}

struct Links<'a, const MAX_LINKS: usize> {
    uplinks: heapless::Vec<&'a mut dyn Transport, MAX_LINKS>,
    downlinks: heapless::Vec<&'a mut dyn Transport, MAX_LINKS>,
}

impl<'a, const MAX_LINKS: usize> Links<'a, MAX_LINKS> {
    const fn new() -> Self {
        Self {
            uplinks: heapless::Vec::new(),
            downlinks: heapless::Vec::new(),
        }
    }

    fn side(&self, role: LinkRole) -> &heapless::Vec<&'a mut dyn Transport, MAX_LINKS> {
        match role {
            LinkRole::Uplink => &self.uplinks,
            LinkRole::Downlink => &self.downlinks,
        }
    }

    fn side_mut(
        &mut self,
        role: LinkRole,
    ) -> &mut heapless::Vec<&'a mut dyn Transport, MAX_LINKS> {
        match role {
            LinkRole::Uplink => &mut self.uplinks,
            LinkRole::Downlink => &mut self.downlinks,
        }
    }

    fn len(&self, role: LinkRole) -> usize {
        self.side(role).len()
    }

    fn class_name(&self, link: LinkId) -> Option<&'static str> {
        self.side(link.role)
            .get(link.index)
            .map(|transport| transport.class_name())
    }

    fn receive(&mut self, link: LinkId) -> Option<&[u8]> {
        self.side_mut(link.role).get_mut(link.index)?.receive()
    }

    fn send(&mut self, link: LinkId, bytes: &[u8]) -> Result<(), TransportError> {
        let transport = self
            .side_mut(link.role)
            .get_mut(link.index)
            .ok_or(TransportError::SendFailed)?;
        transport.send(bytes).map_err(|error| {
            warn!("Send on {} failed: {}", transport.class_name(), error);
            error
        })
    }

    /// Send to every link of `roles` except `skip`
    fn send_all(
        &mut self,
        bytes: &[u8],
        roles: &[LinkRole],
        skip: Option<LinkId>,
    ) -> Result<(), TransportError> {
        let mut result = Ok(());
        for &role in roles {
            for index in 0..self.len(role) {
                let link = LinkId { role, index };
                if Some(link) == skip {
                    continue;
                }
                if let Err(error) = self.send(link, bytes) {
                    result = Err(error);
                }
            }
        }
        result
    }

    /// Pass unconsumed traffic on to the opposite side, never back to `source`
    fn forward(&mut self, bytes: &[u8], source: LinkId) -> Result<(), TransportError> {
        let roles: &[LinkRole] = match source.role {
            LinkRole::Uplink => &[LinkRole::Downlink],
            LinkRole::Downlink => &[LinkRole::Uplink, LinkRole::Downlink],
        };
        self.send_all(bytes, roles, Some(source))
    }
}

/// Insert the checksum and hand out the wire bytes
fn seal(mut message: CompactMessage) -> Result<CompactMessage, TalkieError> {
    if message.insert_checksum() {
        Ok(message)
    } else {
        Err(TalkieError::BufferOverflow {
            capacity: MESSAGE_CAPACITY,
            required: message.len() + 5,
        })
    }
}

fn enqueue<const QUEUE_SIZE: usize>(
    pending: &mut heapless::Deque<Pending, QUEUE_SIZE>,
    message: CompactMessage,
    origin: Origin,
    sender: usize,
) -> Result<(), TalkieError> {
    pending
        .push_back(Pending {
            message,
            origin,
            sender,
        })
        .map_err(|_| {
            warn!("Pending queue full, {:?} delivery dropped", origin);
            TalkieError::QueueFull {
                queue_size: QUEUE_SIZE,
            }
        })
}

fn broadcast<const MAX_LINKS: usize>(
    links: &mut Links<'_, MAX_LINKS>,
    message: CompactMessage,
) -> Result<(), TalkieError> {
    let sealed = seal(message)?;
    links.send_all(
        sealed.as_bytes(),
        &[LinkRole::Uplink, LinkRole::Downlink],
        None,
    )?;
    Ok(())
}

/// Records without `t` only make sense for kinds every talker may answer
fn is_addressable(message: &CompactMessage) -> bool {
    message.contains(key::TO) || message.kind().is_broadcastable()
}

fn route_post<const MAX_LINKS: usize, const QUEUE_SIZE: usize>(
    links: &mut Links<'_, MAX_LINKS>,
    pending: &mut heapless::Deque<Pending, QUEUE_SIZE>,
    message: CompactMessage,
    origin: Origin,
    sender: usize,
) -> Result<(), TalkieError> {
    match origin {
        Origin::Remote if !is_addressable(&message) => {
            debug!("Unaddressed {} from talker {} not sent", message.kind(), sender);
            Err(TalkieError::MalformedMessage)
        }
        Origin::Remote => broadcast(links, message),
        Origin::Local | Origin::Loopback => enqueue(pending, message, origin, sender),
        Origin::None => Ok(()),
    }
}

/// Outbox of one talker during one dispatch
struct Dispatch<'p, 'a, const MAX_LINKS: usize, const QUEUE_SIZE: usize> {
    links: &'p mut Links<'a, MAX_LINKS>,
    pending: &'p mut heapless::Deque<Pending, QUEUE_SIZE>,
    origin: Origin,
    source: Option<LinkId>,
    talker: usize,
}

impl<const MAX_LINKS: usize, const QUEUE_SIZE: usize> Outbox
    for Dispatch<'_, '_, MAX_LINKS, QUEUE_SIZE>
{
    fn reply(&mut self, message: CompactMessage) -> bool {
        let result = match (self.origin, self.source) {
            (Origin::Remote, Some(source)) => seal(message).and_then(|sealed| {
                self.links
                    .send(source, sealed.as_bytes())
                    .map_err(TalkieError::from)
            }),
            (Origin::Local | Origin::Loopback, _) => {
                enqueue(self.pending, message, self.origin, self.talker)
            }
            _ => {
                trace!("Nothing to reply to");
                return false;
            }
        };
        result.is_ok()
    }

    fn post(&mut self, message: CompactMessage, origin: Origin) -> bool {
        match route_post(self.links, self.pending, message, origin, self.talker) {
            Ok(()) => true,
            Err(error) => {
                debug!("Post from talker {} failed: {}", self.talker, error);
                false
            }
        }
    }
}

/// Router of one device
///
/// # Generic Parameters
///
/// - `TS`: clock stamping identities and feeding the replay guard
/// - `MAX_TALKERS`: local talkers that can be registered
/// - `MAX_LINKS`: links per side (uplink and downlink each)
/// - `QUEUE_SIZE`: local deliveries that can wait for the end of a pass
pub struct BroadcastRouter<
    'a,
    TS: TimeSource,
    const MAX_TALKERS: usize,
    const MAX_LINKS: usize,
    const QUEUE_SIZE: usize,
> {
    config: RouterConfig,
    clock: TS,
    guard: ReplayGuard,
    talkers: heapless::Vec<Talker<'a>, MAX_TALKERS>,
    links: Links<'a, MAX_LINKS>,
    pending: heapless::Deque<Pending, QUEUE_SIZE>,
}

impl<
        'a,
        TS: TimeSource,
        const MAX_TALKERS: usize,
        const MAX_LINKS: usize,
        const QUEUE_SIZE: usize,
    > BroadcastRouter<'a, TS, MAX_TALKERS, MAX_LINKS, QUEUE_SIZE>
{
    pub fn new(clock: TS, config: RouterConfig) -> Self {
        Self {
            guard: ReplayGuard::new(config.max_delay_ms),
            config,
            clock,
            talkers: heapless::Vec::new(),
            links: Links::new(),
            pending: heapless::Deque::new(),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// CALLs dropped by the replay guard, wrapping
    pub fn drops(&self) -> u16 {
        self.guard.drops()
    }

    pub fn set_max_delay_ms(&mut self, max_delay_ms: u16) {
        self.config.max_delay_ms = max_delay_ms;
        self.guard.set_max_delay_ms(max_delay_ms);
    }

    /// Register a local talker, returning its index
    pub fn add_talker(&mut self, talker: Talker<'a>) -> Result<usize, TalkieError> {
        if self.talkers.iter().any(|known| known.name() == talker.name()) {
            warn!("Talker {} registered twice", talker.name());
        }
        info!("Talker {} on channel {}", talker.name(), talker.channel());
        self.talkers
            .push(talker)
            .map_err(|_| TalkieError::TalkerLimitReached {
                max_talkers: MAX_TALKERS,
            })?;
        Ok(self.talkers.len() - 1)
    }

    pub fn add_uplink(&mut self, transport: &'a mut dyn Transport) -> Result<LinkId, TalkieError> {
        self.add_link(LinkRole::Uplink, transport)
    }

    pub fn add_downlink(
        &mut self,
        transport: &'a mut dyn Transport,
    ) -> Result<LinkId, TalkieError> {
        self.add_link(LinkRole::Downlink, transport)
    }

    fn add_link(
        &mut self,
        role: LinkRole,
        transport: &'a mut dyn Transport,
    ) -> Result<LinkId, TalkieError> {
        let class_name = transport.class_name();
        let side = self.links.side_mut(role);
        side.push(transport).map_err(|_| TalkieError::LinkLimitReached {
            max_links: MAX_LINKS,
        })?;
        let link = LinkId {
            role,
            index: side.len() - 1,
        };
        info!("{:?} link {} is {}", role, link.index, class_name);
        Ok(link)
    }

    pub fn talkers(&self) -> &[Talker<'a>] {
        &self.talkers
    }

    pub fn talker(&self, index: usize) -> Option<&Talker<'a>> {
        self.talkers.get(index)
    }

    pub fn talker_mut(&mut self, index: usize) -> Option<&mut Talker<'a>> {
        self.talkers.get_mut(index)
    }

    /// Deliveries waiting for the next drain
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// What SYS reports for a message that came through `source`
    pub fn status(&self, source: Option<LinkId>) -> RouterStatus {
        RouterStatus {
            board: self.config.board,
            drops: self.guard.drops(),
            max_delay_ms: self.guard.max_delay_ms(),
            socket: source
                .and_then(|link| self.links.class_name(link))
                .unwrap_or(RouterStatus::LOCAL_SOCKET),
        }
    }

    /// Post `message` on behalf of talker `sender`
    ///
    /// Remote posts get their checksum and leave on every link right away.
    /// Local and loopback posts are delivered by the next drain.
    pub fn post(
        &mut self,
        sender: usize,
        message: CompactMessage,
        origin: Origin,
    ) -> Result<(), TalkieError> {
        if sender >= self.talkers.len() {
            return Err(TalkieError::MalformedMessage);
        }
        route_post(&mut self.links, &mut self.pending, message, origin, sender)
    }

    /// One cooperative scheduling pass
    ///
    /// Receives on every uplink, then every downlink, gives every talker its
    /// loop slot and finally delivers what was queued before the drain began.
    pub fn tick(&mut self) {
        for role in [LinkRole::Uplink, LinkRole::Downlink] {
            for index in 0..self.links.len(role) {
                let link = LinkId { role, index };
                for _ in 0..self.config.receive_burst.max(1) {
                    if !self.receive(link) {
                        break;
                    }
                }
            }
        }
        self.run_loops();
        self.drain_pending();
    }

    /// Take one frame from `link`; `false` when the link had nothing
    fn receive(&mut self, link: LinkId) -> bool {
        let mut frame = ByteBuffer::<MESSAGE_CAPACITY>::new();
        {
            let Some(bytes) = self.links.receive(link) else {
                return false;
            };
            match trim_noise(bytes) {
                Some(record) if frame.replace(record) => {}
                Some(record) => {
                    debug!(
                        "{:?} dropped {} byte frame, capacity {}",
                        link,
                        record.len(),
                        frame.capacity()
                    );
                    return true;
                }
                None => {
                    trace!("{:?} received noise", link);
                    return true;
                }
            }
        }
        if let Err(error) = self.process_inbound(frame.as_slice(), link) {
            debug!("{:?} dropped frame: {}", link, error);
        }
        true
    }

    /// Verify, repair, reject unaddressed calls, guard, fan out, then forward
    /// what nobody consumed
    fn process_inbound(&mut self, wire: &[u8], source: LinkId) -> Result<(), TalkieError> {
        let now = self.clock.now_protocol();
        let mut message = CompactMessage::from_bytes(wire)?;
        if !message.verify_checksum() {
            return Err(TalkieError::ChecksumMismatch);
        }

        let repaired = message.value_type(key::IDENTITY) != ValueType::Integer;
        if repaired && !message.set_identity(now) {
            return Err(TalkieError::MalformedMessage);
        }
        if !message.validate_fields() {
            return Err(TalkieError::MalformedMessage);
        }
        if !is_addressable(&message) {
            trace!("{:?} unaddressed {} rejected", source, message.kind());
            return Err(TalkieError::MalformedMessage);
        }
        if repaired {
            self.report_missing_identity(&message, source, now);
        }

        if message.kind().is_call() && !repaired {
            if let Some(identity) = message.identity() {
                self.guard.check(identity, now)?;
            }
        }

        let consumed = self.deliver(&message, Origin::Remote, Some(source), None, now);
        if !consumed {
            if let Err(error) = self.links.forward(wire, source) {
                debug!("Forward from {:?} incomplete: {}", source, error);
            }
        }
        Ok(())
    }

    /// ERROR back to the sender of a record that carried no identity
    fn report_missing_identity(&mut self, request: &CompactMessage, source: LinkId, now: u16) {
        let Some(sender) = request.from() else {
            return;
        };
        let report = CompactMessage::compose(MessageKind::Error, self.config.board).and_then(
            |mut report| {
                let filled = report.set_identity(now)
                    && report.set_string(key::TO, sender)
                    && report.set_number(key::SUB_CODE, ErrorCode::Identity as u32)
                    && report.set_number(key::ORIGINAL, request.kind() as u32);
                if filled {
                    seal(report)
                } else {
                    Err(TalkieError::MalformedMessage)
                }
            },
        );
        match report {
            Ok(report) => {
                debug!("{} sent no identity, stamped {}", sender, now);
                if let Err(error) = self.links.send(source, report.as_bytes()) {
                    debug!("Identity report to {} incomplete: {}", sender, error);
                }
            }
            Err(error) => warn!("Identity report to {} not sent: {}", sender, error),
        }
    }

    /// Hand a fresh copy of `message` to every recipient
    ///
    /// Remote and local messages go to every matching talker but the sender;
    /// a loopback only reaches the sender. Returns whether a talker consumed
    /// the message, either by name or by suppressing its reply.
    fn deliver(
        &mut self,
        message: &CompactMessage,
        origin: Origin,
        source: Option<LinkId>,
        sender: Option<usize>,
        now: u16,
    ) -> bool {
        let status = self.status(source);
        let Self {
            talkers,
            links,
            pending,
            ..
        } = self;

        let mut consumed = false;
        for (index, talker) in talkers.iter_mut().enumerate() {
            let matched = if origin == Origin::Loopback {
                if sender != Some(index) {
                    continue;
                }
                Match::ByName
            } else {
                if sender == Some(index) {
                    continue;
                }
                talker.matches(message)
            };
            if !matched.is_match() {
                continue;
            }

            let copy = match CompactMessage::from_bytes(message.as_bytes()) {
                Ok(copy) => copy,
                Err(_) => continue,
            };
            let mut outbox = Dispatch {
                links: &mut *links,
                pending: &mut *pending,
                origin,
                source,
                talker: index,
            };
            let mut context =
                Context::new(talker.name().clone(), origin, now, status, &mut outbox);
            talker.handle(copy, &mut context);
            if context.is_reply_suppressed() {
                consumed = true;
            }
            if matched == Match::ByName {
                consumed = true;
                break;
            }
        }
        consumed
    }

    fn run_loops(&mut self) {
        let now = self.clock.now_protocol();
        let status = self.status(None);
        let Self {
            talkers,
            links,
            pending,
            ..
        } = self;
        for (index, talker) in talkers.iter_mut().enumerate() {
            let mut outbox = Dispatch {
                links: &mut *links,
                pending: &mut *pending,
                origin: Origin::None,
                source: None,
                talker: index,
            };
            let mut context =
                Context::new(talker.name().clone(), Origin::None, now, status, &mut outbox);
            talker.on_loop(&mut context);
        }
    }

    /// Deliver what was queued before the drain started
    ///
    /// Anything queued by these deliveries waits for the next tick.
    fn drain_pending(&mut self) {
        let now = self.clock.now_protocol();
        for _ in 0..self.pending.len() {
            let Some(Pending {
                message,
                origin,
                sender,
            }) = self.pending.pop_front()
            else {
                break;
            };
            self.deliver(&message, origin, None, Some(sender), now);
        }
    }
}

impl<TS: TimeSource, const MAX_TALKERS: usize, const MAX_LINKS: usize, const QUEUE_SIZE: usize>
    core::fmt::Debug for BroadcastRouter<'_, TS, MAX_TALKERS, MAX_LINKS, QUEUE_SIZE>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BroadcastRouter")
            .field("config", &self.config)
            .field("guard", &self.guard)
            .field("talkers", &self.talkers)
            .field("uplinks", &self.links.uplinks.len())
            .field("downlinks", &self.links.downlinks.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}
