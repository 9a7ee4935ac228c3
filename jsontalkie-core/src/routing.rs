//! Per-message routing classification

/// Where a message being dispatched came from
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Received from a transport
    Remote,
    /// Posted by a talker to its siblings in the same router
    Local,
    /// Looped back into the talker that posted it
    Loopback,
    /// Already handled, nothing left to route
    None,
}

/// How a message's target relates to a talker
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Match {
    /// No target and a broadcastable kind
    Any,
    ByChannel,
    /// Fan-out stops at this talker
    ByName,
    Fail,
}

impl Match {
    pub const fn is_match(self) -> bool {
        !matches!(self, Match::Fail)
    }
}

/// Side of the router a link belongs to
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LinkRole {
    /// Toward the wide side the traffic originates from
    Uplink,
    /// Toward the local bus
    Downlink,
}

/// Position of a link inside its router
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LinkId {
    pub role: LinkRole,
    pub index: usize,
}

impl LinkId {
    pub const fn uplink(index: usize) -> Self {
        Self {
            role: LinkRole::Uplink,
            index,
        }
    }

    pub const fn downlink(index: usize) -> Self {
        Self {
            role: LinkRole::Downlink,
            index,
        }
    }
}
