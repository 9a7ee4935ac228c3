//! # JsonTalkie Core
//!
//! Pure `no_std` core of the JsonTalkie peer-to-peer messaging protocol.
//!
//! This library contains the record codec, the integrity and anti-replay
//! checks, talker dispatch and the router. It is platform-agnostic and has no
//! async runtime dependencies; transports and clocks are plugged in through
//! [`Transport`] and [`TimeSource`].
//!
//! ## Features
//!
//! - **no_std** compatible - Fully embedded, no standard library
//! - **Heapless** - Every record lives in a fixed 128 byte buffer
//! - **Generic links** - SPI, UDP broadcast, UART or an in-process bus
//!   behind one trait
//! - **Configurable** - Compile-time capacities via const generics
//! - **defmt** - Optional `defmt::Format` for the error types
//!
//! ## Limitations
//!
//! - Flat records only: no nesting, escaping, floats or Unicode escapes
//! - One record per frame
//! - Single-threaded cooperative dispatch

#![cfg_attr(not(test), no_std)]

pub mod bus;
pub mod context;
pub mod error;
pub mod guard;
pub mod handoff;
pub mod manifesto;
pub mod protocol;
pub mod repeater;
pub mod router;
pub mod routing;
pub mod talker;
pub mod time;
pub mod traits;

pub use bus::{LocalBus, LocalPort};
pub use context::{Context, Outbox, RouterStatus};
pub use error::{Result, TalkieError, TransportError};
pub use guard::{ReplayGuard, DEFAULT_MAX_DELAY_MS, MAX_PACKET_LIFETIME_MS};
pub use handoff::{FrameHandoff, HandoffTransport};
pub use manifesto::{find_action, Action, Manifesto, NOT_FOUND};
pub use protocol::{
    checksum, key, trim_noise, Ack, CompactMessage, ErrorCode, MessageKind, SysCode, Value,
    ValueType, MESSAGE_CAPACITY, MIN_MESSAGE_LENGTH,
};
pub use repeater::Repeater;
pub use router::{BroadcastRouter, RouterConfig};
pub use routing::{LinkId, LinkRole, Match, Origin};
pub use talker::{Talker, TalkerName};
pub use time::{TickClock, TimeSource};
pub use traits::Transport;
