//! # JsonTalkie Std
//!
//! Standard library and Tokio support for JsonTalkie.
//!
//! This crate provides a UDP broadcast transport, a wall clock and a tick
//! driver for hosts. It re-exports all types from `jsontalkie-core` for
//! convenience.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! jsontalkie-std = "0.1"
//! ```
//!
//! ```rust,no_run
//! use jsontalkie_std::*;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> std::io::Result<()> {
//!     let mut udp = UdpTransport::bind(
//!         "0.0.0.0:5005".parse().unwrap(),
//!         "255.255.255.255:5005".parse().unwrap(),
//!     )
//!     .await?;
//!     let mut router = StdRouter::<4, 2, 8>::new(StdTimeSource::new(), RouterConfig::default());
//!     router.add_uplink(&mut udp).unwrap();
//!     drive(&mut router, DEFAULT_TICK_PERIOD, std::future::pending()).await;
//!     Ok(())
//! }
//! ```

pub mod driver;
pub mod time;
pub mod udp;

// Re-export core for convenience
pub use jsontalkie_core::*;

pub use driver::{drive, Tick, DEFAULT_TICK_PERIOD};
pub use time::StdTimeSource;
pub use udp::UdpTransport;

/// Router clocked by [`StdTimeSource`]
pub type StdRouter<'a, const MAX_TALKERS: usize, const MAX_LINKS: usize, const QUEUE_SIZE: usize> =
    BroadcastRouter<'a, StdTimeSource, MAX_TALKERS, MAX_LINKS, QUEUE_SIZE>;

/// Repeater clocked by [`StdTimeSource`]
pub type StdRepeater<'a, const MAX_LINKS: usize, const QUEUE_SIZE: usize> =
    Repeater<'a, StdTimeSource, MAX_LINKS, QUEUE_SIZE>;
