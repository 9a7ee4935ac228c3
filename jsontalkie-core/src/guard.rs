//! Timestamp-based anti-replay guard for CALL-kind messages

use crate::error::TalkieError;

/// Plausibility window on the 16-bit clock; larger deltas are treated as wrap
pub const MAX_PACKET_LIFETIME_MS: u16 = 256;

/// Default tolerated reordering for datagram links
pub const DEFAULT_MAX_DELAY_MS: u16 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LastAccepted {
    remote: u16,
    local: u16,
}

/// Tracks the last accepted remote timestamp and when it was accepted
///
/// A `max_delay_ms` of 0 turns the guard off, for links that can neither
/// reorder nor duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayGuard {
    max_delay_ms: u16,
    drops: u16,
    last: Option<LastAccepted>,
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELAY_MS)
    }
}

impl ReplayGuard {
    pub const fn new(max_delay_ms: u16) -> Self {
        Self {
            max_delay_ms,
            drops: 0,
            last: None,
        }
    }

    pub fn max_delay_ms(&self) -> u16 {
        self.max_delay_ms
    }

    pub fn set_max_delay_ms(&mut self, max_delay_ms: u16) {
        self.max_delay_ms = max_delay_ms;
    }

    /// Number of dropped calls, wrapping
    pub fn drops(&self) -> u16 {
        self.drops
    }

    pub fn is_enabled(&self) -> bool {
        self.max_delay_ms != 0
    }

    /// Accept or drop a call stamped `remote` that arrived at local time `now`
    pub fn check(&mut self, remote: u16, now: u16) -> Result<(), TalkieError> {
        if !self.is_enabled() {
            return Ok(());
        }
        let Some(last) = self.last else {
            self.last = Some(LastAccepted { remote, local: now });
            return Ok(());
        };

        let remote_delay = last.remote.wrapping_sub(remote);
        let local_delay = now.wrapping_sub(last.local);
        if remote_delay > 0
            && remote_delay < MAX_PACKET_LIFETIME_MS
            && (remote_delay > self.max_delay_ms || local_delay > self.max_delay_ms)
        {
            self.drops = self.drops.wrapping_add(1);
            return Err(TalkieError::ReplayRejected {
                remote_delay,
                local_delay,
            });
        }

        self.last = Some(LastAccepted { remote, local: now });
        Ok(())
    }
}
