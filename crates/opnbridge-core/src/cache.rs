// ── Short-lived status cache ──
//
// Last-known enabled flag per rule, with the time it was observed. Reads
// within the TTL are served from here; anything older forces a remote read.
// Entries are never evicted: the key space is the configured rule set.
//
// Each entry also remembers when the read behind it was issued. A read that
// was issued before the current entry's read (or write) cannot replace it,
// so a slow read never overwrites a toggle committed while it was in flight.

use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry as Slot;
use tokio::time::Instant;
use tracing::debug;

/// Default freshness window for cached rule states.
pub const DEFAULT_STATUS_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy)]
struct Entry {
    enabled: bool,
    observed_at: Instant,
    /// When the remote state behind `enabled` was requested.
    issued_at: Instant,
}

/// Per-rule last-known enabled flag with observation age.
#[derive(Debug)]
pub struct StatusCache {
    ttl: Duration,
    entries: DashMap<String, Entry>,
}

impl StatusCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value and how long ago it was observed, regardless of age.
    pub fn get(&self, key: &str) -> Option<(bool, Duration)> {
        self.entries
            .get(key)
            .map(|e| (e.enabled, e.observed_at.elapsed()))
    }

    /// The cached value only if it was observed less than one TTL ago.
    pub fn get_fresh(&self, key: &str) -> Option<bool> {
        self.get(key)
            .filter(|(_, age)| *age < self.ttl)
            .map(|(enabled, _)| enabled)
    }

    /// Record a value known to be current now, such as a committed toggle.
    pub fn put(&self, key: &str, enabled: bool) {
        self.put_observed(key, enabled, Instant::now());
    }

    /// Record the result of a read issued at `issued_at`.
    ///
    /// Ignored if the current entry comes from a later read or write.
    /// Returns the value cached afterwards.
    pub fn put_observed(&self, key: &str, enabled: bool, issued_at: Instant) -> bool {
        let entry = Entry {
            enabled,
            observed_at: Instant::now(),
            issued_at,
        };
        match self.entries.entry(key.to_owned()) {
            Slot::Occupied(mut slot) => {
                if slot.get().issued_at > issued_at {
                    debug!(rule = key, discarded = enabled, "ignoring read older than cached state");
                    return slot.get().enabled;
                }
                slot.insert(entry);
            }
            Slot::Vacant(slot) => {
                slot.insert(entry);
            }
        }
        enabled
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_TTL)
    }
}
