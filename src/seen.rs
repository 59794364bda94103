//! Seen-set - deduplication ledger mapping mint addresses to alert expiry
//!
//! Guarantees at-most-one notification per identifier within the expiry
//! window, even under overlapping scan cycles: `check_and_mark` is a single
//! indivisible check-then-insert against the shard lock that DashMap holds
//! for the entry. Only identifiers are retained, never full records, so
//! memory stays bounded; expired entries are evicted lazily on access and by
//! a periodic [`SeenSet::sweep`].
//!
//! State is in-memory only. A process restart may reissue alerts for
//! recently-seen tokens; that is documented behavior, not a correctness bug.

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

/// Record of a prior alert. First-alert wins: a live entry is never replaced.
#[derive(Debug, Clone, Copy)]
pub struct SeenEntry {
    pub first_alert: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SeenEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Bounded, time-expiring record of previously alerted identifiers.
pub struct SeenSet {
    entries: DashMap<String, SeenEntry>,
    ttl: Duration,
}

impl SeenSet {
    /// `ttl` = how long an identifier stays suppressed after its first alert
    /// (default deployment value: 24 hours).
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::hours(24)),
        }
    }

    /// Atomically check whether `mint` has a live entry and, if not, insert
    /// one expiring `ttl` from `now`. Returns true exactly when the caller
    /// should proceed to notify.
    pub fn check_and_mark(&self, mint: &str, now: DateTime<Utc>) -> bool {
        let fresh = SeenEntry {
            first_alert: now,
            expires_at: now + self.ttl,
        };
        match self.entries.entry(mint.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    // Lazy eviction: expired entry replaced in place
                    occupied.insert(fresh);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                true
            }
        }
    }

    /// Whether `mint` currently has a live (unexpired) entry.
    pub fn is_live(&self, mint: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .get(mint)
            .map(|e| !e.is_expired(now))
            .unwrap_or(false)
    }

    /// Drop expired entries to bound memory. Call periodically. Removals are
    /// counted inside the retain pass; a before/after length diff would race
    /// with concurrent inserts.
    pub fn sweep(&self, now: DateTime<Utc>) {
        let mut removed = 0usize;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            debug!(removed, live = self.entries.len(), "seen-set sweep");
        }
    }

    /// Number of entries currently held (live and not-yet-swept expired).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
