//! Lookup and eviction counters for a cache.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters driven by the two events a cache emits: a lookup (hit or
/// miss) and an insert (which may displace entries to stay in budget).
///
/// All updates are relaxed atomics; totals are eventually consistent
/// under concurrency but never torn. Shared by reference between a
/// cache and whoever reports on it.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time copy of the counters, for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Lookups that found a live entry.
    pub hits: u64,
    /// Lookups that found nothing (or only an expired entry).
    pub misses: u64,
    /// Values written into the cache.
    pub inserts: u64,
    /// Entries displaced by capacity or reclaimed by expiry.
    pub evictions: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hits / {} misses, {} inserts, {} evictions",
            self.hits, self.misses, self.inserts, self.evictions
        )
    }
}

impl CacheStats {
    /// Create a zeroed tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one lookup.
    pub fn on_lookup(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record one insert together with the entries it displaced.
    ///
    /// Byte-budgeted inserts can evict several victims at once, so the
    /// eviction count rides along with the insert instead of being
    /// reported entry by entry.
    pub fn on_insert(&self, evicted: u64) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
    }

    /// Record entries reclaimed outside the insert path (the
    /// expiration sweeper, explicit removal).
    pub fn on_reclaim(&self, reclaimed: u64) {
        if reclaimed > 0 {
            self.evictions.fetch_add(reclaimed, Ordering::Relaxed);
        }
    }

    /// Lookups that hit.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that missed.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Total lookups.
    pub fn lookups(&self) -> u64 {
        self.hits() + self.misses()
    }

    /// Values written.
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Entries displaced or reclaimed.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Fraction of lookups that hit, in `[0.0, 1.0]`; 0.0 before any
    /// lookup.
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits();
        let lookups = hits + self.misses();
        if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        }
    }

    /// Copy the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            inserts: self.inserts(),
            evictions: self.evictions(),
        }
    }

    /// Zero all counters.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.inserts.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_outcomes_split_hit_miss() {
        let stats = CacheStats::new();

        stats.on_lookup(true);
        stats.on_lookup(true);
        stats.on_lookup(false);

        assert_eq!(stats.hits(), 2);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.lookups(), 3);
        assert_eq!(stats.hit_ratio(), 2.0 / 3.0);
    }

    #[test]
    fn test_insert_carries_eviction_count() {
        let stats = CacheStats::new();

        stats.on_insert(0);
        stats.on_insert(3);

        assert_eq!(stats.inserts(), 2);
        assert_eq!(stats.evictions(), 3);
    }

    #[test]
    fn test_reclaim_counts_as_eviction() {
        let stats = CacheStats::new();

        stats.on_insert(1);
        stats.on_reclaim(2);
        stats.on_reclaim(0);

        assert_eq!(stats.evictions(), 3);
    }

    #[test]
    fn test_hit_ratio_before_any_lookup() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_ratio(), 0.0);
    }

    #[test]
    fn test_snapshot_and_reset() {
        let stats = CacheStats::new();

        stats.on_lookup(true);
        stats.on_lookup(false);
        stats.on_insert(1);

        let snapshot = stats.snapshot();
        assert_eq!(
            snapshot,
            StatsSnapshot {
                hits: 1,
                misses: 1,
                inserts: 1,
                evictions: 1,
            }
        );
        assert_eq!(snapshot.to_string(), "1 hits / 1 misses, 1 inserts, 1 evictions");

        stats.reset();
        assert_eq!(stats.lookups(), 0);
        assert_eq!(stats.snapshot(), StatsSnapshot {
            hits: 0,
            misses: 0,
            inserts: 0,
            evictions: 0,
        });
    }
}
