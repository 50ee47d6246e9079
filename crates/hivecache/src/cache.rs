//! Mutex-guarded per-group cache with lazy construction and a
//! background expiration sweeper.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hivelru::{CacheStats, Lru};
use parking_lot::Mutex;
use tracing::debug;

use crate::byteview::ByteView;

/// Default entry TTL when the caller does not pass one.
pub(crate) const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Default interval between expiration sweeps.
pub(crate) const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Sweeper {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Group-local cache: a byte-budgeted [`Lru`] behind a mutex.
///
/// The inner LRU is built on first `add`, so a group that is never
/// written allocates nothing. The sweeper thread starts at the same
/// moment and reclaims expired entries from the cold end of the list;
/// it shares the cache mutex, taking it once per sweep.
pub struct Cache {
    inner: Arc<Mutex<Option<Lru<ByteView>>>>,
    cache_bytes: usize,
    default_ttl: Duration,
    sweep_interval: Option<Duration>,
    sweeper: Mutex<Option<Sweeper>>,
    stats: Arc<CacheStats>,
}

impl Cache {
    /// Create a cache with the given byte budget (0 = unbounded) and
    /// the default TTL and sweep interval.
    pub fn new(cache_bytes: usize) -> Self {
        Self::with_config(cache_bytes, DEFAULT_TTL, Some(DEFAULT_SWEEP_INTERVAL))
    }

    /// Create a cache with explicit expiry configuration.
    ///
    /// A zero `default_ttl` means entries never expire unless a TTL is
    /// passed explicitly; `None` for `sweep_interval` disables the
    /// background sweeper (expiry is still enforced on access).
    pub fn with_config(
        cache_bytes: usize,
        default_ttl: Duration,
        sweep_interval: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            cache_bytes,
            default_ttl,
            sweep_interval,
            sweeper: Mutex::new(None),
            stats: Arc::new(CacheStats::new()),
        }
    }

    /// Insert a value with the default TTL.
    pub fn add(&self, key: &str, value: ByteView) {
        self.add_with_ttl(key, value, self.default_ttl);
    }

    /// Insert a value with an explicit TTL (zero = never expires).
    pub fn add_with_ttl(&self, key: &str, value: ByteView, ttl: Duration) {
        {
            let mut inner = self.inner.lock();
            let lru = inner.get_or_insert_with(|| Lru::new(self.cache_bytes));
            let evicted = lru.add(key, value, ttl);
            self.stats.on_insert(evicted as u64);
        }
        self.ensure_sweeper();
    }

    /// Look up a value, refreshing its recency.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        let found = {
            let mut inner = self.inner.lock();
            inner.as_mut().and_then(|lru| lru.get(key).cloned())
        };
        self.stats.on_lookup(found.is_some());
        found
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().as_ref().map_or(0, Lru::len)
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hit/miss/eviction counters for this cache.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Stop the background sweeper and wait for it to exit. Idempotent;
    /// also runs on drop. Expiry stays enforced on the access paths.
    pub fn stop(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            let _ = sweeper.stop.send(());
            let _ = sweeper.handle.join();
        }
    }

    fn ensure_sweeper(&self) {
        let Some(interval) = self.sweep_interval else {
            return;
        };
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let stats = Arc::clone(&self.stats);
        let (stop, ticks) = mpsc::channel::<()>();
        let handle = thread::spawn(move || loop {
            match ticks.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    let removed = inner.lock().as_mut().map_or(0, Lru::purge_overdue);
                    if removed > 0 {
                        stats.on_reclaim(removed as u64);
                        debug!("sweeper reclaimed {} expired entries", removed);
                    }
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            }
        });
        *sweeper = Some(Sweeper { stop, handle });
    }
}

impl Drop for Cache {
    fn drop(&mut self) {
        self.stop();
    }
}
