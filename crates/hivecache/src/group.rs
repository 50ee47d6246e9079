//! Group: a named cache namespace orchestrating hit / peer-fetch /
//! local-load.

use std::sync::Arc;
use std::time::Duration;

use hivelru::CacheStats;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::byteview::ByteView;
use crate::cache::{Cache, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};
use crate::error::{Error, Result};
use crate::peers::{Fetcher, PeerPicker};
use crate::singleflight::SingleFlight;

/// Read-through loader for the authoritative data source.
///
/// Must be safe to invoke concurrently for different keys; the group's
/// single-flight barrier serializes calls per key. Any closure of the
/// right shape is a loader:
///
/// ```
/// use hivecache::{Error, Group};
///
/// let group = Group::new("scores", 1024, |key: &str| match key {
///     "Tom" => Ok(b"630".to_vec()),
///     _ => Err(Error::Loader(format!("{} not exist", key))),
/// });
/// ```
pub trait Loader: Send + Sync {
    /// Load `key` from the authoritative source.
    fn load(&self, key: &str) -> Result<Vec<u8>>;
}

impl<F> Loader for F
where
    F: Fn(&str) -> Result<Vec<u8>> + Send + Sync,
{
    fn load(&self, key: &str) -> Result<Vec<u8>> {
        self(key)
    }
}

/// Tunables for a group's local cache.
#[derive(Debug, Clone)]
pub struct GroupOptions {
    /// Byte budget of the group's cache (0 = unbounded).
    pub cache_bytes: usize,
    /// TTL applied to locally loaded values (zero = never expire).
    pub default_ttl: Duration,
    /// Sweep interval for the expiration sweeper (`None` = disabled).
    pub sweep_interval: Option<Duration>,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            cache_bytes: 0,
            default_ttl: DEFAULT_TTL,
            sweep_interval: Some(DEFAULT_SWEEP_INTERVAL),
        }
    }
}

/// A named cache namespace with its own capacity and loader.
///
/// `get` consults the local cache, then the owning peer (when a
/// [`PeerPicker`] is registered and routes the key elsewhere), then the
/// loader. The whole miss path runs under a single-flight barrier, so
/// concurrent misses on one key cost one upstream call.
pub struct Group {
    name: String,
    loader: Box<dyn Loader>,
    main_cache: Cache,
    peers: RwLock<Option<Arc<dyn PeerPicker>>>,
    flight: SingleFlight<Result<ByteView>>,
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group").field("name", &self.name).finish()
    }
}

impl Group {
    /// Create a group with default TTL and sweep configuration.
    pub fn new(name: &str, cache_bytes: usize, loader: impl Loader + 'static) -> Self {
        Self::with_options(
            name,
            GroupOptions {
                cache_bytes,
                ..GroupOptions::default()
            },
            loader,
        )
    }

    /// Create a group with explicit cache tunables.
    pub fn with_options(name: &str, options: GroupOptions, loader: impl Loader + 'static) -> Self {
        Self {
            name: name.to_string(),
            loader: Box::new(loader),
            main_cache: Cache::with_config(
                options.cache_bytes,
                options.default_ttl,
                options.sweep_interval,
            ),
            peers: RwLock::new(None),
            flight: SingleFlight::new(),
        }
    }

    /// The group's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hit/miss/eviction counters of the group's local cache.
    pub fn stats(&self) -> &CacheStats {
        self.main_cache.stats()
    }

    /// Attach the peer routing capability.
    ///
    /// Picker identity is a deployment-time property; registering twice
    /// almost always signals a bug and is rejected.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) -> Result<()> {
        let mut peers = self.peers.write();
        if peers.is_some() {
            return Err(Error::PeersAlreadyRegistered);
        }
        *peers = Some(picker);
        Ok(())
    }

    /// Look up `key`, loading it through a peer or the loader on miss.
    pub fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }

        if let Some(view) = self.main_cache.get(key) {
            debug!("[{}] cache hit for {:?}", self.name, key);
            return Ok(view);
        }

        self.load(key)
    }

    /// Run the miss path under the single-flight barrier: try the owning
    /// peer first, then fall back to the local loader.
    fn load(&self, key: &str) -> Result<ByteView> {
        self.flight.run(key, || {
            let picker = self.peers.read().clone();
            if let Some(picker) = picker {
                if let Some(fetcher) = picker.pick(key) {
                    match self.get_from_peer(fetcher.as_ref(), key) {
                        Ok(view) => return Ok(view),
                        Err(err) => {
                            warn!(
                                "[{}] failed to fetch {:?} from peer: {}",
                                self.name, key, err
                            );
                        }
                    }
                }
            }
            self.get_locally(key)
        })
    }

    fn get_from_peer(&self, fetcher: &dyn Fetcher, key: &str) -> Result<ByteView> {
        let bytes = fetcher.fetch(&self.name, key)?;
        Ok(ByteView::from(bytes))
    }

    /// Invoke the loader and populate the local cache. Errors leave the
    /// cache untouched at `key`.
    fn get_locally(&self, key: &str) -> Result<ByteView> {
        let bytes = self.loader.load(key)?;
        let view = ByteView::from(bytes);
        self.main_cache.add(key, view.clone());
        Ok(view)
    }
}
