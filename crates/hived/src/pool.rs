//! HTTP peer pool: consistent-hash routing plus a blocking peer client.
//!
//! `HttpPool` is the node's `PeerPicker`; it owns the ring and one
//! `HttpFetcher` per peer. Membership changes replace the whole routing
//! state: a fresh ring is assembled off to the side and published
//! through an `Arc` swap, so a concurrent pick never observes a
//! half-built ring.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use hivecache::{Error, Fetcher, PeerPicker, Result, Ring};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::http::{encode_segment, Response};

/// URL prefix peers serve cache traffic under.
pub const DEFAULT_BASE_PATH: &str = "/_hivecache/";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const IO_TIMEOUT: Duration = Duration::from_secs(10);

struct PoolState {
    ring: Ring,
    fetchers: HashMap<String, Arc<HttpFetcher>>,
}

impl PoolState {
    fn empty() -> Self {
        Self {
            ring: Ring::default(),
            fetchers: HashMap::new(),
        }
    }
}

/// Routes keys across the peer fleet over HTTP.
pub struct HttpPool {
    self_addr: String,
    base_path: String,
    state: RwLock<Arc<PoolState>>,
}

impl HttpPool {
    /// Create a pool for the node listening at `self_addr`, using the
    /// default base path.
    pub fn new(self_addr: &str) -> Self {
        Self::with_base_path(self_addr, DEFAULT_BASE_PATH)
    }

    /// Create a pool with a custom URL prefix for peer traffic.
    pub fn with_base_path(self_addr: &str, base_path: &str) -> Self {
        Self {
            self_addr: self_addr.to_string(),
            base_path: base_path.to_string(),
            state: RwLock::new(Arc::new(PoolState::empty())),
        }
    }

    /// The URL prefix this pool routes under.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Replace the peer set wholesale.
    ///
    /// Builds a new ring and client map, then swaps them in atomically.
    /// The peer list should include this node's own address so the ring
    /// can route keys home.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let peers: Vec<String> = peers
            .into_iter()
            .map(|peer| peer.as_ref().to_string())
            .collect();

        let mut ring = Ring::default();
        ring.add(&peers);
        let fetchers: HashMap<String, Arc<HttpFetcher>> = peers
            .iter()
            .map(|peer| {
                (
                    peer.clone(),
                    Arc::new(HttpFetcher::new(peer, &self.base_path)),
                )
            })
            .collect();

        let count = fetchers.len();
        *self.state.write() = Arc::new(PoolState { ring, fetchers });
        info!("[{}] ring rebuilt with {} peers", self.self_addr, count);
    }
}

impl PeerPicker for HttpPool {
    fn pick(&self, key: &str) -> Option<Arc<dyn Fetcher>> {
        let state = Arc::clone(&self.state.read());
        let peer = state.ring.get(key)?;
        if peer == self.self_addr {
            return None;
        }
        let fetcher = state.fetchers.get(peer)?;
        debug!("[{}] pick peer {} for {:?}", self.self_addr, peer, key);
        Some(Arc::clone(fetcher) as Arc<dyn Fetcher>)
    }
}

/// Blocking HTTP client for one remote peer.
///
/// Opens a fresh connection per fetch, bounded by connect and I/O
/// timeouts; the group above absorbs failures with a local fallback, so
/// a slow peer costs one timeout, not a wedged node.
pub struct HttpFetcher {
    addr: String,
    base_path: String,
}

impl HttpFetcher {
    fn new(addr: &str, base_path: &str) -> Self {
        Self {
            addr: addr.to_string(),
            base_path: base_path.to_string(),
        }
    }

    fn do_fetch(&self, group: &str, key: &str) -> std::result::Result<Vec<u8>, String> {
        let addr = self
            .addr
            .to_socket_addrs()
            .map_err(|e| format!("resolve: {}", e))?
            .next()
            .ok_or("address resolves to nothing")?;

        let mut stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| format!("connect: {}", e))?;
        stream
            .set_read_timeout(Some(IO_TIMEOUT))
            .map_err(|e| format!("socket: {}", e))?;
        stream
            .set_write_timeout(Some(IO_TIMEOUT))
            .map_err(|e| format!("socket: {}", e))?;

        let request = format!(
            "GET {}{}/{} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            self.base_path,
            encode_segment(group),
            encode_segment(key),
            self.addr
        );
        stream
            .write_all(request.as_bytes())
            .map_err(|e| format!("send: {}", e))?;

        let mut raw = Vec::new();
        stream
            .read_to_end(&mut raw)
            .map_err(|e| format!("recv: {}", e))?;

        let mut buf = BytesMut::from(raw.as_slice());
        match Response::parse(&mut buf) {
            Ok(Some(response)) if response.status == 200 => Ok(response.body),
            Ok(Some(response)) => Err(format!("server returned {}", response.status)),
            Ok(None) => Err("truncated response".to_string()),
            Err(e) => Err(e),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, group: &str, key: &str) -> Result<Vec<u8>> {
        self.do_fetch(group, key)
            .map_err(|e| Error::Peer(format!("{}: {}", self.addr, e)))
    }
}
