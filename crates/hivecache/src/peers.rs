//! Capability interfaces to the routing and RPC layer.
//!
//! The core never talks to the network itself: a [`PeerPicker`] decides
//! which node owns a key, and a [`Fetcher`] performs the remote read.
//! Both are supplied by the boundary glue (the daemon's HTTP pool in
//! this workspace).

use std::sync::Arc;

use crate::error::Result;

/// Routes a key to the peer that owns it.
pub trait PeerPicker: Send + Sync {
    /// Pick the owner of `key`.
    ///
    /// Returns `None` when the owner is the local node or when no peer
    /// is configured, in which case the caller takes the local path.
    fn pick(&self, key: &str) -> Option<Arc<dyn Fetcher>>;
}

/// Reads a value from one remote peer.
///
/// Implementations are expected to carry their own timeouts and wire
/// discipline; the core treats `fetch` as an opaque, possibly slow call.
pub trait Fetcher: Send + Sync {
    /// Fetch `key` from `group` on the remote peer.
    fn fetch(&self, group: &str, key: &str) -> Result<Vec<u8>>;
}
