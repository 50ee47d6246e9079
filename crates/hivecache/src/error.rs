//! Error types for hivecache

use std::fmt;

/// Result type alias for hivecache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache operations.
///
/// Variants carry rendered strings rather than source errors so that a
/// single-flight outcome can be cloned to every waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Get was called with an empty key
    EmptyKey,

    /// No group registered under this name
    GroupNotFound(String),

    /// The authoritative data source refused or failed
    Loader(String),

    /// A remote peer fetch failed (absorbed with local fallback)
    Peer(String),

    /// A peer picker was registered twice on the same group
    PeersAlreadyRegistered,

    /// A group with this name already exists in the registry
    DuplicateGroup(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyKey => write!(f, "key is required"),
            Error::GroupNotFound(name) => write!(f, "no such group: {}", name),
            Error::Loader(msg) => write!(f, "loader error: {}", msg),
            Error::Peer(msg) => write!(f, "peer fetch failed: {}", msg),
            Error::PeersAlreadyRegistered => {
                write!(f, "peer picker registered more than once")
            }
            Error::DuplicateGroup(name) => write!(f, "group already exists: {}", name),
        }
    }
}

impl std::error::Error for Error {}
