//! Consistent-hash ring mapping keys to peer identifiers.
//!
//! Each physical peer occupies `replicas` virtual positions on a u32
//! ring; a key belongs to the first position at or after its own hash,
//! wrapping at the top. Virtual nodes smooth the load so that adding or
//! removing one peer moves roughly `1/N` of the keyspace instead of
//! reshuffling everything.

use std::collections::HashMap;

/// Hash function over raw bytes used for ring positions and keys.
pub type HashFn = Box<dyn Fn(&[u8]) -> u32 + Send + Sync>;

/// Virtual-node consistent-hash ring.
///
/// The ring is not internally synchronized. Membership change is
/// wholesale replacement: build a fresh ring off to the side and publish
/// it atomically (see the peer pool in the daemon).
pub struct Ring {
    hash: HashFn,
    replicas: usize,
    positions: Vec<u32>,
    owners: HashMap<u32, String>,
}

impl Ring {
    /// Virtual nodes per peer used by [`Ring::default`].
    pub const DEFAULT_REPLICAS: usize = 50;

    /// Create a ring with CRC32-IEEE as the position hash.
    pub fn new(replicas: usize) -> Self {
        Self::with_hash(replicas, Box::new(crc32fast::hash))
    }

    /// Create a ring with a caller-supplied hash function.
    pub fn with_hash(replicas: usize, hash: HashFn) -> Self {
        Self {
            hash,
            replicas,
            positions: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Insert peers into the ring, `replicas` virtual positions each.
    ///
    /// Position `i` of a peer hashes the decimal index concatenated with
    /// the peer id. If two virtual positions collide, the later
    /// insertion owns the slot.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let position = (self.hash)(format!("{}{}", i, peer).as_bytes());
                self.positions.push(position);
                self.owners.insert(position, peer.to_string());
            }
        }
        self.positions.sort_unstable();
    }

    /// Map a key to the peer owning it; `None` on an empty ring.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.positions.is_empty() {
            return None;
        }
        let hash = (self.hash)(key.as_bytes());
        let idx = self.positions.partition_point(|&p| p < hash);
        let position = self.positions[idx % self.positions.len()];
        self.owners.get(&position).map(String::as_str)
    }

    /// Whether the ring has no peers.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Default for Ring {
    fn default() -> Self {
        Self::new(Self::DEFAULT_REPLICAS)
    }
}
