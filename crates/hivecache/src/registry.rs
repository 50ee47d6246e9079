//! Name → group registry.
//!
//! A registry is an explicit handle passed through construction rather
//! than process-global state, so tests stay hermetic and several
//! registries can coexist in one process.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::group::{Group, GroupOptions, Loader};

/// Process-level mapping from group name to [`Group`].
///
/// Creation takes the write lock, lookup the read lock; reads dominate
/// once the topology is wired up.
#[derive(Default)]
pub struct Registry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a group with default cache tunables.
    ///
    /// Name collisions are rejected; a second group under an existing
    /// name is always a wiring mistake.
    pub fn new_group(
        &self,
        name: &str,
        cache_bytes: usize,
        loader: impl Loader + 'static,
    ) -> Result<Arc<Group>> {
        self.new_group_with(
            name,
            GroupOptions {
                cache_bytes,
                ..GroupOptions::default()
            },
            loader,
        )
    }

    /// Create and register a group with explicit cache tunables.
    pub fn new_group_with(
        &self,
        name: &str,
        options: GroupOptions,
        loader: impl Loader + 'static,
    ) -> Result<Arc<Group>> {
        let mut groups = self.groups.write();
        if groups.contains_key(name) {
            return Err(Error::DuplicateGroup(name.to_string()));
        }
        let group = Arc::new(Group::with_options(name, options, loader));
        groups.insert(name.to_string(), Arc::clone(&group));
        Ok(group)
    }

    /// Look up a group by name.
    pub fn get(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    /// Number of registered groups.
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Check if no groups are registered.
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}
