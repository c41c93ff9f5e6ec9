//! Per-frame access state tracking.

use std::collections::HashMap;

use crate::pool::{BufferKey, TextureKey};
use crate::types::AccessState;

/// Index of a caller-owned resource registered on a graph builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalKey(pub(crate) u32);

/// Identity of a physical resource for access tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Texture(TextureKey),
    Buffer(BufferKey),
    External(ExternalKey),
}

impl From<TextureKey> for ResourceKey {
    fn from(key: TextureKey) -> Self {
        Self::Texture(key)
    }
}

impl From<BufferKey> for ResourceKey {
    fn from(key: BufferKey) -> Self {
        Self::Buffer(key)
    }
}

impl From<ExternalKey> for ResourceKey {
    fn from(key: ExternalKey) -> Self {
        Self::External(key)
    }
}

/// Current access state of every resource the graph knows about.
///
/// A resource enters the tracker either when it is registered as external or
/// when a transient handle resolves to it. Barriers are only legal for
/// resources the tracker already knows.
#[derive(Debug, Default)]
pub struct AccessTracker {
    states: HashMap<ResourceKey, AccessState>,
}

impl AccessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, or `None` if the resource was never registered.
    pub fn get(&self, key: ResourceKey) -> Option<AccessState> {
        self.states.get(&key).copied()
    }

    /// Record `state` as the current state of `key`, registering it if needed.
    pub fn set(&mut self, key: ResourceKey, state: AccessState) {
        self.states.insert(key, state);
    }

    /// Mark a freshly resolved resource as holding undefined contents.
    pub fn reset(&mut self, key: ResourceKey) {
        self.set(key, AccessState::None);
    }

    pub fn contains(&self, key: ResourceKey) -> bool {
        self.states.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
