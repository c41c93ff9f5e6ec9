//! Cross-frame pool of physical GPU resources.
//!
//! The pool owns every physical texture, texture view, buffer and binding set
//! the render graph resolves transient resources to. Requests are matched
//! against existing entries by structural descriptor equality; a matching
//! entry is handed out again only once it is old enough not to be in use by
//! frames still in flight.
//!
//! # Reuse rules
//!
//! | Kind        | Eligible for reuse when              |
//! |-------------|--------------------------------------|
//! | texture     | `last_used_frame < current_frame`     |
//! | texture view| always (views are immutable lookups) |
//! | buffer      | `last_used_frame + 1 < current_frame` |
//! | binding set | `last_used_frame + 1 < current_frame` |
//!
//! Buffers and binding sets are typically rewritten by the CPU while a
//! previous frame may still read them, hence the extra frame of distance.
//!
//! # Eviction
//!
//! [`ResourcePool::evict_stale`] destroys entries not used for more than
//! [`PoolConfig::stale_frame_threshold`] frames. Views never outlive the
//! texture they look into.

use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{new_key_type, Key, SlotMap};

use crate::backend::GpuBackend;
use crate::error::{RdgError, RdgResult};
use crate::types::{BindingLayout, BufferDescriptor, TextureDescriptor, TextureViewDescriptor};

new_key_type! {
    /// Physical texture owned by a [`ResourcePool`].
    pub struct TextureKey;
    /// Physical texture view owned by a [`ResourcePool`].
    pub struct TextureViewKey;
    /// Physical buffer owned by a [`ResourcePool`].
    pub struct BufferKey;
    /// Binding set owned by a [`ResourcePool`].
    pub struct BindingSetKey;
}

/// Pool shared between threads of a frame driver.
pub type SharedResourcePool<B> = Arc<Mutex<ResourcePool<B>>>;

/// Pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Entries unused for more than this many frames are evicted.
    pub stale_frame_threshold: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            stale_frame_threshold: 2,
        }
    }
}

/// Number of live entries per resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub textures: usize,
    pub texture_views: usize,
    pub buffers: usize,
    pub binding_sets: usize,
}

impl PoolStats {
    /// Total number of pooled objects.
    pub fn total(&self) -> usize {
        self.textures + self.texture_views + self.buffers + self.binding_sets
    }
}

#[derive(Debug)]
struct PooledEntry<D, R> {
    descriptor: D,
    last_used_frame: u64,
    resource: R,
}

/// Find the first entry matching `descriptor` whose age passes `eligible`,
/// mark it used in `current_frame` and return its key.
fn reuse<K: Key, D: PartialEq, R>(
    entries: &mut SlotMap<K, PooledEntry<D, R>>,
    descriptor: &D,
    current_frame: u64,
    eligible: impl Fn(u64) -> bool,
) -> Option<K> {
    let (key, entry) = entries
        .iter_mut()
        .find(|(_, e)| e.descriptor == *descriptor && eligible(e.last_used_frame))?;
    entry.last_used_frame = current_frame;
    Some(key)
}

/// Remove every entry for which `stale` holds and return the removed values.
fn drain_where<K: Key, D, R>(
    entries: &mut SlotMap<K, PooledEntry<D, R>>,
    mut stale: impl FnMut(K, &PooledEntry<D, R>) -> bool,
) -> Vec<R> {
    let keys: Vec<K> = entries
        .iter()
        .filter(|(k, e)| stale(*k, e))
        .map(|(k, _)| k)
        .collect();
    keys.into_iter()
        .filter_map(|k| entries.remove(k))
        .map(|e| e.resource)
        .collect()
}

/// Physical resources reusable across frames.
///
/// The pool performs no internal locking. Wrap it in a
/// [`SharedResourcePool`] when more than one thread needs it.
pub struct ResourcePool<B: GpuBackend> {
    config: PoolConfig,
    current_frame: u64,
    textures: SlotMap<TextureKey, PooledEntry<TextureDescriptor, B::Texture>>,
    texture_views: SlotMap<TextureViewKey, PooledEntry<TextureViewDescriptor, B::TextureView>>,
    buffers: SlotMap<BufferKey, PooledEntry<BufferDescriptor, B::Buffer>>,
    binding_sets: SlotMap<BindingSetKey, PooledEntry<BindingLayout, B::BindingSet>>,
}

impl<B: GpuBackend> ResourcePool<B> {
    /// Create an empty pool at frame 0.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            current_frame: 0,
            textures: SlotMap::with_key(),
            texture_views: SlotMap::with_key(),
            buffers: SlotMap::with_key(),
            binding_sets: SlotMap::with_key(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The frame number requests are currently stamped with.
    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    /// Move to the next frame and return its number.
    pub fn advance_frame(&mut self) -> u64 {
        self.current_frame += 1;
        self.current_frame
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            textures: self.textures.len(),
            texture_views: self.texture_views.len(),
            buffers: self.buffers.len(),
            binding_sets: self.binding_sets.len(),
        }
    }

    // === Acquisition ===

    /// Get a texture matching `descriptor` that was not handed out this
    /// frame, creating one if needed.
    pub fn get_or_create_texture(
        &mut self,
        backend: &B,
        descriptor: &TextureDescriptor,
    ) -> RdgResult<TextureKey> {
        let current = self.current_frame;
        if let Some(key) = reuse(&mut self.textures, descriptor, current, |last| last < current) {
            log::trace!("pool: reusing texture {key:?} in frame {current}");
            return Ok(key);
        }

        let resource = backend.create_texture(descriptor)?;
        let key = self.textures.insert(PooledEntry {
            descriptor: *descriptor,
            last_used_frame: current,
            resource,
        });
        log::trace!("pool: created texture {key:?} in frame {current}");
        Ok(key)
    }

    /// Get a view matching `descriptor`, creating one if needed.
    ///
    /// Views are shared freely, including within one frame.
    pub fn get_or_create_texture_view(
        &mut self,
        backend: &B,
        descriptor: &TextureViewDescriptor,
    ) -> RdgResult<TextureViewKey> {
        let current = self.current_frame;
        if let Some(key) = reuse(&mut self.texture_views, descriptor, current, |_| true) {
            return Ok(key);
        }

        let texture = self
            .textures
            .get(descriptor.texture)
            .ok_or(RdgError::UnknownTexture(descriptor.texture))?;
        let resource = backend.create_texture_view(&texture.resource, descriptor)?;
        let key = self.texture_views.insert(PooledEntry {
            descriptor: *descriptor,
            last_used_frame: current,
            resource,
        });
        log::trace!("pool: created view {key:?} of {:?}", descriptor.texture);
        Ok(key)
    }

    /// Get a buffer matching `descriptor` that was last used at least two
    /// frames ago, creating one if needed.
    pub fn get_or_create_buffer(
        &mut self,
        backend: &B,
        descriptor: &BufferDescriptor,
    ) -> RdgResult<BufferKey> {
        let current = self.current_frame;
        if let Some(key) = reuse(&mut self.buffers, descriptor, current, |last| {
            last.saturating_add(1) < current
        }) {
            log::trace!("pool: reusing buffer {key:?} in frame {current}");
            return Ok(key);
        }

        let resource = backend.create_buffer(descriptor)?;
        let key = self.buffers.insert(PooledEntry {
            descriptor: *descriptor,
            last_used_frame: current,
            resource,
        });
        log::trace!("pool: created buffer {key:?} in frame {current}");
        Ok(key)
    }

    /// Get a binding set for `layout` that was last used at least two frames
    /// ago, creating one if needed.
    pub fn get_or_create_binding_set(
        &mut self,
        backend: &B,
        layout: &BindingLayout,
    ) -> RdgResult<BindingSetKey> {
        let current = self.current_frame;
        if let Some(key) = reuse(&mut self.binding_sets, layout, current, |last| {
            last.saturating_add(1) < current
        }) {
            return Ok(key);
        }

        let resource = backend.create_binding_set(layout)?;
        let key = self.binding_sets.insert(PooledEntry {
            descriptor: layout.clone(),
            last_used_frame: current,
            resource,
        });
        log::trace!("pool: created binding set {key:?} in frame {current}");
        Ok(key)
    }

    // === Access ===

    pub fn texture(&self, key: TextureKey) -> Option<&B::Texture> {
        self.textures.get(key).map(|e| &e.resource)
    }

    pub fn texture_descriptor(&self, key: TextureKey) -> Option<&TextureDescriptor> {
        self.textures.get(key).map(|e| &e.descriptor)
    }

    pub fn texture_view(&self, key: TextureViewKey) -> Option<&B::TextureView> {
        self.texture_views.get(key).map(|e| &e.resource)
    }

    pub fn buffer(&self, key: BufferKey) -> Option<&B::Buffer> {
        self.buffers.get(key).map(|e| &e.resource)
    }

    pub fn buffer_descriptor(&self, key: BufferKey) -> Option<&BufferDescriptor> {
        self.buffers.get(key).map(|e| &e.descriptor)
    }

    pub fn binding_set(&self, key: BindingSetKey) -> Option<&B::BindingSet> {
        self.binding_sets.get(key).map(|e| &e.resource)
    }

    // === Teardown ===

    /// Destroy every entry unused for more than the stale threshold.
    ///
    /// Views whose texture is evicted go with it and are destroyed first.
    /// Returns the number of destroyed objects.
    pub fn evict_stale(&mut self, backend: &B) -> usize {
        let current = self.current_frame;
        let threshold = self.config.stale_frame_threshold;
        let is_stale = |last: u64| last.saturating_add(threshold) < current;

        let textures = drain_where(&mut self.textures, |_, e| is_stale(e.last_used_frame));
        let live_textures = &self.textures;
        let views = drain_where(&mut self.texture_views, |_, e| {
            is_stale(e.last_used_frame) || !live_textures.contains_key(e.descriptor.texture)
        });
        let buffers = drain_where(&mut self.buffers, |_, e| is_stale(e.last_used_frame));
        let binding_sets = drain_where(&mut self.binding_sets, |_, e| is_stale(e.last_used_frame));

        let evicted = textures.len() + views.len() + buffers.len() + binding_sets.len();
        for view in views {
            backend.destroy_texture_view(view);
        }
        for texture in textures {
            backend.destroy_texture(texture);
        }
        for buffer in buffers {
            backend.destroy_buffer(buffer);
        }
        for set in binding_sets {
            backend.destroy_binding_set(set);
        }

        if evicted > 0 {
            log::debug!("pool: evicted {evicted} stale resources in frame {current}");
        }
        evicted
    }

    /// Destroy everything the pool owns.
    pub fn destroy_all(&mut self, backend: &B) {
        let stats = self.stats();
        for (_, entry) in self.texture_views.drain() {
            backend.destroy_texture_view(entry.resource);
        }
        for (_, entry) in self.textures.drain() {
            backend.destroy_texture(entry.resource);
        }
        for (_, entry) in self.buffers.drain() {
            backend.destroy_buffer(entry.resource);
        }
        for (_, entry) in self.binding_sets.drain() {
            backend.destroy_binding_set(entry.resource);
        }
        log::debug!("pool: destroyed {} resources", stats.total());
    }
}

impl<B: GpuBackend> Default for ResourcePool<B> {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl<B: GpuBackend> std::fmt::Debug for ResourcePool<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("current_frame", &self.current_frame)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<B: GpuBackend> Drop for ResourcePool<B> {
    fn drop(&mut self) {
        let stats = self.stats();
        if stats.total() > 0 {
            log::warn!(
                "ResourcePool dropped with {} live resources; call destroy_all first",
                stats.total()
            );
        }
    }
}

static_assertions::assert_impl_all!(ResourcePool<crate::backend::dummy::DummyBackend>: Send, Sync);
