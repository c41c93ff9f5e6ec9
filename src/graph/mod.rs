//! Per-frame render dependency graph.
//!
//! A [`GraphBuilder`] collects transient resource declarations and passes for
//! one frame, then [`GraphBuilder::execute`] resolves every transient handle
//! to a physical resource and runs the passes in stage order.
//!
//! # Resolution
//!
//! Each transient resource is resolved once, at the first pass that touches
//! it. Before asking the pool, the builder looks for a physical resource it
//! already handed out this frame with the same descriptor whose last use
//! comes strictly before this resource's first use. Such resources share
//! memory. Freshly resolved resources always start in
//! [`AccessState::None`].
//!
//! # Example
//!
//! ```
//! use redlilium_rdg::backend::dummy::DummyBackend;
//! use redlilium_rdg::backend::GpuBackend;
//! use redlilium_rdg::graph::{GraphBuilder, PassStage};
//! use redlilium_rdg::pool::ResourcePool;
//! use redlilium_rdg::types::{AccessState, TextureDescriptor, TextureFormat, TextureUsage};
//!
//! let backend = DummyBackend::new();
//! let mut pool = ResourcePool::default();
//! let mut cmd = backend.begin_commands().unwrap();
//!
//! let mut graph = GraphBuilder::new(&backend, &mut pool);
//! let desc = TextureDescriptor::new_2d(
//!     1920,
//!     1080,
//!     TextureFormat::Rgba16Float,
//!     TextureUsage::RENDER_ATTACHMENT,
//! );
//! let albedo = graph.create_texture("Albedo", desc);
//! graph.add_pass("gbuffer", &[albedo], &[], PassStage::Opaque, move |ctx, cmd| {
//!     let key = ctx.texture(albedo).unwrap();
//!     ctx.barrier(cmd, key, AccessState::RenderTarget);
//! });
//! graph.execute(&mut cmd).unwrap();
//! assert!(graph.texture(albedo).is_some());
//!
//! drop(graph);
//! pool.destroy_all(&backend);
//! ```

mod access;
mod pass;
mod resource;

pub use access::{AccessTracker, ExternalKey, ResourceKey};
pub use pass::{PassContext, PassFn, PassIndex, PassStage, MAX_PASSES_PER_STAGE, STAGE_COUNT};
pub use resource::{BufferHandle, TextureHandle};

use crate::backend::GpuBackend;
use crate::error::RdgResult;
use crate::pool::{BufferKey, ResourcePool, TextureKey};
use crate::types::{AccessState, BufferDescriptor, TextureDescriptor};

use pass::Pass;
use resource::{
    adopt_alias, resolved_key, AliasEntry, PhysicalResource, VirtualBuffer, VirtualResource,
    VirtualTexture,
};

/// Builder for one frame's render graph.
///
/// Borrows the backend and the pool for the frame; owns the virtual resource
/// tables, registered passes and the access tracker.
pub struct GraphBuilder<'a, B: GpuBackend> {
    backend: &'a B,
    pool: &'a mut ResourcePool<B>,
    textures: Vec<VirtualTexture>,
    buffers: Vec<VirtualBuffer>,
    externals: Vec<PhysicalResource<'a, B>>,
    access: AccessTracker,
    stages: [Vec<Pass<'a, B>>; STAGE_COUNT],
}

impl<'a, B: GpuBackend> GraphBuilder<'a, B> {
    pub fn new(backend: &'a B, pool: &'a mut ResourcePool<B>) -> Self {
        Self {
            backend,
            pool,
            textures: Vec::new(),
            buffers: Vec::new(),
            externals: Vec::new(),
            access: AccessTracker::new(),
            stages: Default::default(),
        }
    }

    // === Declaration ===

    /// Declare a transient texture. Names need not be unique.
    pub fn create_texture(&mut self, name: &str, descriptor: TextureDescriptor) -> TextureHandle {
        let handle = TextureHandle::from_index(self.textures.len());
        self.textures.push(VirtualResource::new(name, descriptor));
        handle
    }

    /// Declare a transient buffer. Names need not be unique.
    pub fn create_buffer(&mut self, name: &str, descriptor: BufferDescriptor) -> BufferHandle {
        let handle = BufferHandle::from_index(self.buffers.len());
        self.buffers.push(VirtualResource::new(name, descriptor));
        handle
    }

    /// Make a caller-owned texture known to the access tracker.
    ///
    /// The texture is never pooled or aliased.
    pub fn register_external_texture(
        &mut self,
        texture: &'a B::Texture,
        access: AccessState,
    ) -> ExternalKey {
        self.register_external(PhysicalResource::Texture(texture), access)
    }

    /// Make a caller-owned buffer known to the access tracker.
    pub fn register_external_buffer(
        &mut self,
        buffer: &'a B::Buffer,
        access: AccessState,
    ) -> ExternalKey {
        self.register_external(PhysicalResource::Buffer(buffer), access)
    }

    fn register_external(
        &mut self,
        resource: PhysicalResource<'a, B>,
        access: AccessState,
    ) -> ExternalKey {
        let Ok(raw) = u32::try_from(self.externals.len()) else {
            panic!("external resource table is full");
        };
        let key = ExternalKey(raw);
        self.externals.push(resource);
        self.access.set(key.into(), access);
        key
    }

    /// First texture declared under `name`, or [`TextureHandle::INVALID`].
    pub fn find_texture(&self, name: &str) -> TextureHandle {
        match self.textures.iter().position(|t| t.name == name) {
            Some(index) => TextureHandle::from_index(index),
            None => {
                log::error!("no texture named '{name}' in this graph");
                TextureHandle::INVALID
            }
        }
    }

    /// First buffer declared under `name`, or [`BufferHandle::INVALID`].
    pub fn find_buffer(&self, name: &str) -> BufferHandle {
        match self.buffers.iter().position(|b| b.name == name) {
            Some(index) => BufferHandle::from_index(index),
            None => {
                log::error!("no buffer named '{name}' in this graph");
                BufferHandle::INVALID
            }
        }
    }

    /// Register a pass in `stage` touching the listed transient resources.
    ///
    /// Handles this builder never issued are logged and left out.
    ///
    /// # Panics
    ///
    /// Panics if `stage` already holds [`MAX_PASSES_PER_STAGE`] passes.
    pub fn add_pass<F>(
        &mut self,
        name: &str,
        textures: &[TextureHandle],
        buffers: &[BufferHandle],
        stage: PassStage,
        run: F,
    ) -> PassIndex
    where
        F: FnOnce(&mut PassContext<'_, 'a, B>, &mut B::CommandBuffer) + 'a,
    {
        let position = self.stages[stage.index()].len();
        assert!(
            position < MAX_PASSES_PER_STAGE,
            "stage {stage} already holds {MAX_PASSES_PER_STAGE} passes, cannot add '{name}'"
        );
        let index = PassIndex::new(stage, position);

        let textures = touch_all(&mut self.textures, textures, index, name, "texture", |h| {
            h.index()
        });
        let buffers = touch_all(&mut self.buffers, buffers, index, name, "buffer", |h| h.index());

        self.stages[stage.index()].push(Pass {
            name: name.to_string(),
            index,
            textures,
            buffers,
            run: Box::new(run),
        });
        index
    }

    // === Queries ===

    /// Physical texture `handle` resolved to, once executed.
    pub fn texture(&self, handle: TextureHandle) -> Option<TextureKey> {
        resolved_key(&self.textures, handle.index(), "texture")
    }

    /// Physical buffer `handle` resolved to, once executed.
    pub fn buffer(&self, handle: BufferHandle) -> Option<BufferKey> {
        resolved_key(&self.buffers, handle.index(), "buffer")
    }

    /// First and last pass index using `handle`, if any pass does.
    pub fn texture_lifetime(&self, handle: TextureHandle) -> Option<(u32, u32)> {
        self.textures
            .get(handle.index())
            .filter(|t| t.is_used())
            .map(|t| (t.first_pass, t.last_pass))
    }

    pub fn buffer_lifetime(&self, handle: BufferHandle) -> Option<(u32, u32)> {
        self.buffers
            .get(handle.index())
            .filter(|b| b.is_used())
            .map(|b| (b.first_pass, b.last_pass))
    }

    pub fn access_state(&self, resource: impl Into<ResourceKey>) -> Option<AccessState> {
        self.access.get(resource.into())
    }

    /// Number of passes waiting to execute.
    pub fn pass_count(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }

    pub fn pool(&self) -> &ResourcePool<B> {
        &*self.pool
    }

    // === Recording ===

    /// Tracked barrier outside any pass; see [`PassContext::barrier`].
    pub fn barrier(
        &mut self,
        cmd: &mut B::CommandBuffer,
        resource: impl Into<ResourceKey>,
        new: AccessState,
    ) {
        self.context().barrier(cmd, resource, new);
    }

    /// Tracked buffer fill outside any pass; see [`PassContext::fill`].
    pub fn fill(
        &mut self,
        cmd: &mut B::CommandBuffer,
        buffer: impl Into<ResourceKey>,
        size: u64,
        offset: u64,
        value: u32,
        new: AccessState,
    ) {
        self.context().fill(cmd, buffer, size, offset, value, new);
    }

    fn context(&mut self) -> PassContext<'_, 'a, B> {
        PassContext {
            backend: self.backend,
            pool: &mut *self.pool,
            textures: &self.textures,
            buffers: &self.buffers,
            externals: &self.externals,
            access: &mut self.access,
        }
    }

    // === Execution ===

    /// Resolve transient resources and run every pass in stage order.
    ///
    /// Passes run at most once; a second call only runs passes added since.
    pub fn execute(&mut self, cmd: &mut B::CommandBuffer) -> RdgResult<()> {
        let stages = std::mem::take(&mut self.stages);
        let mut texture_aliases: Vec<AliasEntry<TextureDescriptor, TextureKey>> = Vec::new();
        let mut buffer_aliases: Vec<AliasEntry<BufferDescriptor, BufferKey>> = Vec::new();
        let mut executed = 0usize;

        for pass in stages.into_iter().flatten() {
            for handle in &pass.textures {
                let Some(res) = self.textures.get_mut(handle.index()) else {
                    continue;
                };
                if res.resolved.is_some() {
                    continue;
                }
                let key = match adopt_alias(
                    &mut texture_aliases,
                    &res.descriptor,
                    res.first_pass,
                    res.last_pass,
                ) {
                    Some(key) => key,
                    None => {
                        let key = self.pool.get_or_create_texture(self.backend, &res.descriptor)?;
                        texture_aliases.push(AliasEntry {
                            descriptor: res.descriptor,
                            key,
                            last_pass: res.last_pass,
                        });
                        key
                    }
                };
                res.resolved = Some(key);
                self.access.reset(key.into());
            }

            for handle in &pass.buffers {
                let Some(res) = self.buffers.get_mut(handle.index()) else {
                    continue;
                };
                if res.resolved.is_some() {
                    continue;
                }
                let key = match adopt_alias(
                    &mut buffer_aliases,
                    &res.descriptor,
                    res.first_pass,
                    res.last_pass,
                ) {
                    Some(key) => key,
                    None => {
                        let key = self.pool.get_or_create_buffer(self.backend, &res.descriptor)?;
                        buffer_aliases.push(AliasEntry {
                            descriptor: res.descriptor,
                            key,
                            last_pass: res.last_pass,
                        });
                        key
                    }
                };
                res.resolved = Some(key);
                self.access.reset(key.into());
            }

            log::trace!("rdg: running pass '{}' (#{})", pass.name, pass.index.get());
            let mut ctx = self.context();
            (pass.run)(&mut ctx, cmd);
            executed += 1;
        }

        log::debug!(
            "rdg: executed {executed} passes, {} textures on {} physical, {} buffers on {} physical",
            self.textures.iter().filter(|t| t.resolved.is_some()).count(),
            texture_aliases.len(),
            self.buffers.iter().filter(|b| b.resolved.is_some()).count(),
            buffer_aliases.len(),
        );
        Ok(())
    }
}

/// Widen the lifetime of every listed handle to include `index`, dropping
/// (and logging) handles the table never issued.
fn touch_all<D, K, H: Copy + std::fmt::Debug>(
    table: &mut [VirtualResource<D, K>],
    handles: &[H],
    index: PassIndex,
    pass: &str,
    kind: &str,
    slot: impl Fn(H) -> usize,
) -> Vec<H> {
    handles
        .iter()
        .copied()
        .filter(|&handle| match table.get_mut(slot(handle)) {
            Some(res) => {
                res.touch(index.get());
                true
            }
            None => {
                log::error!("pass '{pass}' uses unknown {kind} handle {handle:?}; ignored");
                false
            }
        })
        .collect()
}
