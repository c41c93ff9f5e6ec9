//! Pipeline stages, pass records and the context handed to pass closures.

use std::fmt;

use crate::backend::GpuBackend;
use crate::error::RdgResult;
use crate::pool::{BindingSetKey, BufferKey, ResourcePool, TextureKey, TextureViewKey};
use crate::types::{AccessState, BindingLayout, TextureViewDescriptor};

use super::access::{AccessTracker, ExternalKey, ResourceKey};
use super::resource::{
    resolved_key, BufferHandle, PhysicalResource, TextureHandle, VirtualBuffer, VirtualTexture,
};

/// Number of pipeline stages.
pub const STAGE_COUNT: usize = 10;

/// Upper bound on passes registered in a single stage per frame.
pub const MAX_PASSES_PER_STAGE: usize = 64;

/// Fixed pipeline stage a pass is scheduled in.
///
/// Stages execute in declaration order; passes within a stage execute in
/// registration order.
///
/// | Stage | Typical content |
/// |-------|-----------------|
/// | `PreRender` | uploads, clears, compute pre-passes |
/// | `Opaque` | G-buffer or forward opaque geometry |
/// | `Lighting` | deferred lighting, shadows resolve |
/// | `Skybox` | sky and environment |
/// | `PostProcessing` | bloom, tone mapping, AA |
/// | `PostRender` | UI, debug overlays, present copies |
///
/// The `Post*` stages in between are insertion points for features that must
/// run after a stage without belonging to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PassStage {
    PreRender = 0,
    Opaque = 1,
    PostOpaque = 2,
    Lighting = 3,
    PostLighting = 4,
    Skybox = 5,
    PostSkybox = 6,
    PostProcessing = 7,
    PostPostProcessing = 8,
    PostRender = 9,
}

impl PassStage {
    /// All stages in execution order.
    pub const ALL: [PassStage; STAGE_COUNT] = [
        Self::PreRender,
        Self::Opaque,
        Self::PostOpaque,
        Self::Lighting,
        Self::PostLighting,
        Self::Skybox,
        Self::PostSkybox,
        Self::PostProcessing,
        Self::PostPostProcessing,
        Self::PostRender,
    ];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PreRender => "PreRender",
            Self::Opaque => "Opaque",
            Self::PostOpaque => "PostOpaque",
            Self::Lighting => "Lighting",
            Self::PostLighting => "PostLighting",
            Self::Skybox => "Skybox",
            Self::PostSkybox => "PostSkybox",
            Self::PostProcessing => "PostProcessing",
            Self::PostPostProcessing => "PostPostProcessing",
            Self::PostRender => "PostRender",
        }
    }
}

impl fmt::Display for PassStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static_assertions::const_assert_eq!(PassStage::PostRender as usize + 1, STAGE_COUNT);

/// Global execution index of a pass.
///
/// Encoded as `stage * MAX_PASSES_PER_STAGE + position`, so comparing two
/// indices compares execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassIndex(u32);

impl PassIndex {
    pub(crate) fn new(stage: PassStage, position: usize) -> Self {
        Self((stage.index() * MAX_PASSES_PER_STAGE + position) as u32)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Position within the pass's stage.
    pub fn position(self) -> usize {
        self.0 as usize % MAX_PASSES_PER_STAGE
    }
}

/// Closure recorded by a pass.
pub type PassFn<'a, B> =
    Box<dyn FnOnce(&mut PassContext<'_, 'a, B>, &mut <B as GpuBackend>::CommandBuffer) + 'a>;

/// A registered pass.
pub(crate) struct Pass<'a, B: GpuBackend> {
    pub name: String,
    pub index: PassIndex,
    pub textures: Vec<TextureHandle>,
    pub buffers: Vec<BufferHandle>,
    pub run: PassFn<'a, B>,
}

impl<B: GpuBackend> fmt::Debug for Pass<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pass")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("textures", &self.textures)
            .field("buffers", &self.buffers)
            .finish_non_exhaustive()
    }
}

/// What a pass closure sees of the graph while it runs.
///
/// Gives access to resolved resources and issues tracked barriers. The same
/// operations are available on the builder itself between declarations.
pub struct PassContext<'c, 'a, B: GpuBackend> {
    pub(crate) backend: &'a B,
    pub(crate) pool: &'c mut ResourcePool<B>,
    pub(crate) textures: &'c [VirtualTexture],
    pub(crate) buffers: &'c [VirtualBuffer],
    pub(crate) externals: &'c [PhysicalResource<'a, B>],
    pub(crate) access: &'c mut AccessTracker,
}

impl<'c, 'a, B: GpuBackend> PassContext<'c, 'a, B> {
    pub fn backend(&self) -> &'a B {
        self.backend
    }

    pub fn pool(&self) -> &ResourcePool<B> {
        &*self.pool
    }

    /// Physical texture a transient handle resolved to.
    pub fn texture(&self, handle: TextureHandle) -> Option<TextureKey> {
        resolved_key(self.textures, handle.index(), "texture")
    }

    /// Physical buffer a transient handle resolved to.
    pub fn buffer(&self, handle: BufferHandle) -> Option<BufferKey> {
        resolved_key(self.buffers, handle.index(), "buffer")
    }

    pub fn texture_resource(&self, handle: TextureHandle) -> Option<&B::Texture> {
        self.texture(handle).and_then(|key| self.pool.texture(key))
    }

    pub fn buffer_resource(&self, handle: BufferHandle) -> Option<&B::Buffer> {
        self.buffer(handle).and_then(|key| self.pool.buffer(key))
    }

    pub fn external_texture(&self, key: ExternalKey) -> Option<&'a B::Texture> {
        match self.externals.get(key.0 as usize) {
            Some(PhysicalResource::Texture(texture)) => Some(*texture),
            _ => None,
        }
    }

    pub fn external_buffer(&self, key: ExternalKey) -> Option<&'a B::Buffer> {
        match self.externals.get(key.0 as usize) {
            Some(PhysicalResource::Buffer(buffer)) => Some(*buffer),
            _ => None,
        }
    }

    /// Get or create a pooled view into a physical texture.
    pub fn texture_view(
        &mut self,
        descriptor: &TextureViewDescriptor,
    ) -> RdgResult<TextureViewKey> {
        self.pool.get_or_create_texture_view(self.backend, descriptor)
    }

    /// Get or create a pooled binding set for `layout`.
    pub fn binding_set(&mut self, layout: &BindingLayout) -> RdgResult<BindingSetKey> {
        self.pool.get_or_create_binding_set(self.backend, layout)
    }

    /// Current tracked state of a resource.
    pub fn access_state(&self, resource: impl Into<ResourceKey>) -> Option<AccessState> {
        self.access.get(resource.into())
    }

    fn physical(&self, key: ResourceKey) -> Option<PhysicalResource<'_, B>> {
        match key {
            ResourceKey::Texture(k) => self.pool.texture(k).map(PhysicalResource::Texture),
            ResourceKey::Buffer(k) => self.pool.buffer(k).map(PhysicalResource::Buffer),
            ResourceKey::External(k) => self.externals.get(k.0 as usize).copied(),
        }
    }

    /// Transition `resource` into `new`.
    ///
    /// The resource must be known to the tracker. Otherwise one error is
    /// logged and nothing is recorded. Same-state transitions are still
    /// handed to the backend.
    pub fn barrier(
        &mut self,
        cmd: &mut B::CommandBuffer,
        resource: impl Into<ResourceKey>,
        new: AccessState,
    ) {
        let key = resource.into();
        let Some(old) = self.access.get(key) else {
            log::error!("barrier to {new:?} on unregistered resource {key:?}");
            return;
        };

        match self.physical(key) {
            Some(PhysicalResource::Texture(texture)) => {
                self.backend.texture_barrier(cmd, texture, old, new)
            }
            Some(PhysicalResource::Buffer(buffer)) => {
                self.backend.buffer_barrier(cmd, buffer, old, new)
            }
            None => {
                log::error!("barrier on {key:?} which no longer exists");
                return;
            }
        }
        self.access.set(key, new);
    }

    /// Fill `size` bytes of a buffer at `offset` with `value`, leaving it in
    /// `new`.
    ///
    /// Same registration rule as [`Self::barrier`].
    pub fn fill(
        &mut self,
        cmd: &mut B::CommandBuffer,
        buffer: impl Into<ResourceKey>,
        size: u64,
        offset: u64,
        value: u32,
        new: AccessState,
    ) {
        let key = buffer.into();
        let Some(old) = self.access.get(key) else {
            log::error!("fill on unregistered resource {key:?}");
            return;
        };
        let buffer = match self.physical(key) {
            Some(PhysicalResource::Buffer(buffer)) => buffer,
            Some(PhysicalResource::Texture(_)) => {
                log::error!("fill targets texture {key:?}");
                return;
            }
            None => {
                log::error!("fill on {key:?} which no longer exists");
                return;
            }
        };

        if old != AccessState::CopyDst {
            self.backend.buffer_barrier(cmd, buffer, old, AccessState::CopyDst);
        }
        self.backend.fill_buffer(cmd, buffer, offset, size, value);
        if new != AccessState::CopyDst {
            self.backend.buffer_barrier(cmd, buffer, AccessState::CopyDst, new);
        }
        self.access.set(key, new);
    }
}
