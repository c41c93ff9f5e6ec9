//! RedLilium RDG - per-frame render dependency graph
//!
//! Rendering features declare transient GPU resources and ordered passes
//! without knowing about each other. The graph then:
//! - aliases same-shaped transient resources whose lifetimes don't overlap
//! - tracks each physical resource's access state and inserts barriers
//! - schedules passes by a fixed pipeline-stage ordering
//!
//! # Modules
//! - [`backend`]: the [`GpuBackend`] device abstraction and a no-op backend
//! - [`pool`]: physical resources reused across frames
//! - [`graph`]: the per-frame [`GraphBuilder`]
//! - [`frame`]: the [`FrameRenderer`] frame loop driver
//! - [`types`]: descriptors and access states

pub mod backend;
pub mod error;
pub mod frame;
pub mod graph;
pub mod pool;
pub mod types;

pub use backend::{BackendError, BackendResult, GpuBackend};
pub use error::{RdgError, RdgResult};
pub use frame::{FrameRenderer, RendererConfig, FRAMES_IN_FLIGHT};
pub use graph::{
    BufferHandle, ExternalKey, GraphBuilder, PassContext, PassStage, ResourceKey, TextureHandle,
    MAX_PASSES_PER_STAGE, STAGE_COUNT,
};
pub use pool::{
    BindingSetKey, BufferKey, PoolConfig, PoolStats, ResourcePool, SharedResourcePool, TextureKey,
    TextureViewKey,
};
pub use types::AccessState;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
