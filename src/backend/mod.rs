//! GPU backend abstraction layer.
//!
//! The render graph never talks to a graphics API directly. Everything it
//! needs from the device goes through [`GpuBackend`]:
//! - creation and destruction of textures, views, buffers and binding sets
//! - access-state transitions (barriers) and buffer fills
//! - command buffer allocation, frame-slot waits and submission
//!
//! # Available Backends
//!
//! - [`dummy::DummyBackend`]: No-op backend that records every call, used by
//!   tests, benches and headless tools.

pub mod dummy;

use std::fmt::Debug;

use thiserror::Error;

use crate::types::{
    AccessState, BindingLayout, BufferDescriptor, TextureDescriptor, TextureViewDescriptor,
};

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("submission failed: {0}")]
    SubmitFailed(String),
    #[error("out of GPU memory")]
    OutOfMemory,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// A graphics device the render graph can drive.
///
/// Physical objects are owned by the caller (in practice the resource pool)
/// and handed back to the backend for destruction. Methods take `&self`;
/// implementations synchronize internally.
pub trait GpuBackend: Send + Sync + 'static {
    /// Physical texture.
    type Texture: Debug + Send + Sync;
    /// View into a physical texture.
    type TextureView: Debug + Send + Sync;
    /// Physical buffer.
    type Buffer: Debug + Send + Sync;
    /// Descriptor/binding set allocated from a layout.
    type BindingSet: Debug + Send + Sync;
    /// Command recording target for one frame.
    type CommandBuffer: Debug + Send;

    /// Human readable backend name.
    fn name(&self) -> &'static str;

    // Resource lifecycle

    fn create_texture(&self, descriptor: &TextureDescriptor) -> BackendResult<Self::Texture>;
    fn destroy_texture(&self, texture: Self::Texture);

    fn create_texture_view(
        &self,
        texture: &Self::Texture,
        descriptor: &TextureViewDescriptor,
    ) -> BackendResult<Self::TextureView>;
    fn destroy_texture_view(&self, view: Self::TextureView);

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> BackendResult<Self::Buffer>;
    fn destroy_buffer(&self, buffer: Self::Buffer);

    fn create_binding_set(&self, layout: &BindingLayout) -> BackendResult<Self::BindingSet>;
    fn destroy_binding_set(&self, set: Self::BindingSet);

    // Recording

    /// Allocate a fresh command buffer.
    fn begin_commands(&self) -> BackendResult<Self::CommandBuffer>;

    /// Transition a texture from `old` to `new`.
    fn texture_barrier(
        &self,
        cmd: &mut Self::CommandBuffer,
        texture: &Self::Texture,
        old: AccessState,
        new: AccessState,
    );

    /// Transition a buffer from `old` to `new`.
    fn buffer_barrier(
        &self,
        cmd: &mut Self::CommandBuffer,
        buffer: &Self::Buffer,
        old: AccessState,
        new: AccessState,
    );

    /// Fill `size` bytes of `buffer` starting at `offset` with a repeated
    /// 32-bit `value`. The buffer must already be in [`AccessState::CopyDst`].
    fn fill_buffer(
        &self,
        cmd: &mut Self::CommandBuffer,
        buffer: &Self::Buffer,
        offset: u64,
        size: u64,
        value: u32,
    );

    // Frame loop

    /// Block until the frame slot `slot` is free for reuse.
    fn wait_for_frame_slot(&self, slot: usize);

    /// Submit recorded commands for frame slot `slot`.
    fn submit(&self, cmd: Self::CommandBuffer, slot: usize) -> BackendResult<()>;

    /// Block until all submitted work has finished.
    fn wait_idle(&self);
}
