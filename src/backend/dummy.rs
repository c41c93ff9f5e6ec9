//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. Every created object
//! gets a unique id and every recorded command is kept in the command buffer,
//! so tests can observe exactly what the render graph asked of the device.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::types::{
    AccessState, BindingLayout, BufferDescriptor, TextureDescriptor, TextureViewDescriptor,
};

use super::{BackendError, BackendResult, GpuBackend};

/// A texture that only exists on paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyTexture {
    pub id: u64,
    pub descriptor: TextureDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyTextureView {
    pub id: u64,
    pub texture_id: u64,
    pub descriptor: TextureViewDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyBuffer {
    pub id: u64,
    pub descriptor: BufferDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyBindingSet {
    pub id: u64,
    pub slot_count: usize,
}

/// A command recorded into a [`DummyCommandBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DummyCommand {
    TextureBarrier {
        texture: u64,
        old: AccessState,
        new: AccessState,
    },
    BufferBarrier {
        buffer: u64,
        old: AccessState,
        new: AccessState,
    },
    FillBuffer {
        buffer: u64,
        offset: u64,
        size: u64,
        value: u32,
    },
}

/// Command buffer that simply stores what was recorded.
#[derive(Debug, Default)]
pub struct DummyCommandBuffer {
    pub id: u64,
    pub commands: Vec<DummyCommand>,
}

impl DummyCommandBuffer {
    /// Number of barrier commands recorded so far.
    pub fn barrier_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    DummyCommand::TextureBarrier { .. } | DummyCommand::BufferBarrier { .. }
                )
            })
            .count()
    }
}

/// Counters kept by [`DummyBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    pub textures_created: u64,
    pub texture_views_created: u64,
    pub buffers_created: u64,
    pub binding_sets_created: u64,
    pub live_textures: u64,
    pub live_texture_views: u64,
    pub live_buffers: u64,
    pub live_binding_sets: u64,
    pub submissions: u64,
}

/// Number of most recent submissions the dummy backend keeps around.
pub const RETAINED_SUBMISSIONS: usize = 16;

#[derive(Debug, Default)]
struct DummyState {
    stats: DummyStats,
    submitted: VecDeque<(usize, DummyCommandBuffer)>,
}

/// Dummy GPU backend.
///
/// Submitted command buffers are kept for inspection, up to
/// [`RETAINED_SUBMISSIONS`]; older ones are dropped.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_id: AtomicU64,
    fail_next_allocation: AtomicBool,
    fail_next_submit: AtomicBool,
    state: Mutex<DummyState>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next create call fail with [`BackendError::OutOfMemory`].
    pub fn fail_next_allocation(&self) {
        self.fail_next_allocation.store(true, Ordering::Release);
    }

    /// Make the next submit fail with [`BackendError::SubmitFailed`].
    pub fn fail_next_submit(&self) {
        self.fail_next_submit.store(true, Ordering::Release);
    }

    /// Snapshot of the creation/live counters.
    pub fn stats(&self) -> DummyStats {
        self.state.lock().stats
    }

    /// Drain the retained submitted command buffers, oldest first, paired
    /// with their frame slot.
    pub fn take_submitted(&self) -> Vec<(usize, DummyCommandBuffer)> {
        self.state.lock().submitted.drain(..).collect()
    }

    fn allocate_id(&self, what: &str) -> BackendResult<u64> {
        if self.fail_next_allocation.swap(false, Ordering::AcqRel) {
            log::trace!("DummyBackend: failing {what} allocation on request");
            return Err(BackendError::OutOfMemory);
        }
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl GpuBackend for DummyBackend {
    type Texture = DummyTexture;
    type TextureView = DummyTextureView;
    type Buffer = DummyBuffer;
    type BindingSet = DummyBindingSet;
    type CommandBuffer = DummyCommandBuffer;

    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> BackendResult<DummyTexture> {
        let id = self.allocate_id("texture")?;
        log::trace!(
            "DummyBackend: creating texture #{id} ({}x{}x{} {:?})",
            descriptor.width,
            descriptor.height,
            descriptor.depth_or_layers,
            descriptor.format
        );
        let mut state = self.state.lock();
        state.stats.textures_created += 1;
        state.stats.live_textures += 1;
        Ok(DummyTexture {
            id,
            descriptor: *descriptor,
        })
    }

    fn destroy_texture(&self, texture: DummyTexture) {
        log::trace!("DummyBackend: destroying texture #{}", texture.id);
        self.state.lock().stats.live_textures -= 1;
    }

    fn create_texture_view(
        &self,
        texture: &DummyTexture,
        descriptor: &TextureViewDescriptor,
    ) -> BackendResult<DummyTextureView> {
        if descriptor.base_mip_level >= texture.descriptor.mip_level_count {
            return Err(BackendError::InvalidParameter(format!(
                "base mip {} out of range for texture #{} with {} levels",
                descriptor.base_mip_level, texture.id, texture.descriptor.mip_level_count
            )));
        }
        let id = self.allocate_id("texture view")?;
        log::trace!("DummyBackend: creating view #{id} of texture #{}", texture.id);
        let mut state = self.state.lock();
        state.stats.texture_views_created += 1;
        state.stats.live_texture_views += 1;
        Ok(DummyTextureView {
            id,
            texture_id: texture.id,
            descriptor: *descriptor,
        })
    }

    fn destroy_texture_view(&self, view: DummyTextureView) {
        log::trace!("DummyBackend: destroying view #{}", view.id);
        self.state.lock().stats.live_texture_views -= 1;
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> BackendResult<DummyBuffer> {
        if descriptor.size == 0 {
            return Err(BackendError::InvalidParameter(
                "buffer size must be non-zero".to_string(),
            ));
        }
        let id = self.allocate_id("buffer")?;
        log::trace!(
            "DummyBackend: creating buffer #{id} (size: {}, {:?})",
            descriptor.size,
            descriptor.memory
        );
        let mut state = self.state.lock();
        state.stats.buffers_created += 1;
        state.stats.live_buffers += 1;
        Ok(DummyBuffer {
            id,
            descriptor: *descriptor,
        })
    }

    fn destroy_buffer(&self, buffer: DummyBuffer) {
        log::trace!("DummyBackend: destroying buffer #{}", buffer.id);
        self.state.lock().stats.live_buffers -= 1;
    }

    fn create_binding_set(&self, layout: &BindingLayout) -> BackendResult<DummyBindingSet> {
        let id = self.allocate_id("binding set")?;
        log::trace!(
            "DummyBackend: creating binding set #{id} ({} slots)",
            layout.slots().len()
        );
        let mut state = self.state.lock();
        state.stats.binding_sets_created += 1;
        state.stats.live_binding_sets += 1;
        Ok(DummyBindingSet {
            id,
            slot_count: layout.slots().len(),
        })
    }

    fn destroy_binding_set(&self, set: DummyBindingSet) {
        log::trace!("DummyBackend: destroying binding set #{}", set.id);
        self.state.lock().stats.live_binding_sets -= 1;
    }

    fn begin_commands(&self) -> BackendResult<DummyCommandBuffer> {
        Ok(DummyCommandBuffer {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            commands: Vec::new(),
        })
    }

    fn texture_barrier(
        &self,
        cmd: &mut DummyCommandBuffer,
        texture: &DummyTexture,
        old: AccessState,
        new: AccessState,
    ) {
        log::trace!("DummyBackend: texture #{} {old:?} -> {new:?}", texture.id);
        cmd.commands.push(DummyCommand::TextureBarrier {
            texture: texture.id,
            old,
            new,
        });
    }

    fn buffer_barrier(
        &self,
        cmd: &mut DummyCommandBuffer,
        buffer: &DummyBuffer,
        old: AccessState,
        new: AccessState,
    ) {
        log::trace!("DummyBackend: buffer #{} {old:?} -> {new:?}", buffer.id);
        cmd.commands.push(DummyCommand::BufferBarrier {
            buffer: buffer.id,
            old,
            new,
        });
    }

    fn fill_buffer(
        &self,
        cmd: &mut DummyCommandBuffer,
        buffer: &DummyBuffer,
        offset: u64,
        size: u64,
        value: u32,
    ) {
        log::trace!(
            "DummyBackend: fill buffer #{} [{offset}..{}] with {value:#x}",
            buffer.id,
            offset + size
        );
        cmd.commands.push(DummyCommand::FillBuffer {
            buffer: buffer.id,
            offset,
            size,
            value,
        });
    }

    fn wait_for_frame_slot(&self, slot: usize) {
        log::trace!("DummyBackend: frame slot {slot} is free");
    }

    fn submit(&self, cmd: DummyCommandBuffer, slot: usize) -> BackendResult<()> {
        log::trace!(
            "DummyBackend: submitting {} commands on slot {slot}",
            cmd.commands.len()
        );
        if self.fail_next_submit.swap(false, Ordering::AcqRel) {
            return Err(BackendError::SubmitFailed(format!("slot {slot}")));
        }
        let mut state = self.state.lock();
        state.stats.submissions += 1;
        if state.submitted.len() == RETAINED_SUBMISSIONS {
            state.submitted.pop_front();
        }
        state.submitted.push_back((slot, cmd));
        Ok(())
    }

    fn wait_idle(&self) {
        log::trace!("DummyBackend: idle");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferUsage, TextureFormat, TextureUsage};

    #[test]
    fn test_ids_are_unique() {
        let backend = DummyBackend::new();
        let a = backend
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::UNIFORM))
            .unwrap();
        let b = backend
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::UNIFORM))
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(backend.stats().live_buffers, 2);

        backend.destroy_buffer(a);
        backend.destroy_buffer(b);
        assert_eq!(backend.stats().live_buffers, 0);
        assert_eq!(backend.stats().buffers_created, 2);
    }

    #[test]
    fn test_fail_next_allocation_is_one_shot() {
        let backend = DummyBackend::new();
        let desc = TextureDescriptor::new_2d(
            4,
            4,
            TextureFormat::Rgba8Unorm,
            TextureUsage::TEXTURE_BINDING,
        );
        backend.fail_next_allocation();
        assert_eq!(
            backend.create_texture(&desc).unwrap_err(),
            BackendError::OutOfMemory
        );
        assert!(backend.create_texture(&desc).is_ok());
    }

    #[test]
    fn test_zero_sized_buffer_is_rejected() {
        let backend = DummyBackend::new();
        let result = backend.create_buffer(&BufferDescriptor::new(0, BufferUsage::STORAGE));
        assert!(matches!(result, Err(BackendError::InvalidParameter(_))));
    }

    #[test]
    fn test_commands_are_recorded_and_submitted() {
        let backend = DummyBackend::new();
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(256, BufferUsage::STORAGE))
            .unwrap();
        let mut cmd = backend.begin_commands().unwrap();
        backend.buffer_barrier(&mut cmd, &buffer, AccessState::None, AccessState::CopyDst);
        backend.fill_buffer(&mut cmd, &buffer, 0, 256, 0);
        assert_eq!(cmd.barrier_count(), 1);
        assert_eq!(cmd.commands.len(), 2);

        backend.submit(cmd, 1).unwrap();
        let submitted = backend.take_submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].0, 1);
        assert_eq!(backend.stats().submissions, 1);
        backend.destroy_buffer(buffer);
    }

    #[test]
    fn test_retained_submissions_are_capped() {
        let backend = DummyBackend::new();
        for i in 0..RETAINED_SUBMISSIONS + 4 {
            let cmd = backend.begin_commands().unwrap();
            backend.submit(cmd, i % 2).unwrap();
        }
        let submitted = backend.take_submitted();
        assert_eq!(submitted.len(), RETAINED_SUBMISSIONS);
        assert_eq!(backend.stats().submissions, RETAINED_SUBMISSIONS as u64 + 4);
        assert!(backend.take_submitted().is_empty());
    }

    #[test]
    fn test_fail_next_submit_is_one_shot() {
        let backend = DummyBackend::new();
        backend.fail_next_submit();
        let cmd = backend.begin_commands().unwrap();
        assert_eq!(
            backend.submit(cmd, 0),
            Err(BackendError::SubmitFailed("slot 0".to_string()))
        );
        let cmd = backend.begin_commands().unwrap();
        assert!(backend.submit(cmd, 0).is_ok());
        assert_eq!(backend.stats().submissions, 1);
    }
}
