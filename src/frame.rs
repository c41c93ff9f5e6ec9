//! Frame loop driver.
//!
//! [`FrameRenderer`] owns the backend and the resource pool and walks them
//! through the per-frame sequence: wait for the frame slot, build and execute
//! a graph, submit, evict stale pool entries.

use crate::backend::GpuBackend;
use crate::error::RdgResult;
use crate::graph::GraphBuilder;
use crate::pool::{PoolConfig, ResourcePool};

/// Maximum number of frames the CPU may run ahead of the GPU.
///
/// Pooled buffers and binding sets are handed out again two frames after
/// their last use, so more slots than this would let the CPU rewrite a buffer
/// a pending frame still reads.
pub const FRAMES_IN_FLIGHT: usize = 2;

/// Configuration for a [`FrameRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererConfig {
    /// Pool reuse and eviction settings.
    pub pool: PoolConfig,
    /// Number of frame slots cycled through, in `1..=FRAMES_IN_FLIGHT`.
    pub frames_in_flight: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            frames_in_flight: FRAMES_IN_FLIGHT,
        }
    }
}

impl RendererConfig {
    /// Set the number of frames in flight, clamped to `1..=FRAMES_IN_FLIGHT`.
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames.clamp(1, FRAMES_IN_FLIGHT);
        self
    }

    /// Set the pool's stale frame threshold.
    pub fn with_stale_frame_threshold(mut self, frames: u64) -> Self {
        self.pool.stale_frame_threshold = frames;
        self
    }
}

/// Owns a backend and its resource pool and drives frames through them.
pub struct FrameRenderer<B: GpuBackend> {
    backend: B,
    pool: ResourcePool<B>,
    frames_in_flight: usize,
}

impl<B: GpuBackend> FrameRenderer<B> {
    pub fn new(backend: B, config: RendererConfig) -> Self {
        let frames_in_flight = config.frames_in_flight.clamp(1, FRAMES_IN_FLIGHT);
        if frames_in_flight != config.frames_in_flight {
            log::warn!(
                "FrameRenderer: {} frames in flight requested, using {frames_in_flight}",
                config.frames_in_flight
            );
        }
        log::debug!(
            "FrameRenderer: {} with {frames_in_flight} frames in flight",
            backend.name()
        );
        Self {
            backend,
            pool: ResourcePool::new(config.pool),
            frames_in_flight,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn pool(&self) -> &ResourcePool<B> {
        &self.pool
    }

    /// Frame number of the frame being built (0 before the first frame).
    pub fn frame_number(&self) -> u64 {
        self.pool.current_frame()
    }

    /// Frame slot the current frame submits to.
    pub fn frame_slot(&self) -> usize {
        (self.pool.current_frame() % self.frames_in_flight as u64) as usize
    }

    /// Start a new frame and return the command buffer to record into.
    ///
    /// Blocks until the GPU has released the frame slot this frame reuses.
    pub fn begin_frame(&mut self) -> RdgResult<B::CommandBuffer> {
        self.pool.advance_frame();
        let slot = self.frame_slot();
        self.backend.wait_for_frame_slot(slot);
        log::trace!("FrameRenderer: begin frame {} on slot {slot}", self.frame_number());
        Ok(self.backend.begin_commands()?)
    }

    /// A fresh graph builder for the current frame.
    pub fn graph(&mut self) -> GraphBuilder<'_, B> {
        GraphBuilder::new(&self.backend, &mut self.pool)
    }

    /// Submit the frame's commands and evict stale pool entries.
    ///
    /// Returns the number of evicted pool entries.
    pub fn end_frame(&mut self, cmd: B::CommandBuffer) -> RdgResult<usize> {
        let slot = self.frame_slot();
        self.backend.submit(cmd, slot)?;
        Ok(self.pool.evict_stale(&self.backend))
    }

    /// Build, execute and submit one frame.
    pub fn render_frame<F>(&mut self, build: F) -> RdgResult<()>
    where
        F: FnOnce(&mut GraphBuilder<'_, B>),
    {
        let mut cmd = self.begin_frame()?;
        {
            let mut graph = self.graph();
            build(&mut graph);
            graph.execute(&mut cmd)?;
        }
        self.end_frame(cmd)?;
        Ok(())
    }

    /// Wait for the device and release every pooled resource.
    pub fn shutdown(&mut self) {
        self.backend.wait_idle();
        if self.pool.stats().total() > 0 {
            self.pool.destroy_all(&self.backend);
        }
    }
}

impl<B: GpuBackend> Drop for FrameRenderer<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;

    #[test]
    fn test_single_frame_in_flight_uses_one_slot() {
        let mut renderer = FrameRenderer::new(
            DummyBackend::new(),
            RendererConfig::default().with_frames_in_flight(1),
        );
        let mut slots = Vec::new();
        for _ in 0..3 {
            let cmd = renderer.begin_frame().unwrap();
            slots.push(renderer.frame_slot());
            renderer.end_frame(cmd).unwrap();
        }
        assert_eq!(slots, vec![0, 0, 0]);
        assert_eq!(renderer.backend().stats().submissions, 3);
    }

    #[test]
    fn test_frames_in_flight_is_clamped() {
        let config = RendererConfig::default().with_frames_in_flight(0);
        assert_eq!(config.frames_in_flight, 1);
        let config = RendererConfig::default().with_frames_in_flight(3);
        assert_eq!(config.frames_in_flight, FRAMES_IN_FLIGHT);
    }

    #[test]
    fn test_out_of_range_config_is_clamped_by_renderer() {
        let config = RendererConfig {
            frames_in_flight: 5,
            ..RendererConfig::default()
        };
        let mut renderer = FrameRenderer::new(DummyBackend::new(), config);
        let mut slots = Vec::new();
        for _ in 0..3 {
            let cmd = renderer.begin_frame().unwrap();
            slots.push(renderer.frame_slot());
            renderer.end_frame(cmd).unwrap();
        }
        assert_eq!(slots, vec![1, 0, 1]);
    }
}
