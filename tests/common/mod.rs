//! Shared helpers for render graph integration tests.

#![allow(dead_code)]

use redlilium_rdg::backend::dummy::{DummyBackend, DummyCommandBuffer};
use redlilium_rdg::backend::GpuBackend;
use redlilium_rdg::types::{
    BufferDescriptor, BufferUsage, MemoryKind, TextureDescriptor, TextureFormat, TextureUsage,
};
use redlilium_rdg::{GraphBuilder, PoolConfig, ResourcePool};

/// Install a test logger once per binary.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Full HD HDR color target, the shape of "Albedo" and "Bloom".
pub fn hdr_target() -> TextureDescriptor {
    TextureDescriptor::new_2d(
        1920,
        1080,
        TextureFormat::Rgba16Float,
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
    )
}

pub fn depth_target() -> TextureDescriptor {
    TextureDescriptor::new_2d(
        1920,
        1080,
        TextureFormat::Depth32Float,
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
    )
}

/// 1 KiB CPU-writable storage buffer.
pub fn upload_storage() -> BufferDescriptor {
    BufferDescriptor::new(1024, BufferUsage::STORAGE).with_memory(MemoryKind::CpuToGpu)
}

/// A dummy backend plus a pool, torn down together.
pub struct TestContext {
    pub backend: DummyBackend,
    pub pool: ResourcePool<DummyBackend>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        init_logger();
        Self {
            backend: DummyBackend::new(),
            pool: ResourcePool::new(config),
        }
    }

    pub fn graph(&mut self) -> GraphBuilder<'_, DummyBackend> {
        GraphBuilder::new(&self.backend, &mut self.pool)
    }

    pub fn commands(&self) -> DummyCommandBuffer {
        self.backend
            .begin_commands()
            .expect("dummy command buffers never fail")
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.pool.destroy_all(&self.backend);
    }
}
