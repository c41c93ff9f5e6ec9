//! Buffer types and descriptors.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be used as a storage buffer.
        const STORAGE = 1 << 3;
        /// Buffer can be used as an indirect buffer.
        const INDIRECT = 1 << 4;
        /// Buffer can be copied from.
        const COPY_SRC = 1 << 5;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 6;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Where a buffer's memory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryKind {
    /// Device-local, not CPU visible.
    #[default]
    GpuOnly,
    /// CPU-writable upload memory.
    CpuToGpu,
    /// CPU-readable readback memory.
    GpuToCpu,
}

impl MemoryKind {
    /// Returns true if the CPU can map this memory.
    pub fn is_host_visible(self) -> bool {
        !matches!(self, Self::GpuOnly)
    }
}

/// Shape of a buffer, compared structurally for pooling and aliasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
    /// Memory placement.
    pub memory: MemoryKind,
}

impl BufferDescriptor {
    /// Create a new device-local buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            size,
            usage,
            memory: MemoryKind::GpuOnly,
        }
    }

    /// Set the memory placement.
    pub fn with_memory(mut self, memory: MemoryKind) -> Self {
        self.memory = memory;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_kind_participates_in_equality() {
        let gpu = BufferDescriptor::new(1024, BufferUsage::STORAGE);
        let upload = gpu.with_memory(MemoryKind::CpuToGpu);
        assert_ne!(gpu, upload);
        assert_eq!(
            upload,
            BufferDescriptor::new(1024, BufferUsage::STORAGE).with_memory(MemoryKind::CpuToGpu)
        );
    }

    #[test]
    fn test_host_visibility() {
        assert!(!MemoryKind::GpuOnly.is_host_visible());
        assert!(MemoryKind::CpuToGpu.is_host_visible());
        assert!(MemoryKind::GpuToCpu.is_host_visible());
    }
}
