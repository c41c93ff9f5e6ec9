//! GPU access states tracked per physical resource.

/// The GPU-visible usage mode a resource is currently in.
///
/// Barriers transition resources between these states. `None` is the state
/// every transient resource starts a frame in: its previous contents are
/// undefined and the first barrier a pass issues must transition from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessState {
    /// Contents undefined, no pending access.
    #[default]
    None,
    /// Written as a color render target.
    RenderTarget,
    /// Written as a depth/stencil attachment.
    DepthStencilWrite,
    /// Read-only depth/stencil (sampling + depth test).
    DepthStencilRead,
    /// Sampled or read in a shader.
    ShaderRead,
    /// Read/write storage access from a shader.
    StorageReadWrite,
    /// Source of a copy.
    CopySrc,
    /// Destination of a copy or fill.
    CopyDst,
    /// Read as vertex data.
    VertexBuffer,
    /// Read as index data.
    IndexBuffer,
    /// Read as uniform data.
    UniformRead,
    /// Read as indirect arguments.
    IndirectRead,
    /// Ready for presentation.
    Present,
}

impl AccessState {
    /// Check if this state is a write operation.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Self::RenderTarget | Self::DepthStencilWrite | Self::StorageReadWrite | Self::CopyDst
        )
    }

    /// Check if this state is a read operation.
    pub fn is_read(self) -> bool {
        matches!(
            self,
            Self::DepthStencilRead
                | Self::ShaderRead
                | Self::StorageReadWrite
                | Self::CopySrc
                | Self::VertexBuffer
                | Self::IndexBuffer
                | Self::UniformRead
                | Self::IndirectRead
        )
    }
}
