//! Binding layouts used to request pooled binding sets.

use bitflags::bitflags;

bitflags! {
    /// Shader stages a binding is visible to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        /// Vertex shader stage.
        const VERTEX = 1 << 0;
        /// Fragment shader stage.
        const FRAGMENT = 1 << 1;
        /// Compute shader stage.
        const COMPUTE = 1 << 2;
        /// Vertex and fragment stages.
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

/// Kind of resource bound at a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    UniformBuffer,
    StorageBuffer { read_only: bool },
    SampledTexture,
    StorageTexture,
    Sampler { comparison: bool },
}

/// One slot of a binding layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingSlot {
    /// Binding index within the set.
    pub binding: u32,
    /// Resource kind.
    pub kind: BindingKind,
    /// Stage visibility.
    pub stages: ShaderStages,
    /// Array element count (1 for non-arrays).
    pub count: u32,
}

/// Layout that owns a pooled binding set.
///
/// Binding sets are matched by their layout only; the pass that receives one
/// is expected to write its descriptors before use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BindingLayout {
    slots: Vec<BindingSlot>,
}

impl BindingLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single-element slot.
    pub fn with_slot(mut self, binding: u32, kind: BindingKind, stages: ShaderStages) -> Self {
        self.slots.push(BindingSlot {
            binding,
            kind,
            stages,
            count: 1,
        });
        self
    }

    /// Add an arrayed slot.
    pub fn with_array_slot(
        mut self,
        binding: u32,
        kind: BindingKind,
        stages: ShaderStages,
        count: u32,
    ) -> Self {
        self.slots.push(BindingSlot {
            binding,
            kind,
            stages,
            count,
        });
        self
    }

    /// All slots in declaration order.
    pub fn slots(&self) -> &[BindingSlot] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_equality_is_order_sensitive() {
        let a = BindingLayout::new()
            .with_slot(0, BindingKind::UniformBuffer, ShaderStages::VERTEX_FRAGMENT)
            .with_slot(1, BindingKind::SampledTexture, ShaderStages::FRAGMENT);
        let b = BindingLayout::new()
            .with_slot(1, BindingKind::SampledTexture, ShaderStages::FRAGMENT)
            .with_slot(0, BindingKind::UniformBuffer, ShaderStages::VERTEX_FRAGMENT);
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
        assert_eq!(a.slots().len(), 2);
    }

    #[test]
    fn test_array_count_distinguishes_layouts() {
        let single =
            BindingLayout::new().with_slot(0, BindingKind::SampledTexture, ShaderStages::FRAGMENT);
        let array = BindingLayout::new().with_array_slot(
            0,
            BindingKind::SampledTexture,
            ShaderStages::FRAGMENT,
            8,
        );
        assert_ne!(single, array);
        assert_eq!(array.slots()[0].count, 8);
    }
}
