//! Per-frame virtual resources and the handles that name them.

use crate::backend::GpuBackend;
use crate::pool::{BufferKey, TextureKey};
use crate::types::{BufferDescriptor, TextureDescriptor};

macro_rules! virtual_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Reserved sentinel returned by failed lookups.
            pub const INVALID: Self = Self(u32::MAX);

            /// Returns false for the [`Self::INVALID`] sentinel.
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }

            /// Position in the builder's table.
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Handle for table position `index`.
            ///
            /// # Panics
            ///
            /// Panics if `index` would collide with [`Self::INVALID`].
            pub(crate) fn from_index(index: usize) -> Self {
                match u32::try_from(index) {
                    Ok(raw) if raw != u32::MAX => Self(raw),
                    _ => panic!("{} table is full at {index} entries", stringify!($name)),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }
    };
}

virtual_handle!(
    /// Handle to a transient texture declared on a graph builder.
    ///
    /// Only meaningful for the builder that issued it.
    TextureHandle
);

virtual_handle!(
    /// Handle to a transient buffer declared on a graph builder.
    BufferHandle
);

/// A declared transient resource and the pass range that touches it.
#[derive(Debug, Clone)]
pub(crate) struct VirtualResource<D, K> {
    pub name: String,
    pub descriptor: D,
    pub first_pass: u32,
    pub last_pass: u32,
    pub resolved: Option<K>,
}

impl<D, K> VirtualResource<D, K> {
    pub fn new(name: &str, descriptor: D) -> Self {
        Self {
            name: name.to_string(),
            descriptor,
            first_pass: u32::MAX,
            last_pass: 0,
            resolved: None,
        }
    }

    /// Widen the lifetime to include pass `index`.
    pub fn touch(&mut self, index: u32) {
        self.first_pass = self.first_pass.min(index);
        self.last_pass = self.last_pass.max(index);
    }

    /// Whether any pass uses this resource.
    pub fn is_used(&self) -> bool {
        self.first_pass != u32::MAX
    }
}

pub(crate) type VirtualTexture = VirtualResource<TextureDescriptor, TextureKey>;
pub(crate) type VirtualBuffer = VirtualResource<BufferDescriptor, BufferKey>;

/// Borrowed physical resource, either pool-owned or caller-owned.
pub(crate) enum PhysicalResource<'r, B: GpuBackend> {
    Texture(&'r B::Texture),
    Buffer(&'r B::Buffer),
}

impl<B: GpuBackend> Clone for PhysicalResource<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: GpuBackend> Copy for PhysicalResource<'_, B> {}

/// Resolved key of the virtual resource at `index`.
///
/// Logs an error for indices the table never issued, including the invalid
/// sentinel. A valid handle that is not resolved yet yields `None` quietly.
pub(crate) fn resolved_key<D, K: Copy>(
    table: &[VirtualResource<D, K>],
    index: usize,
    kind: &str,
) -> Option<K> {
    match table.get(index) {
        Some(res) => res.resolved,
        None => {
            log::error!("unknown {kind} handle {index} ({} declared)", table.len());
            None
        }
    }
}

/// A physical resource already handed out this frame, available for
/// aliasing once its tracked lifetime has ended.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AliasEntry<D, K> {
    pub descriptor: D,
    pub key: K,
    pub last_pass: u32,
}

/// Resolve a virtual resource against the frame's alias list.
///
/// Returns the adopted key and extends that entry's lifetime, or `None` when
/// no same-shaped resource is free before `first_pass`.
pub(crate) fn adopt_alias<D: PartialEq, K: Copy>(
    aliases: &mut [AliasEntry<D, K>],
    descriptor: &D,
    first_pass: u32,
    last_pass: u32,
) -> Option<K> {
    let entry = aliases
        .iter_mut()
        .find(|e| e.last_pass < first_pass && e.descriptor == *descriptor)?;
    entry.last_pass = last_pass;
    Some(entry.key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_narrows_lifetime() {
        let mut res = VirtualResource::<u32, u32>::new("depth", 0);
        assert!(!res.is_used());
        res.touch(70);
        res.touch(3);
        res.touch(12);
        assert_eq!((res.first_pass, res.last_pass), (3, 70));
        assert!(res.is_used());
    }

    #[test]
    fn test_invalid_handle() {
        assert!(!TextureHandle::INVALID.is_valid());
        assert!(TextureHandle(0).is_valid());
        assert_eq!(BufferHandle::default(), BufferHandle::INVALID);
    }

    #[test]
    fn test_last_index_before_sentinel_is_valid() {
        let last = TextureHandle::from_index(u32::MAX as usize - 1);
        assert!(last.is_valid());
        assert_eq!(last.index(), u32::MAX as usize - 1);
    }

    #[test]
    #[should_panic(expected = "table is full")]
    fn test_index_never_collides_with_sentinel() {
        let _ = BufferHandle::from_index(u32::MAX as usize);
    }

    #[test]
    fn test_adopt_alias_requires_disjoint_lifetime() {
        let mut aliases = vec![AliasEntry {
            descriptor: 7u32,
            key: 1u32,
            last_pass: 5,
        }];
        assert_eq!(adopt_alias(&mut aliases, &7, 5, 9), None);
        assert_eq!(adopt_alias(&mut aliases, &8, 6, 9), None);
        assert_eq!(adopt_alias(&mut aliases, &7, 6, 9), Some(1));
        assert_eq!(aliases[0].last_pass, 9);
    }
}
