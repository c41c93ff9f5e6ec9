//! Descriptors and state enums shared by the pool, the graph and backends.
//!
//! Descriptors are plain values compared by structural equality; that
//! equality is what both pool reuse and transient aliasing match on.

mod access;
mod binding;
mod buffer;
mod texture;

pub use access::AccessState;
pub use binding::{BindingKind, BindingLayout, BindingSlot, ShaderStages};
pub use buffer::{BufferDescriptor, BufferUsage, MemoryKind};
pub use texture::{TextureDescriptor, TextureFormat, TextureUsage, TextureViewDescriptor};
