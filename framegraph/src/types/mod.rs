//! Descriptors, flags and states for frame graph resources.
//!
//! This module contains format enums, bind flags, resource states and the
//! descriptor structs used by the registry, the resource pool and the backend.

mod buffer;
mod common;
mod state;
mod texture;
mod view;

pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{ClearValue, Extent3d, MemoryLocation, Viewport};
pub use state::ResourceState;
pub use texture::{TextureDescriptor, TextureDimension, TextureFormat, TextureUsage};
pub use view::{BufferViewDesc, TextureViewDesc, ViewDesc, ViewKind};
