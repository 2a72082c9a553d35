//! Buffer types and descriptors.

use super::MemoryLocation;
use bitflags::bitflags;

bitflags! {
    /// Bind flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a uniform (constant) buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be read as a shader resource.
        const SHADER_READ = 1 << 3;
        /// Buffer can be used as a storage (unordered access) buffer.
        const STORAGE = 1 << 4;
        /// Buffer can be used as an indirect argument buffer.
        const INDIRECT = 1 << 5;
        /// Buffer can be copied from.
        const COPY_SRC = 1 << 6;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 7;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Element stride in bytes for structured views (0 for raw buffers).
    pub stride: u32,
    /// Bind flags.
    pub usage: BufferUsage,
    /// Heap the buffer lives in.
    pub memory: MemoryLocation,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            stride: 0,
            usage,
            memory: MemoryLocation::GpuOnly,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the structured element stride.
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    /// Set the memory location.
    pub fn with_memory(mut self, memory: MemoryLocation) -> Self {
        self.memory = memory;
        self
    }

    /// Check whether a buffer created from `self` can stand in for `requested`.
    pub fn is_compatible_with(&self, requested: &BufferDescriptor) -> bool {
        self.size == requested.size
            && self.stride == requested.stride
            && self.memory == requested.memory
            && self.usage.contains(requested.usage)
    }
}
