//! GPU resource states.

use bitflags::bitflags;

bitflags! {
    /// State a resource must be in while a pass accesses it.
    ///
    /// Read states can be combined (for example [`ResourceState::ALL_SHADER_RESOURCE`]);
    /// write states are exclusive and never combined with anything else.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct ResourceState: u32 {
        /// Vertex or constant buffer input.
        const VERTEX_AND_CONSTANT_BUFFER = 1 << 0;
        /// Index buffer input.
        const INDEX_BUFFER = 1 << 1;
        /// Color render target.
        const RENDER_TARGET = 1 << 2;
        /// Unordered (storage) access.
        const UNORDERED_ACCESS = 1 << 3;
        /// Writable depth/stencil target.
        const DEPTH_WRITE = 1 << 4;
        /// Read-only depth/stencil target.
        const DEPTH_READ = 1 << 5;
        /// Shader resource outside the pixel stage.
        const NON_PIXEL_SHADER_RESOURCE = 1 << 6;
        /// Shader resource in the pixel stage.
        const PIXEL_SHADER_RESOURCE = 1 << 7;
        /// Indirect draw/dispatch arguments.
        const INDIRECT_ARGUMENT = 1 << 8;
        /// Copy destination.
        const COPY_DEST = 1 << 9;
        /// Copy source.
        const COPY_SOURCE = 1 << 10;
        /// Presentable swapchain image.
        const PRESENT = 1 << 11;

        /// Shader resource in every stage.
        const ALL_SHADER_RESOURCE =
            Self::NON_PIXEL_SHADER_RESOURCE.bits() | Self::PIXEL_SHADER_RESOURCE.bits();
    }
}

impl ResourceState {
    /// The state resources are created in and returned to the pool in.
    pub const COMMON: Self = Self::empty();

    const WRITE_STATES: Self = Self::RENDER_TARGET
        .union(Self::UNORDERED_ACCESS)
        .union(Self::DEPTH_WRITE)
        .union(Self::COPY_DEST);

    /// Returns true if this state allows the GPU to write the resource.
    pub fn is_write(self) -> bool {
        self.intersects(Self::WRITE_STATES)
    }

    /// Returns true if this is a valid state for a single pass access.
    ///
    /// A write state is only valid on its own.
    pub fn is_valid_combination(self) -> bool {
        !self.is_write() || self.bits().count_ones() == 1
    }
}

impl Default for ResourceState {
    fn default() -> Self {
        Self::COMMON
    }
}
