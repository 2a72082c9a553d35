//! Texture types and descriptors.

use super::{ClearValue, Extent3d, MemoryLocation};
use bitflags::bitflags;

/// Texture format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit depth, float.
    Depth32Float,
}

/// Texture dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    /// One-dimensional texture.
    D1,
    /// Two-dimensional texture.
    #[default]
    D2,
    /// Three-dimensional (volume) texture.
    D3,
    /// Cube map (six 2D faces).
    Cube,
}

bitflags! {
    /// Bind flags for textures.
    ///
    /// The frame graph accumulates these from every pass access, so a
    /// declared descriptor only needs the flags the caller knows up front.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be copied from.
        const COPY_SRC = 1 << 0;
        /// Texture can be copied to.
        const COPY_DST = 1 << 1;
        /// Texture can be sampled in a shader.
        const TEXTURE_BINDING = 1 << 2;
        /// Texture can be used as a storage (unordered access) texture.
        const STORAGE_BINDING = 1 << 3;
        /// Texture can be used as a color render target.
        const RENDER_ATTACHMENT = 1 << 4;
        /// Texture can be used as a depth/stencil target.
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Dimensionality of the texture.
    pub dimension: TextureDimension,
    /// Size of the texture.
    pub size: Extent3d,
    /// Mip level count.
    pub mip_level_count: u32,
    /// Sample count for multisampling.
    pub sample_count: u32,
    /// Texture format.
    pub format: TextureFormat,
    /// Bind flags.
    pub usage: TextureUsage,
    /// Heap the texture lives in.
    pub memory: MemoryLocation,
    /// Optimized clear value.
    pub clear_value: ClearValue,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            size: Extent3d::new_2d(width, height),
            format,
            usage,
            ..Self::default()
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_level_count = count;
        self
    }

    /// Set the sample count for multisampling.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// Set the optimized clear value.
    pub fn with_clear_value(mut self, clear_value: ClearValue) -> Self {
        self.clear_value = clear_value;
        self
    }

    /// Check whether a texture created from `self` can stand in for `requested`.
    ///
    /// Everything but the bind flags must match exactly; the bind flags of
    /// `self` must be a superset of the requested ones. Labels are ignored.
    pub fn is_compatible_with(&self, requested: &TextureDescriptor) -> bool {
        self.dimension == requested.dimension
            && self.size == requested.size
            && self.mip_level_count == requested.mip_level_count
            && self.sample_count == requested.sample_count
            && self.format == requested.format
            && self.memory == requested.memory
            && self.usage.contains(requested.usage)
            && self.clear_value == requested.clear_value
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            dimension: TextureDimension::D2,
            size: Extent3d::default(),
            mip_level_count: 1,
            sample_count: 1,
            format: TextureFormat::default(),
            usage: TextureUsage::empty(),
            memory: MemoryLocation::GpuOnly,
            clear_value: ClearValue::None,
        }
    }
}
