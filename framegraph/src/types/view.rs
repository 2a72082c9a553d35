//! View descriptors.
//!
//! A view is the descriptor a shader or the output merger uses to address a
//! resource. Pooled backing objects cache their views keyed by these
//! descriptors, so they must be cheap to compare and hash.

use super::TextureFormat;

/// The kind of view a pass requests for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewKind {
    /// Shader resource view (SRV).
    ShaderResource,
    /// Unordered access view (UAV).
    UnorderedAccess,
    /// Render target view (RTV). Textures only.
    RenderTarget,
    /// Writable depth/stencil view (DSV). Textures only.
    DepthStencil,
    /// Read-only depth/stencil view. Textures only.
    ReadOnlyDepthStencil,
    /// Constant buffer view (CBV). Buffers only.
    ConstantBuffer,
    /// No descriptor; the resource is bound by handle (copies, vertex/index, indirect).
    Raw,
}

impl ViewKind {
    /// Returns true if creating this view requires a backend descriptor.
    pub fn needs_descriptor(self) -> bool {
        self != Self::Raw
    }

    /// Returns true if this view kind can address a buffer.
    pub fn is_buffer_compatible(self) -> bool {
        !matches!(
            self,
            Self::RenderTarget | Self::DepthStencil | Self::ReadOnlyDepthStencil
        )
    }

    /// Returns true if this view kind can address a texture.
    pub fn is_texture_compatible(self) -> bool {
        self != Self::ConstantBuffer
    }
}

/// Descriptor for a texture view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureViewDesc {
    /// View kind.
    pub kind: ViewKind,
    /// Format the texture is viewed as.
    pub format: TextureFormat,
    /// First mip level visible through the view.
    pub base_mip_level: u32,
    /// Number of visible mip levels.
    pub mip_level_count: u32,
}

impl TextureViewDesc {
    /// Create a view covering every mip level.
    pub fn new(kind: ViewKind, format: TextureFormat, mip_level_count: u32) -> Self {
        assert!(
            kind.is_texture_compatible() && kind.needs_descriptor(),
            "Unsupported texture view type {:?}",
            kind
        );
        Self {
            kind,
            format,
            base_mip_level: 0,
            mip_level_count,
        }
    }
}

/// Descriptor for a buffer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferViewDesc {
    /// View kind.
    pub kind: ViewKind,
    /// Byte offset of the first element.
    pub offset: u64,
    /// Size of the view in bytes.
    pub size: u64,
    /// Structured element stride (0 for raw views).
    pub stride: u32,
}

impl BufferViewDesc {
    /// Create a view covering the whole buffer.
    ///
    /// # Panics
    ///
    /// Panics if `kind` cannot address a buffer (render-target and depth views).
    pub fn new(kind: ViewKind, size: u64, stride: u32) -> Self {
        assert!(
            kind.is_buffer_compatible() && kind.needs_descriptor(),
            "Unsupported buffer view type {:?}",
            kind
        );
        Self {
            kind,
            offset: 0,
            size,
            stride,
        }
    }
}

/// Either view descriptor, used as a view cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewDesc {
    /// Texture view.
    Texture(TextureViewDesc),
    /// Buffer view.
    Buffer(BufferViewDesc),
}
