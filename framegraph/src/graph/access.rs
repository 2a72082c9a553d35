//! Resource access declarations.
//!
//! Every builder call maps to one access mode. The mode decides the GPU state
//! the resource must be in during the pass, the view the pass receives, and
//! the bind flags accumulated onto the resource's descriptor.

use crate::types::{BufferUsage, ResourceState, TextureUsage, ViewKind};

/// Shader stages a shader-resource read is visible to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReadAccess {
    /// Pixel (fragment) stage only.
    #[default]
    PixelShader,
    /// Every stage except the pixel stage (vertex, compute, ...).
    NonPixelShader,
    /// Every stage.
    AllShader,
}

impl ReadAccess {
    fn state(self) -> ResourceState {
        match self {
            Self::PixelShader => ResourceState::PIXEL_SHADER_RESOURCE,
            Self::NonPixelShader => ResourceState::NON_PIXEL_SHADER_RESOURCE,
            Self::AllShader => ResourceState::ALL_SHADER_RESOURCE,
        }
    }
}

/// How a texture is used within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureAccess {
    /// Sampled in a shader.
    ShaderRead(ReadAccess),
    /// Read/write as storage texture.
    StorageWrite,
    /// Written as color render target.
    RenderTarget,
    /// Written as depth/stencil target.
    DepthStencilWrite,
    /// Bound as read-only depth/stencil target.
    DepthStencilRead,
    /// Source of a copy.
    CopySource,
    /// Destination of a copy.
    CopyDest,
}

impl TextureAccess {
    /// GPU state required by this access.
    pub fn state(self) -> ResourceState {
        match self {
            Self::ShaderRead(read) => read.state(),
            Self::StorageWrite => ResourceState::UNORDERED_ACCESS,
            Self::RenderTarget => ResourceState::RENDER_TARGET,
            Self::DepthStencilWrite => ResourceState::DEPTH_WRITE,
            Self::DepthStencilRead => ResourceState::DEPTH_READ,
            Self::CopySource => ResourceState::COPY_SOURCE,
            Self::CopyDest => ResourceState::COPY_DEST,
        }
    }

    /// View handed to the pass.
    pub fn view_kind(self) -> ViewKind {
        match self {
            Self::ShaderRead(_) => ViewKind::ShaderResource,
            Self::StorageWrite => ViewKind::UnorderedAccess,
            Self::RenderTarget => ViewKind::RenderTarget,
            Self::DepthStencilWrite => ViewKind::DepthStencil,
            Self::DepthStencilRead => ViewKind::ReadOnlyDepthStencil,
            Self::CopySource | Self::CopyDest => ViewKind::Raw,
        }
    }

    /// Bind flags the texture needs for this access.
    pub fn usage(self) -> TextureUsage {
        match self {
            Self::ShaderRead(_) => TextureUsage::TEXTURE_BINDING,
            Self::StorageWrite => TextureUsage::STORAGE_BINDING,
            Self::RenderTarget => TextureUsage::RENDER_ATTACHMENT,
            Self::DepthStencilWrite | Self::DepthStencilRead => {
                TextureUsage::DEPTH_STENCIL_ATTACHMENT
            }
            Self::CopySource => TextureUsage::COPY_SRC,
            Self::CopyDest => TextureUsage::COPY_DST,
        }
    }

    /// Check if this access writes the texture.
    pub fn is_write(self) -> bool {
        self.state().is_write()
    }
}

/// How a buffer is used within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferAccess {
    /// Read as shader resource.
    ShaderRead(ReadAccess),
    /// Read/write as storage buffer.
    StorageWrite,
    /// Source of a copy.
    CopySource,
    /// Destination of a copy.
    CopyDest,
    /// Indirect draw/dispatch arguments.
    IndirectArgs,
    /// Vertex buffer.
    Vertex,
    /// Index buffer.
    Index,
    /// Constant (uniform) buffer.
    Constant,
}

impl BufferAccess {
    /// GPU state required by this access.
    pub fn state(self) -> ResourceState {
        match self {
            Self::ShaderRead(read) => read.state(),
            Self::StorageWrite => ResourceState::UNORDERED_ACCESS,
            Self::CopySource => ResourceState::COPY_SOURCE,
            Self::CopyDest => ResourceState::COPY_DEST,
            Self::IndirectArgs => ResourceState::INDIRECT_ARGUMENT,
            Self::Vertex | Self::Constant => ResourceState::VERTEX_AND_CONSTANT_BUFFER,
            Self::Index => ResourceState::INDEX_BUFFER,
        }
    }

    /// View handed to the pass.
    pub fn view_kind(self) -> ViewKind {
        match self {
            Self::ShaderRead(_) => ViewKind::ShaderResource,
            Self::StorageWrite => ViewKind::UnorderedAccess,
            Self::Constant => ViewKind::ConstantBuffer,
            Self::CopySource | Self::CopyDest | Self::IndirectArgs | Self::Vertex | Self::Index => {
                ViewKind::Raw
            }
        }
    }

    /// Bind flags the buffer needs for this access.
    pub fn usage(self) -> BufferUsage {
        match self {
            Self::ShaderRead(_) => BufferUsage::SHADER_READ,
            Self::StorageWrite => BufferUsage::STORAGE,
            Self::CopySource => BufferUsage::COPY_SRC,
            Self::CopyDest => BufferUsage::COPY_DST,
            Self::IndirectArgs => BufferUsage::INDIRECT,
            Self::Vertex => BufferUsage::VERTEX,
            Self::Index => BufferUsage::INDEX,
            Self::Constant => BufferUsage::UNIFORM,
        }
    }

    /// Check if this access writes the buffer.
    pub fn is_write(self) -> bool {
        self.state().is_write()
    }
}
