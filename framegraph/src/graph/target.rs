//! Render target load/store operations and attachment bindings.

use crate::types::ClearValue;

use super::{ResourceId, ViewId};

/// Load operation for a render target at the start of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LoadOp {
    /// Clear the target with the given value.
    Clear(ClearValue),
    /// Load the existing contents.
    #[default]
    Load,
    /// Don't care about existing contents (may be undefined).
    DontCare,
}

impl LoadOp {
    /// Create a clear operation with a color value.
    pub fn clear_color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Clear(ClearValue::color(r, g, b, a))
    }

    /// Create a clear operation with a depth value.
    pub fn clear_depth(depth: f32) -> Self {
        Self::Clear(ClearValue::depth(depth))
    }

    /// Returns true if this operation clears the target.
    pub fn is_clear(&self) -> bool {
        matches!(self, Self::Clear(_))
    }
}

/// Store operation for a render target at the end of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreOp {
    /// Store the results.
    #[default]
    Store,
    /// Don't care about storing (contents may be discarded).
    DontCare,
}

/// A color target bound by a graphics pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorTarget {
    /// Target resource.
    pub resource: ResourceId,
    /// Render target view requested during setup.
    pub view: ViewId,
    /// Load operation.
    pub load: LoadOp,
    /// Store operation.
    pub store: StoreOp,
}

/// The depth/stencil target bound by a graphics pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilTarget {
    /// Target resource.
    pub resource: ResourceId,
    /// Depth/stencil view requested during setup.
    pub view: ViewId,
    /// Load operation.
    pub load: LoadOp,
    /// Store operation.
    pub store: StoreOp,
    /// The target is bound read-only.
    pub read_only: bool,
}
