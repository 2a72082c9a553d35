//! Resource registry.
//!
//! Resources live in a dense vector indexed by [`ResourceId`] for the duration
//! of one build/compile/execute cycle. Names resolve to ids through a map that
//! rejects re-declaration.

use std::collections::HashMap;

use crate::backend::ResourceHandle;
use crate::types::{BufferDescriptor, ResourceState, TextureDescriptor, ViewKind};

use super::{PassId, ResourceId, ViewId};

/// Descriptor of a graph resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceDesc {
    /// A texture.
    Texture(TextureDescriptor),
    /// A buffer.
    Buffer(BufferDescriptor),
}

impl ResourceDesc {
    /// Check if this describes a texture.
    pub fn is_texture(&self) -> bool {
        matches!(self, Self::Texture(_))
    }

    /// Check if this describes a buffer.
    pub fn is_buffer(&self) -> bool {
        matches!(self, Self::Buffer(_))
    }
}

/// Who owns a resource's backing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Owned by the graph and backed by the resource pool.
    Transient,
    /// Owned outside the graph; never pooled or destroyed.
    Imported(ResourceHandle),
    /// External target written by an export pass.
    ExportTarget(ResourceHandle),
}

impl Ownership {
    /// Check if the backing object is owned outside the graph.
    pub fn is_external(&self) -> bool {
        !matches!(self, Self::Transient)
    }

    /// Backing handle of an external resource.
    pub fn external_handle(&self) -> Option<ResourceHandle> {
        match self {
            Self::Transient => None,
            Self::Imported(handle) | Self::ExportTarget(handle) => Some(*handle),
        }
    }
}

/// A texture or buffer declared, imported or exported in a frame graph.
#[derive(Debug, Clone)]
pub struct Resource {
    id: ResourceId,
    name: String,
    desc: ResourceDesc,
    ownership: Ownership,
    initial_state: ResourceState,
    creator: Option<PassId>,
    writers: Vec<PassId>,
    readers: Vec<PassId>,
    views: Vec<ViewId>,
}

impl Resource {
    /// Get the resource id.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Get the resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the descriptor, including every bind flag accumulated from passes.
    pub fn descriptor(&self) -> &ResourceDesc {
        &self.desc
    }

    /// Get the ownership kind.
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// State the resource is in before the frame and returns to afterwards.
    pub fn initial_state(&self) -> ResourceState {
        self.initial_state
    }

    /// Pass that declared the resource (`None` for imported and export targets).
    pub fn creator(&self) -> Option<PassId> {
        self.creator
    }

    /// Passes that write the resource, in declaration order.
    pub fn writers(&self) -> &[PassId] {
        &self.writers
    }

    /// Passes that read the resource, in declaration order.
    pub fn readers(&self) -> &[PassId] {
        &self.readers
    }

    /// Views requested for the resource.
    pub fn views(&self) -> &[ViewId] {
        &self.views
    }

    /// Check if this is a texture.
    pub fn is_texture(&self) -> bool {
        self.desc.is_texture()
    }

    pub(crate) fn desc_mut(&mut self) -> &mut ResourceDesc {
        &mut self.desc
    }

    pub(crate) fn add_writer(&mut self, pass: PassId) {
        if self.writers.last() != Some(&pass) {
            self.writers.push(pass);
        }
    }

    pub(crate) fn add_reader(&mut self, pass: PassId) {
        if self.readers.last() != Some(&pass) {
            self.readers.push(pass);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ViewEntry {
    pub resource: ResourceId,
    pub kind: ViewKind,
}

/// Name → id resolution and dense storage for resources and views.
#[derive(Debug, Default)]
pub(crate) struct ResourceRegistry {
    resources: Vec<Resource>,
    by_name: HashMap<String, ResourceId>,
    views: Vec<ViewEntry>,
    view_lookup: HashMap<(ResourceId, ViewKind), ViewId>,
}

impl ResourceRegistry {
    /// Register a new resource.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already declared.
    pub fn insert(
        &mut self,
        name: String,
        desc: ResourceDesc,
        ownership: Ownership,
        initial_state: ResourceState,
        creator: Option<PassId>,
    ) -> ResourceId {
        assert!(
            !self.by_name.contains_key(&name),
            "Resource '{}' is already declared",
            name
        );
        let id = ResourceId::new(self.resources.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.resources.push(Resource {
            id,
            name,
            desc,
            ownership,
            initial_state,
            creator,
            writers: Vec::new(),
            readers: Vec::new(),
            views: Vec::new(),
        });
        id
    }

    pub fn lookup(&self, name: &str) -> Option<ResourceId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: ResourceId) -> &Resource {
        &self.resources[id.index()]
    }

    pub fn get_mut(&mut self, id: ResourceId) -> &mut Resource {
        &mut self.resources[id.index()]
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Get or create the view id for `(resource, kind)`.
    pub fn view(&mut self, resource: ResourceId, kind: ViewKind) -> ViewId {
        if let Some(&view) = self.view_lookup.get(&(resource, kind)) {
            return view;
        }
        let view = ViewId::new(self.views.len() as u32);
        self.views.push(ViewEntry { resource, kind });
        self.view_lookup.insert((resource, kind), view);
        self.resources[resource.index()].views.push(view);
        view
    }

    pub fn view_entry(&self, view: ViewId) -> ViewEntry {
        self.views[view.index()]
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn clear(&mut self) {
        self.resources.clear();
        self.by_name.clear();
        self.views.clear();
        self.view_lookup.clear();
    }
}
