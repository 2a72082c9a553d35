//! Frame-indexed pool of transient GPU resources.
//!
//! Entries are matched by descriptor compatibility rather than identity: a
//! request is satisfied by any free entry whose descriptor matches exactly
//! except for bind flags, which only need to be a superset.
//!
//! Releasing an entry does not make it reusable right away. The executor
//! passes a [`RetirePoint`] naming the timeline values of the submissions
//! that still reference the object; the entry is only handed out again once
//! the backend reports those values as completed. Free entries that stay
//! unused for more than [`PoolConfig::max_unused_frames`] frames are
//! destroyed.
//!
//! # Example
//!
//! ```ignore
//! let mut pool = ResourcePool::new(PoolConfig::default());
//! let acquired = pool.acquire_texture(&backend, &desc, frame)?;
//! // ... record work using acquired.handle ...
//! pool.release(acquired.id, retire_point, frame);
//! pool.evict_unused(&backend, frame);
//! ```

use std::collections::HashMap;

use crate::backend::{BackendResult, BufferHandle, GpuBackend, TextureHandle, ViewHandle};
use crate::config::PoolConfig;
use crate::scheduler::RetirePoint;
use crate::types::{BufferDescriptor, TextureDescriptor, ViewDesc};

/// Stable index of a pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(u32);

impl PoolId {
    /// Get the raw index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Result of acquiring a resource from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquired<T> {
    /// Entry to release when the resource's lifetime ends.
    pub id: PoolId,
    /// Backing object.
    pub handle: T,
    /// True if an existing entry was reused instead of creating a new object.
    pub reused: bool,
}

#[derive(Debug)]
enum Backing {
    Texture {
        handle: TextureHandle,
        descriptor: TextureDescriptor,
    },
    Buffer {
        handle: BufferHandle,
        descriptor: BufferDescriptor,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryStatus {
    /// Owned by a live graph resource.
    InUse,
    /// Released; reusable once the retire point completes.
    Free(RetirePoint),
}

#[derive(Debug)]
struct PoolEntry {
    backing: Backing,
    status: EntryStatus,
    last_used_frame: u64,
    views: HashMap<ViewDesc, ViewHandle>,
}

impl PoolEntry {
    fn is_available(&self, backend: &dyn GpuBackend) -> bool {
        match self.status {
            EntryStatus::InUse => false,
            EntryStatus::Free(retire) => retire.is_retired(backend),
        }
    }

    fn destroy(self, backend: &dyn GpuBackend) {
        for view in self.views.into_values() {
            backend.destroy_view(view);
        }
        match self.backing {
            Backing::Texture { handle, .. } => backend.destroy_texture(handle),
            Backing::Buffer { handle, .. } => backend.destroy_buffer(handle),
        }
    }
}

/// Pool of transient textures and buffers shared across frames.
#[derive(Debug)]
pub struct ResourcePool {
    config: PoolConfig,
    entries: Vec<Option<PoolEntry>>,
    vacant: Vec<u32>,
}

impl ResourcePool {
    /// Create an empty pool.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            vacant: Vec::new(),
        }
    }

    /// Get the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of backing objects currently owned by the pool.
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// Check if the pool owns no backing objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries currently owned by a live resource.
    pub fn in_use_count(&self) -> usize {
        self.entries
            .iter()
            .flatten()
            .filter(|entry| entry.status == EntryStatus::InUse)
            .count()
    }

    /// Acquire a texture compatible with `descriptor`.
    ///
    /// Reuses the first free, retired, compatible entry; otherwise creates a
    /// new texture through the backend.
    pub fn acquire_texture(
        &mut self,
        backend: &dyn GpuBackend,
        descriptor: &TextureDescriptor,
        frame: u64,
    ) -> BackendResult<Acquired<TextureHandle>> {
        let found = self.entries.iter().position(|slot| {
            slot.as_ref().is_some_and(|entry| {
                matches!(
                    &entry.backing,
                    Backing::Texture { descriptor: pooled, .. } if pooled.is_compatible_with(descriptor)
                ) && entry.is_available(backend)
            })
        });

        if let Some(index) = found {
            let entry = self.mark_in_use(index, frame);
            if let Backing::Texture { handle, .. } = entry.backing {
                log::trace!(
                    "ResourcePool: reusing texture {:?} for {:?}",
                    handle,
                    descriptor.label
                );
                return Ok(Acquired {
                    id: PoolId(index as u32),
                    handle,
                    reused: true,
                });
            }
        }

        let handle = backend.create_texture(descriptor)?;
        let id = self.insert(
            Backing::Texture {
                handle,
                descriptor: descriptor.clone(),
            },
            frame,
        );
        Ok(Acquired {
            id,
            handle,
            reused: false,
        })
    }

    /// Acquire a buffer compatible with `descriptor`.
    pub fn acquire_buffer(
        &mut self,
        backend: &dyn GpuBackend,
        descriptor: &BufferDescriptor,
        frame: u64,
    ) -> BackendResult<Acquired<BufferHandle>> {
        let found = self.entries.iter().position(|slot| {
            slot.as_ref().is_some_and(|entry| {
                matches!(
                    &entry.backing,
                    Backing::Buffer { descriptor: pooled, .. } if pooled.is_compatible_with(descriptor)
                ) && entry.is_available(backend)
            })
        });

        if let Some(index) = found {
            let entry = self.mark_in_use(index, frame);
            if let Backing::Buffer { handle, .. } = entry.backing {
                log::trace!(
                    "ResourcePool: reusing buffer {:?} for {:?}",
                    handle,
                    descriptor.label
                );
                return Ok(Acquired {
                    id: PoolId(index as u32),
                    handle,
                    reused: true,
                });
            }
        }

        let handle = backend.create_buffer(descriptor)?;
        let id = self.insert(
            Backing::Buffer {
                handle,
                descriptor: descriptor.clone(),
            },
            frame,
        );
        Ok(Acquired {
            id,
            handle,
            reused: false,
        })
    }

    /// Get or create a view of a pooled object.
    ///
    /// Views are cached on the entry and live as long as the backing object.
    pub fn view(
        &mut self,
        backend: &dyn GpuBackend,
        id: PoolId,
        descriptor: ViewDesc,
    ) -> BackendResult<ViewHandle> {
        let entry = self.entry_mut(id);
        if let Some(&view) = entry.views.get(&descriptor) {
            return Ok(view);
        }
        let view = match (&entry.backing, &descriptor) {
            (Backing::Texture { handle, .. }, ViewDesc::Texture(desc)) => {
                backend.create_texture_view(*handle, desc)?
            }
            (Backing::Buffer { handle, .. }, ViewDesc::Buffer(desc)) => {
                backend.create_buffer_view(*handle, desc)?
            }
            (backing, _) => panic!(
                "View descriptor {:?} does not match pooled object {:?}",
                descriptor, backing
            ),
        };
        entry.views.insert(descriptor, view);
        Ok(view)
    }

    /// Return an entry to the pool.
    ///
    /// The entry becomes reusable once `retire` has completed on the GPU.
    pub fn release(&mut self, id: PoolId, retire: RetirePoint, frame: u64) {
        let entry = self.entry_mut(id);
        assert!(
            entry.status == EntryStatus::InUse,
            "Pool entry {:?} released twice",
            id
        );
        entry.status = EntryStatus::Free(retire);
        entry.last_used_frame = frame;
    }

    /// Destroy free entries unused for more than the configured number of frames.
    ///
    /// Returns the number of destroyed entries.
    pub fn evict_unused(&mut self, backend: &dyn GpuBackend, frame: u64) -> usize {
        let max_unused = self.config.max_unused_frames;
        let mut evicted = 0;
        for (index, slot) in self.entries.iter_mut().enumerate() {
            let expired = slot.as_ref().is_some_and(|entry| {
                frame.saturating_sub(entry.last_used_frame) > max_unused
                    && entry.is_available(backend)
            });
            if expired {
                if let Some(entry) = slot.take() {
                    log::trace!("ResourcePool: evicting entry {} ({:?})", index, entry.backing);
                    entry.destroy(backend);
                    self.vacant.push(index as u32);
                    evicted += 1;
                }
            }
        }
        if evicted > 0 {
            log::debug!("ResourcePool: evicted {} entries at frame {}", evicted, frame);
        }
        evicted
    }

    /// Destroy every entry, including ones still in use.
    ///
    /// The caller must make sure the GPU is idle.
    pub fn clear(&mut self, backend: &dyn GpuBackend) {
        for entry in self.entries.drain(..).flatten() {
            entry.destroy(backend);
        }
        self.vacant.clear();
    }

    fn insert(&mut self, backing: Backing, frame: u64) -> PoolId {
        let entry = PoolEntry {
            backing,
            status: EntryStatus::InUse,
            last_used_frame: frame,
            views: HashMap::new(),
        };
        match self.vacant.pop() {
            Some(index) => {
                self.entries[index as usize] = Some(entry);
                PoolId(index)
            }
            None => {
                self.entries.push(Some(entry));
                PoolId((self.entries.len() - 1) as u32)
            }
        }
    }

    fn mark_in_use(&mut self, index: usize, frame: u64) -> &PoolEntry {
        let entry = self.entry_mut(PoolId(index as u32));
        entry.status = EntryStatus::InUse;
        entry.last_used_frame = frame;
        entry
    }

    fn entry_mut(&mut self, id: PoolId) -> &mut PoolEntry {
        self.entries
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("Invalid pool entry {:?}", id))
    }
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

static_assertions::assert_impl_all!(ResourcePool: Send, Sync);
