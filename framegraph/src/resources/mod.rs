//! Transient resource management.
//!
//! Transient textures and buffers are owned by the graph only for the levels
//! between their first and last use. Their backing GPU objects come from a
//! [`ResourcePool`] that outlives individual frames, so a steady-state frame
//! allocates nothing.

mod pool;

pub use pool::{Acquired, PoolId, ResourcePool};
