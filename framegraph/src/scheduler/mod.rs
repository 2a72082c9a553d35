//! Queue scheduling primitives.
//!
//! The frame graph drives two hardware queues: the graphics queue, which runs
//! every `Graphics`, `Compute` and `Copy` pass, and the compute queue, which
//! runs `AsyncCompute` passes when async compute is enabled.
//!
//! Each queue owns a monotonically increasing timeline fence. Every
//! submission signals the next value on its queue's timeline; cross-queue
//! waits and pool retirement are both expressed in terms of these values.
//!
//! | Level | Primitive | Purpose |
//! |-------|-----------|---------|
//! | Level → Level | Barriers | Resource state transitions within a frame |
//! | Queue → Queue | Timeline waits | Async compute ordering within a frame |
//! | Frame → Frame | Retire points | Reuse of pooled resources across frames |

mod sync;

pub use sync::{QueueTimelines, QueueType, RetirePoint};
