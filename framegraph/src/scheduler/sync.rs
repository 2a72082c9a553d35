//! Queue types and timeline bookkeeping.

use crate::backend::GpuBackend;

/// Hardware queue a pass is recorded on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueueType {
    /// The main graphics queue.
    Graphics,
    /// The asynchronous compute queue.
    Compute,
}

impl QueueType {
    /// Number of queues.
    pub const COUNT: usize = 2;

    /// All queues, in index order.
    pub const ALL: [QueueType; Self::COUNT] = [QueueType::Graphics, QueueType::Compute];

    /// Dense index of the queue.
    pub fn index(self) -> usize {
        match self {
            Self::Graphics => 0,
            Self::Compute => 1,
        }
    }

    /// The queue on the other side of a cross-queue dependency.
    pub fn other(self) -> Self {
        match self {
            Self::Graphics => Self::Compute,
            Self::Compute => Self::Graphics,
        }
    }
}

/// CPU-side view of each queue's timeline fence.
///
/// Tracks the last value handed to a submission. Values start at 1 and
/// increase by one per submission, for the whole lifetime of the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueTimelines {
    submitted: [u64; QueueType::COUNT],
}

impl QueueTimelines {
    /// Create timelines with nothing submitted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value signalled by the most recent submission on `queue` (0 if none).
    pub fn last_submitted(&self, queue: QueueType) -> u64 {
        self.submitted[queue.index()]
    }

    /// Value the next submission on `queue` will signal.
    pub fn pending(&self, queue: QueueType) -> u64 {
        self.submitted[queue.index()] + 1
    }

    /// Reserve the next value on `queue` for a submission.
    pub fn advance(&mut self, queue: QueueType) -> u64 {
        let slot = &mut self.submitted[queue.index()];
        *slot += 1;
        *slot
    }
}

/// The point after which the GPU no longer touches a released resource.
///
/// Holds one timeline value per queue. The point is retired once every
/// queue's completed value has reached it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RetirePoint {
    values: [u64; QueueType::COUNT],
}

impl RetirePoint {
    /// A point that is already retired.
    pub const IMMEDIATE: Self = Self {
        values: [0; QueueType::COUNT],
    };

    /// Build a retire point from per-queue values.
    pub fn new(graphics: u64, compute: u64) -> Self {
        Self {
            values: [graphics, compute],
        }
    }

    /// Value that must complete on `queue`.
    pub fn value(&self, queue: QueueType) -> u64 {
        self.values[queue.index()]
    }

    /// Returns true once the backend has completed every value of this point.
    pub fn is_retired(&self, backend: &dyn GpuBackend) -> bool {
        QueueType::ALL
            .iter()
            .all(|&queue| self.value(queue) == 0 || backend.completed_value(queue) >= self.value(queue))
    }
}
