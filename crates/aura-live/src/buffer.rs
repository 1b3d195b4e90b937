//! Bounded packet buffer
//!
//! The buffer is the single source of truth for the live view. It holds the
//! most recently received records up to a fixed capacity and drops the
//! oldest ones first when a batch would overflow it.

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;

use aura_model::PacketSummary;
use tracing::debug;

/// Default maximum number of records kept in memory
pub const MAX_BUFFERED_PACKETS: usize = 50_000;

/// Records held by the buffer
pub type Records = VecDeque<Arc<PacketSummary>>;

/// Result of a non-empty append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Records from the batch that are now in the buffer
    pub appended: usize,
    /// Records dropped to stay within capacity (old contents and the head of
    /// an oversized batch)
    pub evicted: usize,
}

/// Read-only view of the buffer contents at the time it was taken
///
/// Cheap to take and to clone. Appends after the snapshot was taken are not
/// visible through it.
#[derive(Debug, Clone, Default)]
pub struct BufferSnapshot {
    records: Arc<Records>,
    generation: u64,
}

impl BufferSnapshot {
    /// Generation of the buffer this snapshot was taken at
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Deref for BufferSnapshot {
    type Target = Records;

    fn deref(&self) -> &Records {
        &self.records
    }
}

/// Append-only bounded buffer with FIFO overflow
#[derive(Debug)]
pub struct StreamBuffer {
    /// Current records, shared with outstanding snapshots
    records: Arc<Records>,
    /// Maximum records to keep
    capacity: usize,
    /// Bumped on every change to the contents
    generation: u64,
    /// Records dropped by overflow since creation
    total_evicted: u64,
}

impl StreamBuffer {
    /// Create an empty buffer with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFERED_PACKETS)
    }

    /// Create an empty buffer holding at most `capacity` records (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Arc::new(VecDeque::new()),
            capacity: capacity.max(1),
            generation: 0,
            total_evicted: 0,
        }
    }

    /// Append a batch in arrival order
    ///
    /// Returns `None` for an empty batch, which leaves the buffer (and its
    /// generation) untouched.
    pub fn append(&mut self, batch: Vec<PacketSummary>) -> Option<AppendOutcome> {
        if batch.is_empty() {
            return None;
        }

        let capacity = self.capacity;
        // Only the tail of an oversized batch can ever be observed
        let skip = batch.len().saturating_sub(capacity);
        let appended = batch.len() - skip;

        let records = Arc::make_mut(&mut self.records);
        let overflow = (records.len() + appended).saturating_sub(capacity);
        records.drain(..overflow);
        records.extend(batch.into_iter().skip(skip).map(Arc::new));

        let evicted = skip + overflow;
        self.total_evicted += evicted as u64;
        self.generation += 1;

        if evicted > 0 {
            debug!(
                "Buffer full ({} records), evicted {} oldest",
                capacity, evicted
            );
        }

        Some(AppendOutcome { appended, evicted })
    }

    /// Drop all records
    pub fn reset(&mut self) {
        // Outstanding snapshots keep the old contents alive
        self.records = Arc::new(VecDeque::new());
        self.generation += 1;
    }

    /// Take a read-only snapshot of the current contents
    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            records: Arc::clone(&self.records),
            generation: self.generation,
        }
    }

    /// Change counter, bumped by every append or reset that changed contents
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of records held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records dropped by overflow since the buffer was created
    pub fn total_evicted(&self) -> u64 {
        self.total_evicted
    }

    /// Find a retained record by id
    pub fn get(&self, id: u64) -> Option<&Arc<PacketSummary>> {
        // Ids are monotonic, so the retained set is sorted by id
        let records = &*self.records;
        let index = records.partition_point(|r| r.id < id);
        records.get(index).filter(|r| r.id == id)
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}
