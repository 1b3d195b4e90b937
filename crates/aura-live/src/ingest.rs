//! Batching of individually received records
//!
//! The capture engine delivers packets to the view in batches: a batch is
//! flushed once it holds [`BATCH_SIZE`] records or once [`BATCH_TIMEOUT_MS`]
//! have passed since the last flush, whichever comes first.

use std::time::Duration;

use aura_model::PacketSummary;
use tokio::time::Instant;

/// Default records per batch
pub const BATCH_SIZE: usize = 50;

/// Default maximum time between flushes of a partial batch (ms)
pub const BATCH_TIMEOUT_MS: u64 = 250;

/// Groups a record stream into delivery batches
#[derive(Debug)]
pub struct BatchCoalescer {
    batch: Vec<PacketSummary>,
    max_batch: usize,
    max_delay: Duration,
    last_flush: Instant,
}

impl BatchCoalescer {
    /// Create a coalescer; `max_batch` is clamped to at least 1
    pub fn new(max_batch: usize, max_delay: Duration, now: Instant) -> Self {
        let max_batch = max_batch.max(1);
        Self {
            batch: Vec::with_capacity(max_batch),
            max_batch,
            max_delay,
            last_flush: now,
        }
    }

    /// Queue a record, returning a full batch if this completed one
    pub fn push(&mut self, record: PacketSummary, now: Instant) -> Option<Vec<PacketSummary>> {
        self.batch.push(record);
        if self.batch.len() >= self.max_batch {
            return self.take(now);
        }
        None
    }

    /// Flush a partial batch if the timeout elapsed
    pub fn poll(&mut self, now: Instant) -> Option<Vec<PacketSummary>> {
        if !self.batch.is_empty() && now.duration_since(self.last_flush) >= self.max_delay {
            return self.take(now);
        }
        None
    }

    /// Drain whatever is queued (used when capture stops)
    pub fn flush(&mut self) -> Option<Vec<PacketSummary>> {
        if self.batch.is_empty() {
            return None;
        }
        Some(std::mem::replace(
            &mut self.batch,
            Vec::with_capacity(self.max_batch),
        ))
    }

    /// Records waiting in the current batch
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    fn take(&mut self, now: Instant) -> Option<Vec<PacketSummary>> {
        self.last_flush = now;
        self.flush()
    }
}
