//! Session configuration

use std::time::Duration;

use aura_model::FORMAT_CACHE_MAX_SIZE;
use serde::{Deserialize, Serialize};

use crate::buffer::MAX_BUFFERED_PACKETS;
use crate::debounce::FILTER_SETTLE_MS;
use crate::ingest::{BATCH_SIZE, BATCH_TIMEOUT_MS};
use crate::stats::TOP_TALKERS;

/// Tunables for one live session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum packets kept in the buffer
    pub buffer_capacity: usize,
    /// Quiet period before an edited filter is applied (ms)
    pub filter_debounce_ms: u64,
    /// Maximum entries per format cache
    pub format_cache_capacity: usize,
    /// Entries in each top talker list
    pub top_talkers: usize,
    /// Records per ingest batch before it is flushed
    pub batch_size: usize,
    /// Maximum age of a partial ingest batch (ms)
    pub batch_timeout_ms: u64,
    /// Capacity of the session command channel
    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: MAX_BUFFERED_PACKETS,
            filter_debounce_ms: FILTER_SETTLE_MS,
            format_cache_capacity: FORMAT_CACHE_MAX_SIZE,
            top_talkers: TOP_TALKERS,
            batch_size: BATCH_SIZE,
            batch_timeout_ms: BATCH_TIMEOUT_MS,
            command_buffer: 256,
        }
    }
}

impl SessionConfig {
    /// Filter settle time as a duration
    pub fn filter_debounce(&self) -> Duration {
        Duration::from_millis(self.filter_debounce_ms)
    }

    /// Partial batch timeout as a duration
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }
}
