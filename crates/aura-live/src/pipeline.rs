//! Derived views over the packet buffer
//!
//! The pipeline owns the buffer and the applied filter, and derives two
//! views from them:
//!
//! - **FilteredView** depends on the buffer and the applied filter
//! - **Statistics** depends on the buffer only
//!
//! Both are computed on first read after one of their inputs changed and
//! cached until the next change. Changes arrive through two explicit hooks:
//! buffer mutations (`append` / `reset`) and [`DerivationPipeline::on_filter_settled`].

use std::ops::Range;
use std::sync::Arc;

use aura_model::{PacketSummary, TimestampFormatter};
use serde::Serialize;
use tracing::debug;

use crate::buffer::{AppendOutcome, BufferSnapshot, StreamBuffer};
use crate::config::SessionConfig;
use crate::filter::FilterQuery;
use crate::stats::{self, Statistics};

/// Packets from the buffer that match the applied filter, in buffer order
#[derive(Debug, Clone, Default)]
pub struct FilteredView {
    /// Matching records
    records: Vec<Arc<PacketSummary>>,
    /// Filter text the view was computed with
    filter: String,
    /// Buffer generation the view was computed from
    generation: u64,
}

impl FilteredView {
    /// Matching records
    pub fn records(&self) -> &[Arc<PacketSummary>] {
        &self.records
    }

    /// Ids of the matching records, in order
    pub fn ids(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.id).collect()
    }

    /// Number of matching records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing matched
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Filter text the view was computed with
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Buffer generation the view was computed from
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A packet list row ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketRow {
    /// Packet id
    pub id: u64,
    /// Formatted time of day
    pub time: String,
    /// Source address
    pub source: String,
    /// Destination address
    pub destination: String,
    /// Protocol tag
    pub protocol: String,
    /// Length in bytes
    pub length: u32,
    /// Info column
    pub info: String,
}

/// Number of view recomputations since the pipeline was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecomputeCounts {
    /// Filtered view recomputations
    pub filtered: u64,
    /// Statistics recomputations
    pub statistics: u64,
}

/// A derived value and the input revision it was computed from
#[derive(Debug)]
struct Cached<T> {
    key: (u64, u64),
    value: Arc<T>,
}

/// Owns the buffer and derives the filtered and statistics views from it
#[derive(Debug)]
pub struct DerivationPipeline {
    buffer: StreamBuffer,
    /// Settled filter text currently applied
    applied_filter: String,
    /// Parsed form of `applied_filter`
    query: FilterQuery,
    /// Bumped each time a different filter is applied
    filter_revision: u64,
    filtered: Option<Cached<FilteredView>>,
    statistics: Option<Cached<Statistics>>,
    top_talkers: usize,
    timestamps: TimestampFormatter,
    counts: RecomputeCounts,
}

impl DerivationPipeline {
    /// Create an empty pipeline
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            buffer: StreamBuffer::with_capacity(config.buffer_capacity),
            applied_filter: String::new(),
            query: FilterQuery::All,
            filter_revision: 0,
            filtered: None,
            statistics: None,
            top_talkers: config.top_talkers,
            timestamps: TimestampFormatter::new(config.format_cache_capacity),
            counts: RecomputeCounts::default(),
        }
    }

    /// Append a batch to the buffer
    ///
    /// Returns `None` (and invalidates nothing) for an empty batch.
    pub fn append(&mut self, batch: Vec<PacketSummary>) -> Option<AppendOutcome> {
        let outcome = self.buffer.append(batch)?;
        self.on_buffer_changed();
        Some(outcome)
    }

    /// Empty the buffer
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.on_buffer_changed();
    }

    fn on_buffer_changed(&mut self) {
        self.filtered = None;
        self.statistics = None;
    }

    /// Apply a settled filter text
    ///
    /// Only the filtered view depends on the filter. Returns false if the text
    /// parses to the query already applied (e.g. `tcp` then ` TCP `).
    pub fn on_filter_settled(&mut self, text: &str) -> bool {
        let query = FilterQuery::parse(text);
        if query == self.query {
            return false;
        }

        debug!("Applying filter {:?}", text);
        self.applied_filter = text.to_string();
        self.query = query;
        self.filter_revision += 1;
        self.filtered = None;
        true
    }

    /// Filtered view for the current buffer and applied filter
    pub fn filtered_view(&mut self) -> Arc<FilteredView> {
        let key = (self.buffer.generation(), self.filter_revision);
        if let Some(cached) = self.filtered.as_ref().filter(|c| c.key == key) {
            return Arc::clone(&cached.value);
        }

        let snapshot = self.buffer.snapshot();
        let query = &self.query;
        let records: Vec<Arc<PacketSummary>> = if query.is_all() {
            snapshot.iter().cloned().collect()
        } else {
            snapshot
                .iter()
                .filter(|r| query.matches(r))
                .cloned()
                .collect()
        };

        let view = Arc::new(FilteredView {
            records,
            filter: self.applied_filter.clone(),
            generation: snapshot.generation(),
        });
        self.counts.filtered += 1;
        debug!(
            "Filtered view recomputed: {} of {} packets match {:?}",
            view.len(),
            snapshot.len(),
            self.applied_filter
        );

        self.filtered = Some(Cached {
            key,
            value: Arc::clone(&view),
        });
        view
    }

    /// Statistics over the whole buffer (independent of the filter)
    pub fn statistics(&mut self) -> Arc<Statistics> {
        let key = (self.buffer.generation(), 0);
        if let Some(cached) = self.statistics.as_ref().filter(|c| c.key == key) {
            return Arc::clone(&cached.value);
        }

        let snapshot = self.buffer.snapshot();
        let value = Arc::new(stats::compute_shared(snapshot.iter(), self.top_talkers));
        self.counts.statistics += 1;

        self.statistics = Some(Cached {
            key,
            value: Arc::clone(&value),
        });
        value
    }

    /// Display rows for a range of the filtered view
    ///
    /// The range is clamped to the view.
    pub fn rows(&mut self, range: Range<usize>) -> Vec<PacketRow> {
        let view = self.filtered_view();
        let end = range.end.min(view.len());
        let start = range.start.min(end);

        view.records()[start..end]
            .iter()
            .map(|r| PacketRow {
                id: r.id,
                time: self.timestamps.format(r.timestamp),
                source: r.source_addr.clone(),
                destination: r.dest_addr.clone(),
                protocol: r.protocol.clone(),
                length: r.length,
                info: r.info.clone(),
            })
            .collect()
    }

    /// Snapshot of the buffer contents
    pub fn snapshot(&self) -> BufferSnapshot {
        self.buffer.snapshot()
    }

    /// Look up a retained packet by id
    pub fn packet(&self, id: u64) -> Option<Arc<PacketSummary>> {
        self.buffer.get(id).cloned()
    }

    /// The underlying buffer
    pub fn buffer(&self) -> &StreamBuffer {
        &self.buffer
    }

    /// Filter text currently applied
    pub fn applied_filter(&self) -> &str {
        &self.applied_filter
    }

    /// How many times each view was recomputed
    pub fn recompute_counts(&self) -> RecomputeCounts {
        self.counts
    }
}

impl Default for DerivationPipeline {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(id: u64, src: &str, protocol: &str) -> PacketSummary {
        PacketSummary::new(
            id,
            1_000_000_000 * id as i64,
            src,
            "10.0.0.254",
            protocol,
            64,
            format!("{} → 10.0.0.254", src),
        )
    }

    fn pipeline(capacity: usize) -> DerivationPipeline {
        DerivationPipeline::new(&SessionConfig {
            buffer_capacity: capacity,
            ..Default::default()
        })
    }

    #[test]
    fn test_statistics_three_packets() {
        let mut pipeline = pipeline(100);
        pipeline.append(vec![
            packet(1, "10.0.0.1", "TCP"),
            packet(2, "10.0.0.1", "UDP"),
            packet(3, "10.0.0.2", "TCP"),
        ]);

        let stats = pipeline.statistics();
        assert_eq!(stats.total_packets, 3);
        assert_eq!(stats.protocols[0].protocol, "TCP");
        assert_eq!(stats.protocols[0].count, 2);
        assert!((stats.protocols[0].percentage - 66.7).abs() < 0.05);
        assert_eq!(stats.protocols[1].protocol, "UDP");
        assert!((stats.protocols[1].percentage - 33.3).abs() < 0.05);
    }

    #[test]
    fn test_filtered_view_preserves_order() {
        let mut pipeline = pipeline(100);
        pipeline.append(vec![
            packet(1, "192.168.1.1", "TCP"),
            packet(2, "192.168.1.1", "TCP"),
            packet(3, "192.168.1.2", "TCP"),
        ]);
        pipeline.on_filter_settled("ip:192.168.1.1");

        assert_eq!(pipeline.filtered_view().ids(), vec![1, 2]);
    }

    #[test]
    fn test_views_are_cached_until_inputs_change() {
        let mut pipeline = pipeline(100);
        pipeline.append(vec![packet(1, "a", "TCP")]);

        let first = pipeline.filtered_view();
        let second = pipeline.filtered_view();
        assert!(Arc::ptr_eq(&first, &second));
        pipeline.statistics();
        pipeline.statistics();
        assert_eq!(
            pipeline.recompute_counts(),
            RecomputeCounts { filtered: 1, statistics: 1 }
        );

        pipeline.append(vec![packet(2, "b", "UDP")]);
        assert_eq!(pipeline.filtered_view().len(), 2);
        assert_eq!(pipeline.statistics().total_packets, 2);
        assert_eq!(
            pipeline.recompute_counts(),
            RecomputeCounts { filtered: 2, statistics: 2 }
        );
    }

    #[test]
    fn test_filter_change_leaves_statistics_cached() {
        let mut pipeline = pipeline(100);
        pipeline.append(vec![packet(1, "a", "TCP"), packet(2, "b", "UDP")]);
        pipeline.statistics();
        pipeline.filtered_view();

        assert!(pipeline.on_filter_settled("udp"));
        assert_eq!(pipeline.filtered_view().ids(), vec![2]);
        assert_eq!(pipeline.statistics().total_packets, 2);
        assert_eq!(
            pipeline.recompute_counts(),
            RecomputeCounts { filtered: 2, statistics: 1 }
        );
    }

    #[test]
    fn test_same_filter_is_noop() {
        let mut pipeline = pipeline(100);
        assert!(!pipeline.on_filter_settled(""));
        assert!(pipeline.on_filter_settled("tcp"));
        assert!(!pipeline.on_filter_settled("tcp"));
    }

    #[test]
    fn test_equivalent_filter_text_is_noop() {
        let mut pipeline = pipeline(100);
        pipeline.append(vec![packet(1, "a", "TCP"), packet(2, "b", "UDP")]);
        assert!(pipeline.on_filter_settled("tcp"));
        let view = pipeline.filtered_view();
        let counts = pipeline.recompute_counts();

        assert!(!pipeline.on_filter_settled(" TCP "));

        assert!(Arc::ptr_eq(&view, &pipeline.filtered_view()));
        assert_eq!(pipeline.recompute_counts(), counts);
        assert_eq!(pipeline.applied_filter(), "tcp");
    }

    #[test]
    fn test_match_all_filter_keeps_every_record() {
        let mut pipeline = pipeline(100);
        pipeline.append(vec![packet(1, "a", "TCP"), packet(2, "b", "UDP")]);
        pipeline.on_filter_settled("udp");
        assert_eq!(pipeline.filtered_view().ids(), vec![2]);

        assert!(pipeline.on_filter_settled("  "));
        assert_eq!(pipeline.filtered_view().ids(), vec![1, 2]);
    }

    #[test]
    fn test_empty_batch_keeps_views() {
        let mut pipeline = pipeline(100);
        pipeline.append(vec![packet(1, "a", "TCP")]);
        let before = pipeline.filtered_view();

        assert!(pipeline.append(Vec::new()).is_none());
        assert!(Arc::ptr_eq(&before, &pipeline.filtered_view()));
    }

    #[test]
    fn test_reset_clears_views() {
        let mut pipeline = pipeline(100);
        pipeline.append(vec![packet(1, "a", "TCP")]);
        let old = pipeline.filtered_view();

        pipeline.reset();

        assert!(pipeline.filtered_view().is_empty());
        assert_eq!(pipeline.statistics().total_packets, 0);
        // Views handed out earlier are unaffected
        assert_eq!(old.len(), 1);
    }

    #[test]
    fn test_views_track_eviction() {
        let mut pipeline = pipeline(2);
        pipeline.append(vec![packet(1, "a", "TCP"), packet(2, "a", "TCP")]);
        pipeline.append(vec![packet(3, "a", "TCP")]);

        assert_eq!(pipeline.filtered_view().ids(), vec![2, 3]);
        assert_eq!(pipeline.statistics().total_packets, 2);
        assert!(pipeline.packet(1).is_none());
        assert!(pipeline.packet(3).is_some());
    }

    #[test]
    fn test_rows_are_formatted_and_clamped() {
        let mut pipeline = pipeline(100);
        pipeline.append(vec![packet(1, "a", "TCP"), packet(2, "b", "UDP")]);

        let rows = pipeline.rows(1..10);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 2);
        assert_eq!(rows[0].time, "00:00:02.000");
        assert!(pipeline.rows(5..10).is_empty());
    }
}
