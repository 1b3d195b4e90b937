//! Capture statistics
//!
//! Statistics are recomputed from scratch over the whole buffer on every
//! change. The buffer is bounded, so a full pass stays cheap and there is no
//! incremental state to drift out of sync.

use std::collections::HashMap;
use std::sync::Arc;

use aura_model::PacketSummary;
use serde::{Deserialize, Serialize};

/// Default number of entries in each top talker list
pub const TOP_TALKERS: usize = 10;

/// Packet count and volume for one protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolShare {
    /// Protocol tag, exactly as reported
    pub protocol: String,
    /// Packets with this protocol
    pub count: usize,
    /// Share of all packets, 0-100
    pub percentage: f64,
    /// Bytes carried by this protocol
    pub total_bytes: u64,
}

/// Packet count for one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Talker {
    /// Address, exactly as reported
    pub addr: String,
    /// Packets seen with this address
    pub count: usize,
}

/// Aggregate statistics over a set of packets
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    /// Number of packets
    pub total_packets: usize,
    /// Sum of packet lengths
    pub total_bytes: u64,
    /// Mean packet length (0 when there are no packets)
    pub average_packet_size: f64,
    /// Protocol distribution, most frequent first
    pub protocols: Vec<ProtocolShare>,
    /// Most frequent source addresses
    pub top_sources: Vec<Talker>,
    /// Most frequent destination addresses
    pub top_destinations: Vec<Talker>,
}

/// Counts grouped by key, remembering first-seen order for tie breaks
struct Tally<'a, T> {
    index: HashMap<&'a str, usize>,
    groups: Vec<(&'a str, T)>,
}

impl<'a, T: Default> Tally<'a, T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn entry(&mut self, key: &'a str) -> &mut T {
        let groups = &mut self.groups;
        let slot = *self.index.entry(key).or_insert_with(|| {
            groups.push((key, T::default()));
            groups.len() - 1
        });
        &mut self.groups[slot].1
    }
}

/// Compute statistics over `records`
///
/// Equal counts keep the order in which the key was first seen, so the same
/// input sequence always produces the same lists.
pub fn compute<'a, I>(records: I, top_n: usize) -> Statistics
where
    I: IntoIterator<Item = &'a PacketSummary>,
{
    let mut total_packets = 0usize;
    let mut total_bytes = 0u64;
    let mut protocols: Tally<'a, (usize, u64)> = Tally::new();
    let mut sources: Tally<'a, usize> = Tally::new();
    let mut destinations: Tally<'a, usize> = Tally::new();

    for record in records {
        total_packets += 1;
        total_bytes += u64::from(record.length);

        let proto = protocols.entry(&record.protocol);
        proto.0 += 1;
        proto.1 += u64::from(record.length);

        *sources.entry(&record.source_addr) += 1;
        *destinations.entry(&record.dest_addr) += 1;
    }

    if total_packets == 0 {
        return Statistics::default();
    }

    let mut protocols: Vec<ProtocolShare> = protocols
        .groups
        .into_iter()
        .map(|(protocol, (count, bytes))| ProtocolShare {
            protocol: protocol.to_string(),
            count,
            percentage: 100.0 * count as f64 / total_packets as f64,
            total_bytes: bytes,
        })
        .collect();
    // Stable sort keeps first-seen order among equal counts
    protocols.sort_by(|a, b| b.count.cmp(&a.count));

    Statistics {
        total_packets,
        total_bytes,
        average_packet_size: total_bytes as f64 / total_packets as f64,
        protocols,
        top_sources: top_talkers(sources, top_n),
        top_destinations: top_talkers(destinations, top_n),
    }
}

/// Compute statistics over shared records, as held by the buffer
pub fn compute_shared<'a, I>(records: I, top_n: usize) -> Statistics
where
    I: IntoIterator<Item = &'a Arc<PacketSummary>>,
{
    compute(records.into_iter().map(|r| r.as_ref()), top_n)
}

fn top_talkers(tally: Tally<'_, usize>, top_n: usize) -> Vec<Talker> {
    let mut talkers: Vec<Talker> = tally
        .groups
        .into_iter()
        .map(|(addr, count)| Talker {
            addr: addr.to_string(),
            count,
        })
        .collect();
    talkers.sort_by(|a, b| b.count.cmp(&a.count));
    talkers.truncate(top_n);
    talkers
}
