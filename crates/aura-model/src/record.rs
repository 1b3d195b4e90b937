//! Packet records produced by the capture engine

/// Summary of one captured packet, as shown in the packet list
///
/// Produced by the capture engine and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PacketSummary {
    /// Monotonic, unique id assigned by the producer
    pub id: u64,
    /// Unix timestamp in nanoseconds (0 or negative when unknown)
    pub timestamp: i64,
    /// Source address as rendered by the producer
    pub source_addr: String,
    /// Destination address as rendered by the producer
    pub dest_addr: String,
    /// Short uppercase protocol tag (e.g. "TCP")
    pub protocol: String,
    /// Captured length in bytes
    pub length: u32,
    /// Free-text summary
    pub info: String,
}

impl PacketSummary {
    /// Create a summary record
    pub fn new(
        id: u64,
        timestamp: i64,
        source_addr: impl Into<String>,
        dest_addr: impl Into<String>,
        protocol: impl Into<String>,
        length: u32,
        info: impl Into<String>,
    ) -> Self {
        Self {
            id,
            timestamp,
            source_addr: source_addr.into(),
            dest_addr: dest_addr.into(),
            protocol: protocol.into(),
            length,
            info: info.into(),
        }
    }
}

/// One decoded protocol layer of a packet
///
/// Field order is the decoder's order and is kept as-is for display.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProtocolLayer {
    /// Layer name (e.g. "Ethernet II", "Internet Protocol Version 4")
    pub name: String,
    /// (field name, field value) pairs in decoder order
    pub fields: Vec<(String, String)>,
}

impl ProtocolLayer {
    /// Create an empty layer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field, keeping insertion order
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// Full decode of a single selected packet
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PacketDetail {
    /// Summary of the packet
    pub summary: PacketSummary,
    /// Protocol layers, outermost first
    pub layers: Vec<ProtocolLayer>,
    /// Raw captured bytes (for the hex view)
    pub raw_bytes: Vec<u8>,
}

/// A flattened protocol tree row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRow<'a> {
    /// Index of the layer, outermost is 0
    pub depth: usize,
    /// Layer name
    pub layer: &'a str,
    /// Field name
    pub name: &'a str,
    /// Field value
    pub value: &'a str,
}

impl PacketDetail {
    /// Id of the packet
    pub fn id(&self) -> u64 {
        self.summary.id
    }

    /// Flatten the protocol tree into rows, outer layers first, fields in order
    pub fn field_rows(&self) -> impl Iterator<Item = FieldRow<'_>> {
        self.layers.iter().enumerate().flat_map(|(depth, layer)| {
            layer.fields.iter().map(move |(name, value)| FieldRow {
                depth,
                layer: layer.name.as_str(),
                name: name.as_str(),
                value: value.as_str(),
            })
        })
    }
}
