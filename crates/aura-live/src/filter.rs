//! Packet list filter language
//!
//! A query is either empty (match everything), one `prefix:value` term, or
//! free text searched across the visible columns:
//!
//! | Query            | Matches when                                          |
//! |------------------|-------------------------------------------------------|
//! | `protocol:<v>`   | protocol contains `v`                                 |
//! | `ip:<v>`         | source or destination address contains `v` (raw text) |
//! | `port:<v>`       | info column contains `v`                              |
//! | `src:<v>`        | source address contains `v`                           |
//! | `dst:<v>`        | destination address contains `v`                      |
//! | anything else    | any of protocol, addresses, info or length contains it |
//!
//! The whole query is trimmed and lowercased before parsing, and a prefix with
//! nothing after it matches no packet.

use aura_model::PacketSummary;

/// A parsed filter query
///
/// Parse once per recomputation, then call [`FilterQuery::matches`] per
/// record. Matching has no side effects, so records can be checked in any
/// order or in parallel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterQuery {
    /// Empty query, matches every packet
    #[default]
    All,
    /// A prefix with an empty value, matches no packet
    Nothing,
    /// `protocol:` term
    Protocol(String),
    /// `ip:` term, matched against the raw (not lowercased) addresses
    Ip(String),
    /// `port:` term, matched against the raw info column
    Port(String),
    /// `src:` term
    Source(String),
    /// `dst:` term
    Destination(String),
    /// Free-text search across protocol, addresses, info and length
    General(String),
}

type TermBuilder = fn(String) -> FilterQuery;

/// Recognised prefixes, in the order they are tried
const PREFIXES: &[(&str, TermBuilder)] = &[
    ("protocol:", FilterQuery::Protocol),
    ("ip:", FilterQuery::Ip),
    ("port:", FilterQuery::Port),
    ("src:", FilterQuery::Source),
    ("dst:", FilterQuery::Destination),
];

impl FilterQuery {
    /// Parse filter text
    pub fn parse(text: &str) -> Self {
        let query = text.trim().to_lowercase();

        if query.is_empty() {
            return FilterQuery::All;
        }

        for (prefix, build) in PREFIXES {
            // Strip only the leading token, the value may itself contain ':'
            if let Some(value) = query.strip_prefix(prefix) {
                if value.is_empty() {
                    return FilterQuery::Nothing;
                }
                return build(value.to_string());
            }
        }

        FilterQuery::General(query)
    }

    /// Whether this query matches everything
    pub fn is_all(&self) -> bool {
        matches!(self, FilterQuery::All)
    }

    /// Check a record against the query
    pub fn matches(&self, record: &PacketSummary) -> bool {
        match self {
            FilterQuery::All => true,
            FilterQuery::Nothing => false,
            FilterQuery::Protocol(v) => record.protocol.to_lowercase().contains(v.as_str()),
            FilterQuery::Ip(v) => {
                record.source_addr.contains(v.as_str()) || record.dest_addr.contains(v.as_str())
            }
            FilterQuery::Port(v) => record.info.contains(v.as_str()),
            FilterQuery::Source(v) => record.source_addr.to_lowercase().contains(v.as_str()),
            FilterQuery::Destination(v) => record.dest_addr.to_lowercase().contains(v.as_str()),
            FilterQuery::General(q) => {
                let q = q.as_str();
                // Length is searchable by its decimal form, the timestamp is not
                record.protocol.to_lowercase().contains(q)
                    || record.source_addr.to_lowercase().contains(q)
                    || record.dest_addr.to_lowercase().contains(q)
                    || record.info.to_lowercase().contains(q)
                    || record.length.to_string().contains(q)
            }
        }
    }
}

/// Check one record against filter text
pub fn evaluate(record: &PacketSummary, query: &str) -> bool {
    FilterQuery::parse(query).matches(record)
}
