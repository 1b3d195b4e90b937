//! Display formatting for packet timestamps and raw bytes
//!
//! All formatters are total: invalid input renders as a fixed sentinel so a
//! single bad record never breaks the surrounding table or hex grid.

use crate::cache::{FormatCache, FORMAT_CACHE_MAX_SIZE};

/// Rendered in place of a timestamp that is zero, negative or unrepresentable
pub const TIMESTAMP_SENTINEL: &str = "??:??:??.???";

/// Rendered in place of a hex cell whose value is not a byte
pub const HEX_SENTINEL: &str = "00";

/// Rendered in place of a non-printable or invalid ASCII cell
pub const ASCII_SENTINEL: char = '.';

/// Bytes per hex dump row
pub const HEX_ROW_WIDTH: usize = 16;

const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SEC: i64 = 1_000_000_000;
const SECS_PER_DAY: i64 = 86_400;

/// Format a nanosecond Unix timestamp as a UTC time of day (`HH:MM:SS.mmm`)
///
/// Returns [`TIMESTAMP_SENTINEL`] for timestamps at or before the epoch.
pub fn format_timestamp(timestamp_ns: i64) -> String {
    if timestamp_ns <= 0 {
        return TIMESTAMP_SENTINEL.to_string();
    }

    let total_secs = timestamp_ns / NANOS_PER_SEC;
    let millis = (timestamp_ns % NANOS_PER_SEC) / NANOS_PER_MILLI;
    let secs = total_secs % SECS_PER_DAY;
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
}

/// Timestamp formatter with its own bounded cache
///
/// The packet list re-renders the same visible rows many times per second;
/// each session owns one of these so repeated rows cost a hash lookup.
#[derive(Debug, Clone)]
pub struct TimestampFormatter {
    cache: FormatCache<i64, String>,
}

impl TimestampFormatter {
    /// Create a formatter whose cache holds at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: FormatCache::new(capacity),
        }
    }

    /// Format a timestamp, using the cache when possible
    pub fn format(&mut self, timestamp_ns: i64) -> String {
        self.cache
            .get_or_compute(timestamp_ns, |ts| format_timestamp(*ts))
    }

    /// Number of cached timestamps
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Drop all cached timestamps
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl Default for TimestampFormatter {
    fn default() -> Self {
        Self::new(FORMAT_CACHE_MAX_SIZE)
    }
}

/// Two-digit uppercase hex for every byte value, built at compile time
static HEX_TABLE: [[u8; 2]; 256] = {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut table = [[0u8; 2]; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = [DIGITS[i >> 4], DIGITS[i & 0x0F]];
        i += 1;
    }
    table
};

/// Render one hex grid cell
///
/// Values outside `0..=255` render as [`HEX_SENTINEL`].
pub fn hex_byte(value: i32) -> &'static str {
    match u8::try_from(value) {
        // Table entries are ASCII hex digits
        Ok(byte) => std::str::from_utf8(&HEX_TABLE[byte as usize]).unwrap_or(HEX_SENTINEL),
        Err(_) => HEX_SENTINEL,
    }
}

/// Render one ASCII column cell
///
/// Printable ASCII (0x20..=0x7E) renders as itself, everything else
/// (including values outside `0..=255`) as [`ASCII_SENTINEL`].
pub fn ascii_byte(value: i32) -> char {
    match u8::try_from(value) {
        Ok(byte @ 0x20..=0x7E) => byte as char,
        _ => ASCII_SENTINEL,
    }
}

/// One row of the hex view
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HexRow {
    /// Offset of the first byte, as four or more hex digits
    pub offset: String,
    /// Hex cells, one per byte
    pub hex: Vec<&'static str>,
    /// ASCII rendering of the row
    pub ascii: String,
}

impl HexRow {
    /// Hex cells joined with single spaces
    pub fn hex_line(&self) -> String {
        self.hex.join(" ")
    }
}

/// Split raw bytes into hex view rows of [`HEX_ROW_WIDTH`] bytes
pub fn hex_dump(bytes: &[u8]) -> Vec<HexRow> {
    bytes
        .chunks(HEX_ROW_WIDTH)
        .enumerate()
        .map(|(row, chunk)| HexRow {
            offset: format!("{:04x}", row * HEX_ROW_WIDTH),
            hex: chunk.iter().map(|&b| hex_byte(i32::from(b))).collect(),
            ascii: chunk.iter().map(|&b| ascii_byte(i32::from(b))).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_time_of_day() {
        // 2024-01-01T12:34:56.789Z
        let ts = 1_704_112_496_789_000_000;
        assert_eq!(format_timestamp(ts), "12:34:56.789");
    }

    #[test]
    fn test_timestamp_sentinel() {
        assert_eq!(format_timestamp(0), TIMESTAMP_SENTINEL);
        assert_eq!(format_timestamp(-5), TIMESTAMP_SENTINEL);
        assert_eq!(format_timestamp(i64::MIN), TIMESTAMP_SENTINEL);
    }

    #[test]
    fn test_timestamp_max_is_total() {
        let rendered = format_timestamp(i64::MAX);
        assert_eq!(rendered.len(), TIMESTAMP_SENTINEL.len());
    }

    #[test]
    fn test_formatter_caches() {
        let mut formatter = TimestampFormatter::new(2);
        assert_eq!(formatter.format(1_000_000_000), "00:00:01.000");
        assert_eq!(formatter.format(1_000_000_000), "00:00:01.000");
        assert_eq!(formatter.cached(), 1);

        formatter.format(2_000_000_000);
        formatter.format(3_000_000_000);
        assert_eq!(formatter.cached(), 2);

        formatter.clear();
        assert_eq!(formatter.cached(), 0);
    }

    #[test]
    fn test_hex_byte() {
        assert_eq!(hex_byte(0), "00");
        assert_eq!(hex_byte(0x0A), "0A");
        assert_eq!(hex_byte(255), "FF");
        assert_eq!(hex_byte(256), HEX_SENTINEL);
        assert_eq!(hex_byte(-1), HEX_SENTINEL);
    }

    #[test]
    fn test_ascii_byte() {
        assert_eq!(ascii_byte(b'A' as i32), 'A');
        assert_eq!(ascii_byte(b' ' as i32), ' ');
        assert_eq!(ascii_byte(0x7F), ASCII_SENTINEL);
        assert_eq!(ascii_byte(0x00), ASCII_SENTINEL);
        assert_eq!(ascii_byte(300), ASCII_SENTINEL);
        assert_eq!(ascii_byte(-20), ASCII_SENTINEL);
    }

    #[test]
    fn test_hex_dump_rows() {
        let bytes: Vec<u8> = (0u8..20).collect();
        let rows = hex_dump(&bytes);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].offset, "0000");
        assert_eq!(rows[0].hex.len(), HEX_ROW_WIDTH);
        assert_eq!(rows[1].offset, "0010");
        assert_eq!(rows[1].hex_line(), "10 11 12 13");
        assert_eq!(rows[1].ascii, "....");
    }

    #[test]
    fn test_hex_dump_empty() {
        assert!(hex_dump(&[]).is_empty());
    }
}
