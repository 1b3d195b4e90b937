//! AuraCap record model
//!
//! This crate holds the packet record types exchanged between the capture
//! engine and the live view, plus the small formatting helpers the view
//! recomputes on every frame:
//!
//! - **Records**: [`PacketSummary`] for the packet list, [`PacketDetail`] and
//!   [`ProtocolLayer`] for the protocol tree and hex view of one selection
//! - **Caching**: [`FormatCache`], a bounded FIFO memoization cache for pure
//!   formatting functions
//! - **Formatting**: total timestamp, hex and ASCII renderers that return a
//!   fixed sentinel for invalid input instead of failing
//!
//! # Example
//!
//! ```rust
//! use aura_model::{hex_dump, TimestampFormatter};
//!
//! let mut timestamps = TimestampFormatter::new(1024);
//! assert_eq!(timestamps.format(0), "??:??:??.???");
//! assert_eq!(timestamps.format(3_723_004_000_000), "01:02:03.004");
//!
//! let rows = hex_dump(b"GET / HTTP/1.1\r\n");
//! assert_eq!(rows[0].offset, "0000");
//! assert_eq!(rows[0].ascii, "GET / HTTP/1.1..");
//! ```

pub mod cache;
pub mod format;
pub mod record;

pub use cache::{FormatCache, FORMAT_CACHE_MAX_SIZE};
pub use format::{
    ascii_byte, format_timestamp, hex_byte, hex_dump, HexRow, TimestampFormatter,
    ASCII_SENTINEL, HEX_ROW_WIDTH, HEX_SENTINEL, TIMESTAMP_SENTINEL,
};
pub use record::{FieldRow, PacketDetail, PacketSummary, ProtocolLayer};
