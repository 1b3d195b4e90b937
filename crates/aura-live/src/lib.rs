//! AuraCap live-data layer
//!
//! This crate turns the stream of packet summaries pushed by the capture
//! engine into the views the packet inspector displays.
//!
//! # Architecture
//!
//! - [`StreamBuffer`] holds the most recent packets (50 000 by default) and
//!   drops the oldest first when a batch would overflow it
//! - [`FilterQuery`] parses the filter box language and matches records
//! - [`stats::compute`] aggregates totals, protocol shares and top talkers
//! - [`DerivationPipeline`] derives the filtered view and the statistics from
//!   the buffer, recomputing each only after one of its inputs changed
//! - [`FilterDebouncer`] holds filter edits back until typing pauses
//! - [`DetailSelection`] tracks the selected packet and drops detail
//!   responses that arrive after the selection moved on
//! - [`run_session`] ties it all together as a single async actor driven by
//!   [`SessionCommand`]s and emitting [`SessionEvent`]s
//!
//! Data flows one way: capture engine → buffer → derived views → reader.
//! Views are never edited in place, only recomputed.

pub mod buffer;
pub mod config;
pub mod debounce;
pub mod error;
pub mod events;
pub mod filter;
pub mod ingest;
pub mod pipeline;
pub mod selection;
pub mod session;
pub mod stats;

pub use buffer::{AppendOutcome, BufferSnapshot, StreamBuffer, MAX_BUFFERED_PACKETS};
pub use config::SessionConfig;
pub use debounce::{FilterDebouncer, FILTER_SETTLE_MS};
pub use error::LiveError;
pub use events::{BackendRequest, ChangeCause, SessionEvent};
pub use filter::{evaluate, FilterQuery};
pub use ingest::BatchCoalescer;
pub use pipeline::{DerivationPipeline, FilteredView, PacketRow, RecomputeCounts};
pub use selection::{DetailRequest, DetailSelection};
pub use session::{run_session, spawn_session, DerivedViews, SessionCommand, SessionHandle};
pub use stats::{ProtocolShare, Statistics, Talker};
