//! Session event stream
//!
//! Everything the session wants the outside world to know, whether it is a
//! view change for the presentation layer or a request for the capture
//! engine, goes out through a single event channel in processing order.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::selection::DetailRequest;

/// Why the derived views changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeCause {
    /// A batch was appended to the buffer
    Appended {
        /// Records added
        appended: usize,
        /// Records evicted to stay within capacity
        evicted: usize,
    },
    /// The buffer was emptied
    Reset,
    /// A new filter settled and was applied
    FilterApplied {
        /// The applied filter text
        text: String,
    },
}

/// Requests for the capture engine
///
/// The session does not implement any of these, it only forwards them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendRequest {
    /// Fetch the full detail of a packet
    FetchDetail(DetailRequest),
    /// Enumerate capture interfaces
    ListInterfaces,
    /// Start capturing on an interface
    StartCapture {
        /// Interface name
        interface: String,
    },
    /// Stop the running capture
    StopCapture,
    /// Write the given packets to a PCAP file
    ExportPcap {
        /// Destination file
        path: PathBuf,
        /// Packet ids, in view order
        ids: Vec<u64>,
    },
}

/// Events emitted by the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// The derived views are out of date and will be recomputed on next read
    ViewsChanged {
        /// What changed
        cause: ChangeCause,
        /// Buffer generation after the change
        generation: u64,
    },

    /// The displayed detail changed (`None` when cleared)
    DetailChanged {
        /// Packet id of the displayed detail
        id: Option<u64>,
    },

    /// A request for the capture engine
    Backend(BackendRequest),

    /// A user-visible error
    Error {
        /// Source of the error
        source: String,
        /// Error message
        message: String,
    },
}

impl SessionEvent {
    /// Check if this event changed the derived views
    pub fn is_view_change(&self) -> bool {
        matches!(self, SessionEvent::ViewsChanged { .. })
    }

    /// Check if this is a capture engine request
    pub fn is_backend(&self) -> bool {
        matches!(self, SessionEvent::Backend(_))
    }

    /// The filter text applied by this event, if any
    pub fn applied_filter(&self) -> Option<&str> {
        match self {
            SessionEvent::ViewsChanged {
                cause: ChangeCause::FilterApplied { text },
                ..
            } => Some(text),
            _ => None,
        }
    }
}
