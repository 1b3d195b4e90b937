//! Selected packet and its lazily fetched detail
//!
//! Detail records are fetched from the capture engine one at a time. A
//! response is only applied if nothing else was selected after its request
//! went out, so a slow response can never replace a newer selection.

use std::sync::Arc;

use aura_model::PacketDetail;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LiveError;

/// An outstanding detail fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetailRequest {
    /// Requested packet id
    pub id: u64,
    /// Selection counter at the time of the request
    pub token: u64,
}

/// Current selection state
#[derive(Debug, Default)]
pub struct DetailSelection {
    /// Selected packet id
    selected: Option<u64>,
    /// Token of the latest request
    token: u64,
    /// Detail for the selected packet, once resolved
    detail: Option<Arc<PacketDetail>>,
}

impl DetailSelection {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the selection
    ///
    /// Clears the displayed detail and returns the request to send for the new
    /// selection, if any. Every call invalidates earlier requests, even when
    /// the same id is selected again.
    pub fn select(&mut self, id: Option<u64>) -> Option<DetailRequest> {
        self.token += 1;
        self.selected = id;
        self.detail = None;
        id.map(|id| DetailRequest {
            id,
            token: self.token,
        })
    }

    /// Apply a response from the capture engine
    ///
    /// Returns the detail now displayed. A stale response or a failed fetch
    /// leaves the displayed state unchanged.
    pub fn resolve(
        &mut self,
        request: DetailRequest,
        result: Result<PacketDetail, String>,
    ) -> Result<Arc<PacketDetail>, LiveError> {
        if request.token != self.token || self.selected != Some(request.id) {
            debug!(
                "Dropping stale detail response for packet {} (token {}, current {})",
                request.id, request.token, self.token
            );
            return Err(LiveError::StaleDetail { id: request.id });
        }

        match result {
            Ok(detail) => {
                let detail = Arc::new(detail);
                self.detail = Some(Arc::clone(&detail));
                Ok(detail)
            }
            Err(message) => {
                warn!("Failed to fetch detail for packet {}: {}", request.id, message);
                Err(LiveError::DetailFetch {
                    id: request.id,
                    message,
                })
            }
        }
    }

    /// Clear selection and detail (e.g. when the buffer is reset)
    pub fn clear(&mut self) {
        self.select(None);
    }

    /// Selected packet id
    pub fn selected(&self) -> Option<u64> {
        self.selected
    }

    /// Detail of the selected packet, if resolved
    pub fn detail(&self) -> Option<Arc<PacketDetail>> {
        self.detail.clone()
    }
}
