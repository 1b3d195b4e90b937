//! Live session actor
//!
//! This module runs the live-data layer as a single async task. The capture
//! engine and the presentation layer talk to it only through channels, so
//! every command is applied to completion before the next one is looked at
//! and readers never see a half-applied batch.
//!
//! # Architecture
//!
//! The actor receives [`SessionCommand`]s through one channel and emits
//! [`SessionEvent`]s through another. Between commands it waits on the
//! filter debounce deadline, which is the only timer it owns.
//!
//! # Example
//!
//! ```rust,no_run
//! use aura_live::{spawn_session, SessionConfig};
//! use aura_model::PacketSummary;
//!
//! # async fn demo() -> Result<(), aura_live::LiveError> {
//! let (session, mut events, task) = spawn_session(SessionConfig::default());
//!
//! session
//!     .append(vec![PacketSummary::new(1, 0, "10.0.0.1", "10.0.0.2", "TCP", 60, "")])
//!     .await?;
//! session.edit_filter("protocol:tcp").await?;
//!
//! let views = session.views().await?;
//! println!("{} packets, {} match", views.statistics.total_packets, views.filtered.len());
//!
//! session.shutdown().await?;
//! task.await.ok();
//! # Ok(())
//! # }
//! ```

use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;

use aura_model::{PacketDetail, PacketSummary};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::debounce::FilterDebouncer;
use crate::error::LiveError;
use crate::events::{BackendRequest, ChangeCause, SessionEvent};
use crate::pipeline::{DerivationPipeline, FilteredView, PacketRow, RecomputeCounts};
use crate::selection::{DetailRequest, DetailSelection};
use crate::stats::Statistics;

/// Current derived views, as handed to readers
#[derive(Debug, Clone)]
pub struct DerivedViews {
    /// Packets matching the applied filter
    pub filtered: Arc<FilteredView>,
    /// Statistics over the whole buffer
    pub statistics: Arc<Statistics>,
    /// Filter text the filtered view was computed with
    pub applied_filter: String,
    /// Edited filter text still waiting to settle
    pub pending_filter: Option<String>,
    /// Packets currently buffered
    pub buffered: usize,
    /// Recomputations so far
    pub recomputes: RecomputeCounts,
}

/// Commands sent to the session actor
#[derive(Debug)]
pub enum SessionCommand {
    /// Append a batch delivered by the capture engine
    AppendBatch {
        /// Records in arrival order
        records: Vec<PacketSummary>,
    },

    /// Clear the buffer and the selection
    Reset,

    /// The user edited the filter text (debounced before it is applied)
    EditFilter {
        /// Current text of the filter box
        text: String,
    },

    /// Change the selected packet
    Select {
        /// Packet id, or `None` to deselect
        id: Option<u64>,
    },

    /// Response to a [`BackendRequest::FetchDetail`]
    DetailResolved {
        /// The request being answered
        request: DetailRequest,
        /// Detail or engine error message
        result: Result<PacketDetail, String>,
    },

    /// Read the current views
    QueryViews {
        /// Channel to send the views back
        response: oneshot::Sender<DerivedViews>,
    },

    /// Read formatted rows of the filtered view
    QueryRows {
        /// Row range within the filtered view
        range: Range<usize>,
        /// Channel to send the rows back
        response: oneshot::Sender<Vec<PacketRow>>,
    },

    /// Read the displayed detail
    QueryDetail {
        /// Channel to send the detail back (or None if nothing is displayed)
        response: oneshot::Sender<Option<Arc<PacketDetail>>>,
    },

    /// Start a new capture (clears the buffer first)
    StartCapture {
        /// Interface name
        interface: String,
    },

    /// Stop the running capture
    StopCapture,

    /// Ask the engine for its capture interfaces
    ListInterfaces,

    /// Export the packets of the filtered view
    ExportFiltered {
        /// Destination file
        path: PathBuf,
    },

    /// Shutdown the actor
    Shutdown,
}

/// Internal state for the session actor
struct SessionState {
    pipeline: DerivationPipeline,
    debouncer: FilterDebouncer,
    selection: DetailSelection,
    /// A capture was started and not stopped since
    capturing: bool,
}

impl SessionState {
    fn new(config: &SessionConfig) -> Self {
        Self {
            pipeline: DerivationPipeline::new(config),
            debouncer: FilterDebouncer::new(config.filter_debounce()),
            selection: DetailSelection::new(),
            capturing: false,
        }
    }

    fn views(&mut self) -> DerivedViews {
        DerivedViews {
            filtered: self.pipeline.filtered_view(),
            statistics: self.pipeline.statistics(),
            applied_filter: self.pipeline.applied_filter().to_string(),
            pending_filter: self.debouncer.pending().map(str::to_string),
            buffered: self.pipeline.buffer().len(),
            recomputes: self.pipeline.recompute_counts(),
        }
    }

    fn generation(&self) -> u64 {
        self.pipeline.buffer().generation()
    }
}

/// Clear the buffer and selection, emitting the resulting events
async fn reset_buffer(state: &mut SessionState, event_tx: &mpsc::Sender<SessionEvent>) {
    let had_selection = state.selection.selected().is_some();
    state.pipeline.reset();
    state.selection.clear();

    let _ = event_tx
        .send(SessionEvent::ViewsChanged {
            cause: ChangeCause::Reset,
            generation: state.generation(),
        })
        .await;

    if had_selection {
        let _ = event_tx.send(SessionEvent::DetailChanged { id: None }).await;
    }
}

/// Apply a settled filter edit
async fn apply_settled_filter(
    state: &mut SessionState,
    event_tx: &mpsc::Sender<SessionEvent>,
    text: String,
) {
    if !state.pipeline.on_filter_settled(&text) {
        debug!("Filter {:?} settled but is already applied", text);
        return;
    }

    let _ = event_tx
        .send(SessionEvent::ViewsChanged {
            cause: ChangeCause::FilterApplied { text },
            generation: state.generation(),
        })
        .await;
}

/// Process one command, returning false when the actor should stop
async fn handle_command(
    state: &mut SessionState,
    event_tx: &mpsc::Sender<SessionEvent>,
    cmd: SessionCommand,
) -> bool {
    match cmd {
        SessionCommand::AppendBatch { records } => {
            let Some(outcome) = state.pipeline.append(records) else {
                return true;
            };

            let _ = event_tx
                .send(SessionEvent::ViewsChanged {
                    cause: ChangeCause::Appended {
                        appended: outcome.appended,
                        evicted: outcome.evicted,
                    },
                    generation: state.generation(),
                })
                .await;
        }

        SessionCommand::Reset => {
            reset_buffer(state, event_tx).await;
            info!("Buffer cleared");
        }

        SessionCommand::EditFilter { text } => {
            state.debouncer.edit(text, Instant::now());
        }

        SessionCommand::Select { id } => {
            let previous = state.selection.selected();
            let request = state.selection.select(id);

            if previous.is_some() {
                let _ = event_tx.send(SessionEvent::DetailChanged { id: None }).await;
            }

            if let Some(request) = request {
                if state.pipeline.packet(request.id).is_none() {
                    debug!("Selected packet {} is not in the buffer", request.id);
                }
                let _ = event_tx
                    .send(SessionEvent::Backend(BackendRequest::FetchDetail(request)))
                    .await;
            }
        }

        SessionCommand::DetailResolved { request, result } => {
            if state.selection.resolve(request, result).is_ok() {
                let _ = event_tx
                    .send(SessionEvent::DetailChanged {
                        id: Some(request.id),
                    })
                    .await;
            }
        }

        SessionCommand::QueryViews { response } => {
            let _ = response.send(state.views());
        }

        SessionCommand::QueryRows { range, response } => {
            let _ = response.send(state.pipeline.rows(range));
        }

        SessionCommand::QueryDetail { response } => {
            let _ = response.send(state.selection.detail());
        }

        SessionCommand::StartCapture { interface } => {
            if state.capturing {
                warn!("Capture on {} rejected, a capture is already running", interface);
                let _ = event_tx
                    .send(SessionEvent::Error {
                        source: "Capture".to_string(),
                        message: "Capture already in progress".to_string(),
                    })
                    .await;
                return true;
            }

            // A new capture starts from an empty buffer
            reset_buffer(state, event_tx).await;
            state.capturing = true;
            info!("Starting capture on {}", interface);
            let _ = event_tx
                .send(SessionEvent::Backend(BackendRequest::StartCapture {
                    interface,
                }))
                .await;
        }

        SessionCommand::StopCapture => {
            if !state.capturing {
                debug!("Stop requested with no capture running");
                return true;
            }

            state.capturing = false;
            info!("Stopping capture");
            let _ = event_tx
                .send(SessionEvent::Backend(BackendRequest::StopCapture))
                .await;
        }

        SessionCommand::ListInterfaces => {
            let _ = event_tx
                .send(SessionEvent::Backend(BackendRequest::ListInterfaces))
                .await;
        }

        SessionCommand::ExportFiltered { path } => {
            let ids = state.pipeline.filtered_view().ids();
            if ids.is_empty() {
                warn!("Export to {} skipped, no packets to export", path.display());
                let _ = event_tx
                    .send(SessionEvent::Error {
                        source: "Export".to_string(),
                        message: "No packets to export".to_string(),
                    })
                    .await;
            } else {
                info!("Exporting {} packets to {}", ids.len(), path.display());
                let _ = event_tx
                    .send(SessionEvent::Backend(BackendRequest::ExportPcap { path, ids }))
                    .await;
            }
        }

        SessionCommand::Shutdown => {
            info!("Live session shutting down");
            return false;
        }
    }

    true
}

/// Run the session actor
///
/// Processes commands until [`SessionCommand::Shutdown`] is received or every
/// sender is dropped. A filter edit still waiting to settle at that point is
/// discarded.
///
/// # Arguments
///
/// * `config` - Session tunables
/// * `cmd_rx` - Receiver for commands sent to the actor
/// * `event_tx` - Sender for events emitted by the actor
pub async fn run_session(
    config: SessionConfig,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: mpsc::Sender<SessionEvent>,
) {
    let mut state = SessionState::new(&config);
    info!(
        "Live session started (capacity {}, filter settle {}ms)",
        config.buffer_capacity, config.filter_debounce_ms
    );

    loop {
        let deadline = state.debouncer.deadline();

        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break; };
                if !handle_command(&mut state, &event_tx, cmd).await {
                    break;
                }
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some(text) = state.debouncer.take_settled(Instant::now()) {
                    apply_settled_filter(&mut state, &event_tx, text).await;
                }
            }
        }
    }

    if state.debouncer.cancel() {
        debug!("Discarded unsettled filter edit on shutdown");
    }
    info!("Live session stopped");
}

/// Cloneable handle for talking to a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Wrap a command sender
    pub fn new(cmd_tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Send a raw command
    pub async fn send(&self, cmd: SessionCommand) -> Result<(), LiveError> {
        self.cmd_tx.send(cmd).await?;
        Ok(())
    }

    /// Append a batch
    pub async fn append(&self, records: Vec<PacketSummary>) -> Result<(), LiveError> {
        self.send(SessionCommand::AppendBatch { records }).await
    }

    /// Clear the buffer
    pub async fn reset(&self) -> Result<(), LiveError> {
        self.send(SessionCommand::Reset).await
    }

    /// Report a filter edit
    pub async fn edit_filter(&self, text: impl Into<String>) -> Result<(), LiveError> {
        self.send(SessionCommand::EditFilter { text: text.into() })
            .await
    }

    /// Change the selection
    pub async fn select(&self, id: Option<u64>) -> Result<(), LiveError> {
        self.send(SessionCommand::Select { id }).await
    }

    /// Answer a detail request
    pub async fn resolve_detail(
        &self,
        request: DetailRequest,
        result: Result<PacketDetail, String>,
    ) -> Result<(), LiveError> {
        self.send(SessionCommand::DetailResolved { request, result })
            .await
    }

    /// Read the current views
    pub async fn views(&self) -> Result<DerivedViews, LiveError> {
        let (response, rx) = oneshot::channel();
        self.send(SessionCommand::QueryViews { response }).await?;
        Ok(rx.await?)
    }

    /// Read formatted rows of the filtered view
    pub async fn rows(&self, range: Range<usize>) -> Result<Vec<PacketRow>, LiveError> {
        let (response, rx) = oneshot::channel();
        self.send(SessionCommand::QueryRows { range, response })
            .await?;
        Ok(rx.await?)
    }

    /// Read the displayed detail
    pub async fn detail(&self) -> Result<Option<Arc<PacketDetail>>, LiveError> {
        let (response, rx) = oneshot::channel();
        self.send(SessionCommand::QueryDetail { response }).await?;
        Ok(rx.await?)
    }

    /// Stop the session
    pub async fn shutdown(&self) -> Result<(), LiveError> {
        self.send(SessionCommand::Shutdown).await
    }
}

/// Spawn a session actor on the current runtime
///
/// Returns the command handle, the event receiver and the actor task.
pub fn spawn_session(
    config: SessionConfig,
) -> (SessionHandle, mpsc::Receiver<SessionEvent>, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer.max(1));
    let (event_tx, event_rx) = mpsc::channel(config.command_buffer.max(1));
    let task = tokio::spawn(run_session(config, cmd_rx, event_tx));
    (SessionHandle::new(cmd_tx), event_rx, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use aura_model::ProtocolLayer;

    fn packet(id: u64, src: &str, protocol: &str) -> PacketSummary {
        PacketSummary::new(id, 1, src, "10.0.0.254", protocol, 100, "")
    }

    fn detail(id: u64) -> PacketDetail {
        PacketDetail {
            summary: packet(id, "10.0.0.1", "TCP"),
            layers: vec![ProtocolLayer::new("Ethernet II").with_field("Type", "IPv4")],
            raw_bytes: vec![0x45, 0x00],
        }
    }

    fn start(config: SessionConfig) -> (
        mpsc::Sender<SessionCommand>,
        mpsc::Receiver<SessionEvent>,
        JoinHandle<()>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run_session(config, cmd_rx, event_tx));
        (cmd_tx, event_rx, handle)
    }

    async fn query_views(cmd_tx: &mpsc::Sender<SessionCommand>) -> DerivedViews {
        let (response, rx) = oneshot::channel();
        cmd_tx
            .send(SessionCommand::QueryViews { response })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    fn drain(event_rx: &mut mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_append_emits_view_change() {
        let (cmd_tx, mut event_rx, actor) = start(SessionConfig::default());

        cmd_tx
            .send(SessionCommand::AppendBatch {
                records: vec![packet(1, "a", "TCP"), packet(2, "b", "UDP")],
            })
            .await
            .unwrap();

        let event = event_rx.recv().await.unwrap();
        match event {
            SessionEvent::ViewsChanged {
                cause: ChangeCause::Appended { appended, evicted },
                generation,
            } => {
                assert_eq!(appended, 2);
                assert_eq!(evicted, 0);
                assert_eq!(generation, 1);
            }
            _ => panic!("Expected ViewsChanged event"),
        }

        let views = query_views(&cmd_tx).await;
        assert_eq!(views.buffered, 2);
        assert_eq!(views.statistics.total_packets, 2);
        assert_eq!(views.filtered.len(), 2);

        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_batch_emits_nothing() {
        let (cmd_tx, mut event_rx, actor) = start(SessionConfig::default());

        cmd_tx
            .send(SessionCommand::AppendBatch { records: vec![] })
            .await
            .unwrap();
        let views = query_views(&cmd_tx).await;

        assert_eq!(views.buffered, 0);
        assert!(drain(&mut event_rx).is_empty());

        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        actor.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_filter_edits_apply_once() {
        let (cmd_tx, mut event_rx, actor) = start(SessionConfig::default());
        cmd_tx
            .send(SessionCommand::AppendBatch {
                records: vec![packet(1, "a", "TCP"), packet(2, "b", "UDP")],
            })
            .await
            .unwrap();
        let _ = event_rx.recv().await;
        // Compute the initial views so recomputation counts start from here
        let before = query_views(&cmd_tx).await.recomputes;

        for text in ["u", "ud", "udp", "tcp", "udp"] {
            cmd_tx
                .send(SessionCommand::EditFilter {
                    text: text.to_string(),
                })
                .await
                .unwrap();
            tokio::time::advance(Duration::from_millis(20)).await;
        }

        let views = query_views(&cmd_tx).await;
        assert_eq!(views.applied_filter, "");
        assert_eq!(views.pending_filter.as_deref(), Some("udp"));

        tokio::time::sleep(Duration::from_millis(250)).await;

        let applied: Vec<String> = drain(&mut event_rx)
            .iter()
            .filter_map(|e| e.applied_filter().map(str::to_string))
            .collect();
        assert_eq!(applied, vec!["udp".to_string()]);

        let views = query_views(&cmd_tx).await;
        assert_eq!(views.applied_filter, "udp");
        assert_eq!(views.pending_filter, None);
        assert_eq!(views.filtered.ids(), vec![2]);
        assert_eq!(views.recomputes.filtered, before.filtered + 1);
        assert_eq!(views.recomputes.statistics, before.statistics);

        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        actor.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_pending_edit() {
        let (cmd_tx, mut event_rx, actor) = start(SessionConfig::default());

        cmd_tx
            .send(SessionCommand::EditFilter {
                text: "tcp".to_string(),
            })
            .await
            .unwrap();
        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        actor.await.unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(drain(&mut event_rx).is_empty());
    }

    #[tokio::test]
    async fn test_stale_detail_is_ignored() {
        let (cmd_tx, mut event_rx, actor) = start(SessionConfig::default());

        cmd_tx.send(SessionCommand::Select { id: Some(7) }).await.unwrap();
        let first = match event_rx.recv().await.unwrap() {
            SessionEvent::Backend(BackendRequest::FetchDetail(request)) => request,
            other => panic!("Expected FetchDetail, got {:?}", other),
        };

        cmd_tx.send(SessionCommand::Select { id: Some(9) }).await.unwrap();
        // Selecting again clears the (empty) detail, then requests 9
        assert_eq!(
            event_rx.recv().await.unwrap(),
            SessionEvent::DetailChanged { id: None }
        );
        let second = match event_rx.recv().await.unwrap() {
            SessionEvent::Backend(BackendRequest::FetchDetail(request)) => request,
            other => panic!("Expected FetchDetail, got {:?}", other),
        };
        assert_eq!(second.id, 9);

        // Late response for 7 must not be displayed
        cmd_tx
            .send(SessionCommand::DetailResolved {
                request: first,
                result: Ok(detail(7)),
            })
            .await
            .unwrap();
        let (response, rx) = oneshot::channel();
        cmd_tx
            .send(SessionCommand::QueryDetail { response })
            .await
            .unwrap();
        assert!(rx.await.unwrap().is_none());

        cmd_tx
            .send(SessionCommand::DetailResolved {
                request: second,
                result: Ok(detail(9)),
            })
            .await
            .unwrap();
        assert_eq!(
            event_rx.recv().await.unwrap(),
            SessionEvent::DetailChanged { id: Some(9) }
        );

        let (response, rx) = oneshot::channel();
        cmd_tx
            .send(SessionCommand::QueryDetail { response })
            .await
            .unwrap();
        assert_eq!(rx.await.unwrap().map(|d| d.id()), Some(9));

        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_detail_is_swallowed() {
        let (cmd_tx, mut event_rx, actor) = start(SessionConfig::default());

        cmd_tx.send(SessionCommand::Select { id: Some(3) }).await.unwrap();
        let request = match event_rx.recv().await.unwrap() {
            SessionEvent::Backend(BackendRequest::FetchDetail(request)) => request,
            other => panic!("Expected FetchDetail, got {:?}", other),
        };

        cmd_tx
            .send(SessionCommand::DetailResolved {
                request,
                result: Err("Packet not found in cache.".to_string()),
            })
            .await
            .unwrap();
        let _ = query_views(&cmd_tx).await;

        assert!(drain(&mut event_rx).is_empty());

        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn test_start_capture_resets_buffer() {
        let (cmd_tx, mut event_rx, actor) = start(SessionConfig::default());

        cmd_tx
            .send(SessionCommand::AppendBatch {
                records: vec![packet(1, "a", "TCP")],
            })
            .await
            .unwrap();
        cmd_tx
            .send(SessionCommand::StartCapture {
                interface: "eth0".to_string(),
            })
            .await
            .unwrap();

        let _appended = event_rx.recv().await.unwrap();
        match event_rx.recv().await.unwrap() {
            SessionEvent::ViewsChanged {
                cause: ChangeCause::Reset,
                generation,
            } => assert_eq!(generation, 2),
            other => panic!("Expected reset, got {:?}", other),
        }
        assert_eq!(
            event_rx.recv().await.unwrap(),
            SessionEvent::Backend(BackendRequest::StartCapture {
                interface: "eth0".to_string()
            })
        );
        assert_eq!(query_views(&cmd_tx).await.buffered, 0);

        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn test_start_while_capturing_keeps_buffer() {
        let (cmd_tx, mut event_rx, actor) = start(SessionConfig::default());
        let start_eth0 = || SessionCommand::StartCapture {
            interface: "eth0".to_string(),
        };

        cmd_tx.send(start_eth0()).await.unwrap();
        cmd_tx
            .send(SessionCommand::AppendBatch {
                records: vec![packet(1, "a", "TCP")],
            })
            .await
            .unwrap();
        cmd_tx.send(start_eth0()).await.unwrap();

        assert_eq!(query_views(&cmd_tx).await.buffered, 1);

        let events = drain(&mut event_rx);
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[3],
            SessionEvent::Error {
                source: "Capture".to_string(),
                message: "Capture already in progress".to_string(),
            }
        );
        let resets = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    SessionEvent::ViewsChanged {
                        cause: ChangeCause::Reset,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(resets, 1);

        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_only_forwarded_while_capturing() {
        let (cmd_tx, mut event_rx, actor) = start(SessionConfig::default());

        cmd_tx.send(SessionCommand::StopCapture).await.unwrap();
        let _ = query_views(&cmd_tx).await;
        assert!(drain(&mut event_rx).is_empty());

        cmd_tx
            .send(SessionCommand::StartCapture {
                interface: "eth0".to_string(),
            })
            .await
            .unwrap();
        cmd_tx.send(SessionCommand::StopCapture).await.unwrap();
        cmd_tx.send(SessionCommand::StopCapture).await.unwrap();
        let _ = query_views(&cmd_tx).await;

        let stops = drain(&mut event_rx)
            .into_iter()
            .filter(|e| *e == SessionEvent::Backend(BackendRequest::StopCapture))
            .count();
        assert_eq!(stops, 1);

        // A stopped capture can be started again
        cmd_tx
            .send(SessionCommand::StartCapture {
                interface: "eth1".to_string(),
            })
            .await
            .unwrap();
        let _ = query_views(&cmd_tx).await;
        assert!(drain(&mut event_rx).contains(&SessionEvent::Backend(
            BackendRequest::StartCapture {
                interface: "eth1".to_string()
            }
        )));

        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn test_export_uses_filtered_ids() {
        let (cmd_tx, mut event_rx, actor) = start(SessionConfig {
            filter_debounce_ms: 0,
            ..Default::default()
        });

        cmd_tx
            .send(SessionCommand::ExportFiltered {
                path: PathBuf::from("empty.pcap"),
            })
            .await
            .unwrap();
        match event_rx.recv().await.unwrap() {
            SessionEvent::Error { source, .. } => assert_eq!(source, "Export"),
            other => panic!("Expected export error, got {:?}", other),
        }

        cmd_tx
            .send(SessionCommand::AppendBatch {
                records: vec![packet(1, "a", "TCP"), packet(2, "b", "UDP"), packet(3, "c", "TCP")],
            })
            .await
            .unwrap();
        cmd_tx
            .send(SessionCommand::EditFilter {
                text: "protocol:tcp".to_string(),
            })
            .await
            .unwrap();
        let _appended = event_rx.recv().await.unwrap();
        let applied = event_rx.recv().await.unwrap();
        assert_eq!(applied.applied_filter(), Some("protocol:tcp"));

        cmd_tx
            .send(SessionCommand::ExportFiltered {
                path: PathBuf::from("tcp.pcap"),
            })
            .await
            .unwrap();
        assert_eq!(
            event_rx.recv().await.unwrap(),
            SessionEvent::Backend(BackendRequest::ExportPcap {
                path: PathBuf::from("tcp.pcap"),
                ids: vec![1, 3],
            })
        );

        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_round_trip() {
        let (session, mut events, task) = spawn_session(SessionConfig::default());

        session
            .append(vec![packet(1, "a", "TCP"), packet(2, "b", "UDP")])
            .await
            .unwrap();
        let _ = events.recv().await;

        let rows = session.rows(0..10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].time, "00:00:00.000");

        session.shutdown().await.unwrap();
        task.await.unwrap();

        assert!(matches!(
            session.views().await,
            Err(LiveError::SessionClosed)
        ));
    }
}
