//! Replay of a recorded packet stream through a live session
//!
//! Input is JSON lines, one record per line. A line is either a bare
//! [`PacketSummary`] or a full [`PacketDetail`]; details also feed their
//! summary into the stream and answer detail fetches for that packet.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use aura_live::{
    spawn_session, BackendRequest, BatchCoalescer, PacketRow, SessionEvent, SessionHandle,
    Statistics,
};
use aura_model::{hex_dump, HexRow, PacketDetail, PacketSummary};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::settings::Settings;

/// Longest wait for the detail of the selected packet
const DETAIL_TIMEOUT: Duration = Duration::from_secs(5);

/// One line of the input file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputLine {
    Detail(PacketDetail),
    Summary(PacketSummary),
}

/// A parsed capture file
#[derive(Debug, Default)]
pub struct Capture {
    /// Summaries in file order
    pub summaries: Vec<PacketSummary>,
    /// Details by packet id
    pub details: HashMap<u64, PacketDetail>,
}

impl Capture {
    /// Parse JSON-lines text; blank lines are skipped
    pub fn parse(text: &str) -> Result<Self> {
        let mut capture = Capture::default();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let parsed: InputLine = serde_json::from_str(line)
                .with_context(|| format!("Invalid record on line {}", index + 1))?;
            match parsed {
                InputLine::Summary(summary) => capture.summaries.push(summary),
                InputLine::Detail(detail) => {
                    capture.summaries.push(detail.summary.clone());
                    capture.details.insert(detail.id(), detail);
                }
            }
        }

        Ok(capture)
    }

    /// Read and parse a capture file
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&text)
    }
}

/// Options for one replay run
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Filter query to apply once the stream is loaded
    pub filter: String,
    /// Packet whose detail is fetched
    pub select: Option<u64>,
    /// Maximum filtered rows in the report
    pub row_limit: usize,
}

/// One flattened protocol field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldLine {
    pub depth: usize,
    pub layer: String,
    pub name: String,
    pub value: String,
}

/// Detail of the selected packet
#[derive(Debug, Clone, Serialize)]
pub struct DetailReport {
    pub id: u64,
    pub fields: Vec<FieldLine>,
    pub hex: Vec<HexRow>,
}

impl DetailReport {
    fn from_detail(detail: &PacketDetail) -> Self {
        Self {
            id: detail.id(),
            fields: detail
                .field_rows()
                .map(|row| FieldLine {
                    depth: row.depth,
                    layer: row.layer.to_string(),
                    name: row.name.to_string(),
                    value: row.value.to_string(),
                })
                .collect(),
            hex: hex_dump(&detail.raw_bytes),
        }
    }
}

/// Result of a replay run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Packets left in the buffer
    pub buffered: usize,
    /// Filter the rows were selected with
    pub applied_filter: String,
    /// Packets matching the filter
    pub matched: usize,
    /// Statistics over the whole buffer
    pub statistics: Statistics,
    /// First rows of the filtered view
    pub rows: Vec<PacketRow>,
    /// Detail of the selected packet, if it was found
    pub detail: Option<DetailReport>,
}

/// Answer backend requests from the recorded details
///
/// Runs until the session drops its event sender. Every resolved detail
/// request is reported on `resolved`.
async fn serve_backend(
    session: SessionHandle,
    mut events: mpsc::Receiver<SessionEvent>,
    details: HashMap<u64, PacketDetail>,
    resolved: mpsc::Sender<u64>,
) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Backend(BackendRequest::FetchDetail(request)) => {
                let result = details
                    .get(&request.id)
                    .cloned()
                    .ok_or_else(|| "Packet not found in cache.".to_string());
                if session.resolve_detail(request, result).await.is_err() {
                    break;
                }
                let _ = resolved.send(request.id).await;
            }
            SessionEvent::Backend(other) => {
                debug!("No capture engine attached, ignoring {:?}", other);
            }
            SessionEvent::Error { source, message } => {
                warn!("{} failed: {}", source, message);
            }
            event => debug!(?event, "Session event"),
        }
    }
}

/// Push the capture through a fresh session and collect a report
pub async fn run(capture: Capture, settings: &Settings, options: &ReplayOptions) -> Result<Report> {
    let config = settings.session.clone();
    let (session, events, task) = spawn_session(config.clone());
    let (resolved_tx, mut resolved_rx) = mpsc::channel(4);
    let backend = tokio::spawn(serve_backend(
        session.clone(),
        events,
        capture.details,
        resolved_tx,
    ));

    let total = capture.summaries.len();
    let mut coalescer = BatchCoalescer::new(config.batch_size, config.batch_timeout(), Instant::now());
    for summary in capture.summaries {
        let now = Instant::now();
        if let Some(batch) = coalescer.poll(now) {
            session.append(batch).await?;
        }
        if let Some(batch) = coalescer.push(summary, now) {
            session.append(batch).await?;
        }
    }
    if let Some(batch) = coalescer.flush() {
        session.append(batch).await?;
    }
    info!("Replayed {} packets", total);

    if !options.filter.is_empty() {
        session.edit_filter(options.filter.clone()).await?;
        loop {
            sleep(config.filter_debounce()).await;
            if session.views().await?.pending_filter.is_none() {
                break;
            }
        }
    }

    let mut detail = None;
    if let Some(id) = options.select {
        session.select(Some(id)).await?;
        match timeout(DETAIL_TIMEOUT, resolved_rx.recv()).await {
            Ok(Some(_)) => {
                detail = session
                    .detail()
                    .await?
                    .map(|detail| DetailReport::from_detail(&detail));
                if detail.is_none() {
                    warn!("No detail recorded for packet {}", id);
                }
            }
            Ok(None) => warn!("Backend stopped before packet {} was resolved", id),
            Err(_) => warn!("Timed out waiting for detail of packet {}", id),
        }
    }

    let views = session.views().await?;
    let rows = session.rows(0..options.row_limit).await?;

    session.shutdown().await?;
    task.await.context("Session task failed")?;
    backend.await.context("Backend task failed")?;

    Ok(Report {
        buffered: views.buffered,
        applied_filter: views.applied_filter,
        matched: views.filtered.len(),
        statistics: (*views.statistics).clone(),
        rows,
        detail,
    })
}

/// Render a report as plain text
pub fn render(report: &Report, show_hex: bool) -> String {
    let stats = &report.statistics;
    let mut out = String::new();

    out.push_str(&format!(
        "Packets: {} ({} bytes, avg {:.1})\n",
        stats.total_packets, stats.total_bytes, stats.average_packet_size
    ));

    if !stats.protocols.is_empty() {
        out.push_str("Protocols:\n");
        for share in &stats.protocols {
            out.push_str(&format!(
                "  {:<8} {:>6.1}%  {} packets\n",
                share.protocol, share.percentage, share.count
            ));
        }
    }

    for (title, talkers) in [
        ("Top sources", &stats.top_sources),
        ("Top destinations", &stats.top_destinations),
    ] {
        if talkers.is_empty() {
            continue;
        }
        out.push_str(&format!("{}:\n", title));
        for talker in talkers.iter() {
            out.push_str(&format!("  {:<40} {}\n", talker.addr, talker.count));
        }
    }

    if report.applied_filter.is_empty() {
        out.push_str(&format!("\nShowing {} of {} packets\n", report.rows.len(), report.matched));
    } else {
        out.push_str(&format!(
            "\nFilter {:?}: {} of {} packets match, showing {}\n",
            report.applied_filter,
            report.matched,
            report.buffered,
            report.rows.len()
        ));
    }
    for row in &report.rows {
        out.push_str(&format!(
            "{:>8} {} {:<24} {:<24} {:<7} {:>6} {}\n",
            row.id, row.time, row.source, row.destination, row.protocol, row.length, row.info
        ));
    }

    if let Some(detail) = &report.detail {
        out.push_str(&format!("\nPacket {}\n", detail.id));
        let mut layer = None;
        for field in &detail.fields {
            if layer != Some(field.layer.as_str()) {
                out.push_str(&format!("{}{}\n", "  ".repeat(field.depth), field.layer));
                layer = Some(field.layer.as_str());
            }
            out.push_str(&format!(
                "{}{}: {}\n",
                "  ".repeat(field.depth + 1),
                field.name,
                field.value
            ));
        }
        if show_hex {
            for row in &detail.hex {
                out.push_str(&format!("{}  {:<47}  {}\n", row.offset, row.hex_line(), row.ascii));
            }
        }
    }

    out
}
