//! Run outputs: the daily signal, dated snapshots, the digest text and the
//! machine-readable run report.
//!
//! Everything here consumes read-only views of what the engine produced.
//! Notification delivery itself (mail, chat) is outside the repo; the
//! digest is written to a file the scheduler picks up.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::campaign::store::CampaignStore;
use crate::campaign::{AdvanceReport, Campaign};
use crate::gate::{GateDecision, WalkForwardSummary};
use crate::types::{fmt_numbers, Selection};

// ---------------------------------------------------------------------------
// Daily signal
// ---------------------------------------------------------------------------

/// Snapshot of one gate evaluation — what "today" looked like.
#[derive(Debug, Clone, Serialize)]
pub struct DailySignal {
    pub last_index: Option<u64>,
    pub last_date: Option<NaiveDate>,
    pub gate_pass: bool,
    pub gate: GateDecision,
    pub summary: WalkForwardSummary,
    /// Today's selection, regardless of the gate outcome.
    pub selection: Selection,
}

/// Write the signal to `<dir>/<YYYY>/<MM>/<YYYY-MM-DD>.json`.
pub fn write_snapshot(dir: &Path, signal: &DailySignal, date: NaiveDate) -> Result<PathBuf> {
    let out_dir = dir
        .join(date.format("%Y").to_string())
        .join(date.format("%m").to_string());
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create snapshot directory {}", out_dir.display()))?;

    let out_path = out_dir.join(format!("{date}.json"));
    let json = serde_json::to_string_pretty(signal).context("Failed to serialise daily signal")?;
    std::fs::write(&out_path, &json)
        .with_context(|| format!("Failed to write snapshot to {}", out_path.display()))?;

    info!(path = %out_path.display(), "Daily snapshot written");
    Ok(out_path)
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Machine-readable per-run output for workflow consumption.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub date: NaiveDate,
    pub latest_index: Option<u64>,
    pub gate_pass: bool,
    pub opened: usize,
    pub active: usize,
    pub won: usize,
    pub expired: usize,
    pub notify: bool,
}

pub fn write_run_report(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialise run report")?;
    std::fs::write(path, &json)
        .with_context(|| format!("Failed to write run report to {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

/// Whether today's run warrants a notification: anything opened, closed or
/// still being tracked.
pub fn should_notify(opened: Option<&Campaign>, advance: &AdvanceReport, store: &CampaignStore) -> bool {
    opened.is_some()
        || !advance.won.is_empty()
        || !advance.expired.is_empty()
        || store.active().next().is_some()
}

/// Render the daily digest text.
pub fn render_digest(
    signal: &DailySignal,
    store: &CampaignStore,
    opened: Option<&Campaign>,
    advance: &AdvanceReport,
    date: NaiveDate,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "TEIMOSA — Daily Digest");
    let _ = writeln!(out);
    let _ = writeln!(out, "Run date: {date}");
    match (signal.last_index, signal.last_date) {
        (Some(index), Some(event_date)) => {
            let _ = writeln!(out, "Latest event: #{index} | {event_date}");
        }
        _ => {
            let _ = writeln!(out, "Latest event: none");
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "gate_pass (today): {}", signal.gate_pass);
    let _ = writeln!(
        out,
        "Percentiles: {:.0}-{:.0} | Band: {} | Current gap: {}",
        signal.gate.percentile_low,
        signal.gate.percentile_high,
        match (signal.gate.band_low, signal.gate.band_high) {
            (Some(lo), Some(hi)) => format!("{lo:.1}-{hi:.1}"),
            _ => "n/a".to_string(),
        },
        signal
            .gate
            .current_gap
            .map(|g| g.to_string())
            .unwrap_or_else(|| "n/a".to_string()),
    );
    let _ = writeln!(out);

    if let Some(campaign) = opened {
        let _ = writeln!(out, "=== NEW CAMPAIGN OPENED TODAY ===");
        let _ = writeln!(
            out,
            "- {} | start={} -> target={} | window={}",
            campaign.id, campaign.start_index, campaign.target_start_index, campaign.window_length,
        );
        let _ = writeln!(out);
    }

    if !advance.won.is_empty() {
        let _ = writeln!(out, "=== CAMPAIGNS CLOSED (WON) ===");
        for id in &advance.won {
            if let Some(campaign) = store.find(id) {
                if let Some(outcome) = &campaign.outcome {
                    let _ = writeln!(
                        out,
                        "- {} | start={} | won at event {} with {} hits ({})",
                        campaign.id,
                        campaign.start_index,
                        outcome.event_index,
                        outcome.hits,
                        outcome.sub_bet,
                    );
                }
            }
        }
        let _ = writeln!(out);
    }

    if !advance.expired.is_empty() {
        let _ = writeln!(out, "=== CAMPAIGNS CLOSED (EXPIRED) ===");
        for id in &advance.expired {
            if let Some(campaign) = store.find(id) {
                let reason = campaign
                    .expiry_reason
                    .as_deref()
                    .unwrap_or("window exhausted");
                let _ = writeln!(
                    out,
                    "- {} | start={} | expired after {} checks ({reason})",
                    campaign.id,
                    campaign.start_index,
                    campaign.checks.len(),
                );
            }
        }
        let _ = writeln!(out);
    }

    if !advance.checks.is_empty() {
        let _ = writeln!(out, "=== TODAY'S CHECKS (per campaign) ===");
        for delta in &advance.checks {
            let _ = writeln!(
                out,
                "- {} | event {} | hits={} | sub_bet={}",
                delta.campaign_id, delta.check.event_index, delta.check.hits, delta.check.sub_bet,
            );
        }
        let _ = writeln!(out);
    }

    let active: Vec<&Campaign> = store.active().collect();
    if !active.is_empty() {
        let _ = writeln!(out, "=== ACTIVE CAMPAIGNS (reminder) ===");
        for campaign in active {
            let _ = writeln!(
                out,
                "- {} | start={} -> target={} | checks {}/{} | remaining={}",
                campaign.id,
                campaign.start_index,
                campaign.target_start_index,
                campaign.checks.len(),
                campaign.window_length,
                campaign.checks_remaining(),
            );
            if let Some(last) = campaign.checks.last() {
                let _ = writeln!(
                    out,
                    "  last: event {} | hits={} | sub_bet={}",
                    last.event_index, last.hits, last.sub_bet,
                );
            }
            let _ = writeln!(out, "  Games:");
            for (label, numbers) in campaign.selection.iter() {
                let _ = writeln!(out, "    {label}: {}", fmt_numbers(numbers));
            }
        }
        let _ = writeln!(out);
    }

    out
}

/// Write the digest body to disk for the delivery hook to pick up.
pub fn write_digest(path: &Path, body: &str) -> Result<()> {
    std::fs::write(path, body)
        .with_context(|| format!("Failed to write digest to {}", path.display()))?;
    info!(path = %path.display(), "Digest written");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
