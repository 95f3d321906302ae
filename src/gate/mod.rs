//! Walk-forward success labeling and the percentile admission gate.
//!
//! The engine replays the full history every run: for each base position it
//! regenerates the selection a player would have held at that point, scores
//! it over the following window, and labels the base a success or not. The
//! gate then asks whether the distance since the last success sits inside
//! the percentile band of historical gaps between successes — "about due",
//! not "overdue" or "too soon". This is an admission filter, not a
//! predictor: every failure path is a normal `pass = false` decision with a
//! reason, never an error.

pub mod stats;

use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::events::EventLog;
use crate::strategy::{PayoutModel, Strategy};
use crate::types::SuccessMode;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Gate evaluation parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    /// Window length: how many subsequent events a trial is played over.
    pub window: usize,
    /// Hit-count that counts as a win (used directly in `hits` mode and for
    /// the first-winning-offset bookkeeping in both modes).
    pub win_threshold: u8,
    /// Lower percentile of the gap band (0–100).
    pub percentile_low: f64,
    /// Upper percentile of the gap band (0–100).
    pub percentile_high: f64,
    /// How a trial is labeled a success.
    pub success_mode: SuccessMode,
    /// Keep only the newest N bases of the walk-forward; `None` evaluates
    /// every base.
    #[serde(default)]
    pub lookback_bases: Option<usize>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            window: 2,
            win_threshold: 11,
            percentile_low: 40.0,
            percentile_high: 60.0,
            success_mode: SuccessMode::Profit,
            lookback_bases: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Walk-forward records
// ---------------------------------------------------------------------------

/// Outcome of one walk-forward trial, anchored at a base position.
///
/// `position` is the offset into the ordered log (the history prefix
/// length); `base_index` is the event index of the last visible event.
/// Derived data — recomputed every run, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessRecord {
    pub position: usize,
    pub base_index: u64,
    pub success: bool,
    pub cost: Decimal,
    pub payout: Decimal,
    pub best_hits: u8,
    /// 1-based offset within the window of the first qualifying event.
    pub win_at: Option<usize>,
}

impl SuccessRecord {
    pub fn profit(&self) -> Decimal {
        self.payout - self.cost
    }
}

/// Aggregate accounting over the walk-forward history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkForwardSummary {
    pub trials: usize,
    pub successes: usize,
    pub success_rate: f64,
    pub total_cost: Decimal,
    pub total_payout: Decimal,
    pub total_profit: Decimal,
}

impl fmt::Display for WalkForwardSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "trials={} successes={} rate={:.1}% cost={} payout={} profit={}",
            self.trials,
            self.successes,
            self.success_rate * 100.0,
            self.total_cost,
            self.total_payout,
            self.total_profit,
        )
    }
}

// ---------------------------------------------------------------------------
// Gate decision
// ---------------------------------------------------------------------------

/// The "act today?" decision. Failure paths carry a reason and are normal
/// outcomes of a statistical computation on insufficient data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateDecision {
    pub pass: bool,
    pub percentile_low: f64,
    pub percentile_high: f64,
    pub band_low: Option<f64>,
    pub band_high: Option<f64>,
    /// Distance from the last eligible base back to the last success, in
    /// draw positions.
    pub current_gap: Option<u64>,
    pub trials: usize,
    pub successes: usize,
    pub reason: String,
}

impl GateDecision {
    fn fail(config: &GateConfig, trials: usize, successes: usize, reason: &str) -> Self {
        Self {
            pass: false,
            percentile_low: config.percentile_low,
            percentile_high: config.percentile_high,
            band_low: None,
            band_high: None,
            current_gap: None,
            trials,
            successes,
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let band = match (self.band_low, self.band_high) {
            (Some(lo), Some(hi)) => format!("{lo:.1}-{hi:.1}"),
            _ => "n/a".to_string(),
        };
        let gap = self
            .current_gap
            .map(|g| g.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        write!(
            f,
            "{} | band [{band}] | gap {gap} | {}",
            if self.pass { "PASS" } else { "SKIP" },
            self.reason,
        )
    }
}

/// Everything one gate evaluation produces.
#[derive(Debug, Clone)]
pub struct GateReport {
    pub records: Vec<SuccessRecord>,
    pub summary: WalkForwardSummary,
    pub decision: GateDecision,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Walk-forward labeling plus percentile gate.
pub struct GateEngine {
    config: GateConfig,
}

impl GateEngine {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Label every eligible base of the history.
    ///
    /// For base position `i` the strategy sees only `events[..i]`; the
    /// trial is then scored over `events[i .. i + window]`. Histories
    /// shorter than `window + 2` yield no records at all.
    ///
    /// Strategy or payout failures abort the whole computation — a partial
    /// label set must never feed the gate.
    pub fn compute_success_history(
        &self,
        log: &EventLog,
        strategy: &dyn Strategy,
        payout: &dyn PayoutModel,
    ) -> Result<Vec<SuccessRecord>> {
        let n = log.len();
        let window = self.config.window;

        if n < window + 2 {
            debug!(events = n, window, "Insufficient history for walk-forward");
            return Ok(Vec::new());
        }

        let last_base = n - window;
        let first_base = match self.config.lookback_bases {
            Some(lookback) if lookback > 0 => last_base.saturating_sub(lookback - 1).max(1),
            _ => 1,
        };

        let events = log.events();
        let mut records = Vec::with_capacity(last_base - first_base + 1);

        for position in first_base..=last_base {
            let history = log.prefix(position);
            let base_index = history[position - 1].index;
            // The seed derives from the evaluation point so reruns over the
            // same data reproduce identical selections.
            let selection = strategy.generate(history, base_index)?;

            let mut cost = Decimal::ZERO;
            let mut total_payout = Decimal::ZERO;
            let mut best_hits = 0u8;
            let mut win_at: Option<usize> = None;

            for offset in 0..window {
                let target = &events[position + offset];
                let outcome = payout.evaluate(target, &selection);
                cost += outcome.cost;
                total_payout += outcome.payout;
                best_hits = best_hits.max(outcome.best_hits);

                let qualifies = match self.config.success_mode {
                    SuccessMode::Profit => outcome.payout > Decimal::ZERO,
                    SuccessMode::Hits => outcome.best_hits >= self.config.win_threshold,
                };
                if win_at.is_none() && qualifies {
                    win_at = Some(offset + 1);
                }
            }

            let success = match self.config.success_mode {
                SuccessMode::Profit => total_payout - cost > Decimal::ZERO,
                SuccessMode::Hits => best_hits >= self.config.win_threshold,
            };

            records.push(SuccessRecord {
                position,
                base_index,
                success,
                cost,
                payout: total_payout,
                best_hits,
                win_at,
            });
        }

        Ok(records)
    }

    /// Derive today's admission decision from the labeled history.
    ///
    /// The band is the percentile range of gaps between successive success
    /// positions; the current gap runs from the last eligible base (the
    /// newest base whose full window fits the history) back to the last
    /// success at or before it. Both band ends are inclusive.
    pub fn compute_gate(&self, log: &EventLog, records: &[SuccessRecord]) -> GateDecision {
        let trials = records.len();
        let successes: Vec<usize> = records
            .iter()
            .filter(|r| r.success)
            .map(|r| r.position)
            .collect();

        if trials == 0 {
            return GateDecision::fail(&self.config, 0, 0, "insufficient history");
        }

        let gaps = stats::gap_series(&successes);
        if gaps.is_empty() {
            return GateDecision::fail(
                &self.config,
                trials,
                successes.len(),
                "insufficient successes",
            );
        }

        let band_low = stats::percentile(&gaps, self.config.percentile_low);
        let band_high = stats::percentile(&gaps, self.config.percentile_high);

        let last_eligible = log.len() - self.config.window;
        let last_success = successes.iter().filter(|&&p| p <= last_eligible).max();

        let Some(&last_success) = last_success else {
            return GateDecision::fail(
                &self.config,
                trials,
                successes.len(),
                "no success at or before the last eligible base",
            );
        };

        let current_gap = (last_eligible - last_success) as u64;
        let pass = band_low <= current_gap as f64 && current_gap as f64 <= band_high;
        let reason = if pass {
            "current gap inside the historical band".to_string()
        } else {
            format!("current gap outside the historical band ({band_low:.1}-{band_high:.1})")
        };

        GateDecision {
            pass,
            percentile_low: self.config.percentile_low,
            percentile_high: self.config.percentile_high,
            band_low: Some(band_low),
            band_high: Some(band_high),
            current_gap: Some(current_gap),
            trials,
            successes: successes.len(),
            reason,
        }
    }

    /// Full evaluation: label the history, summarize, decide.
    pub fn evaluate(
        &self,
        log: &EventLog,
        strategy: &dyn Strategy,
        payout: &dyn PayoutModel,
    ) -> Result<GateReport> {
        let records = self.compute_success_history(log, strategy, payout)?;
        let summary = summarize(&records);
        let decision = self.compute_gate(log, &records);

        info!(
            trials = summary.trials,
            successes = summary.successes,
            pass = decision.pass,
            gap = ?decision.current_gap,
            reason = %decision.reason,
            "Gate evaluated"
        );

        Ok(GateReport {
            records,
            summary,
            decision,
        })
    }
}

/// Aggregate the walk-forward records.
fn summarize(records: &[SuccessRecord]) -> WalkForwardSummary {
    let trials = records.len();
    let successes = records.iter().filter(|r| r.success).count();
    let total_cost: Decimal = records.iter().map(|r| r.cost).sum();
    let total_payout: Decimal = records.iter().map(|r| r.payout).sum();

    WalkForwardSummary {
        trials,
        successes,
        success_rate: if trials > 0 {
            successes as f64 / trials as f64
        } else {
            0.0
        },
        total_cost,
        total_payout,
        total_profit: total_payout - total_cost,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
