//! Shared types for the TEIMOSA engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that event, strategy, gate,
//! and campaign modules can depend on them without circular references.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// One dated record in the historical draw sequence.
///
/// Events are immutable once created and the sequence is append-only.
/// `index` values are strictly increasing; gaps are tolerated, duplicates
/// are not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Sequence position (the official draw number).
    pub index: u64,
    /// Date the draw happened.
    pub date: NaiveDate,
    /// The realized outcome set (drawn numbers).
    pub outcome: BTreeSet<u8>,
    /// Payout tariff in force for this draw. Sparse: absent hit-counts pay
    /// zero. Varies per event because tariffs change over time.
    pub payouts: PayoutTable,
}

impl Event {
    /// Number of elements a candidate set shares with this event's outcome.
    pub fn hits(&self, numbers: &BTreeSet<u8>) -> u8 {
        numbers.intersection(&self.outcome).count() as u8
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} | {}", self.index, self.date, fmt_numbers(&self.outcome))
    }
}

/// Format a number set as zero-padded tokens: `{2, 5, 14}` → `"02 05 14"`.
pub fn fmt_numbers(numbers: &BTreeSet<u8>) -> String {
    numbers
        .iter()
        .map(|n| format!("{n:02}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Payout table
// ---------------------------------------------------------------------------

/// Sparse mapping from hit-count to monetary payout.
///
/// Only hit-counts at or above the paying tier are ever present; looking up
/// an absent key yields zero, never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayoutTable(BTreeMap<u8, Decimal>);

impl PayoutTable {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build a table from `(hits, payout)` pairs. Zero payouts are dropped
    /// so the sparse representation stays canonical.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u8, Decimal)>) -> Self {
        Self(pairs.into_iter().filter(|(_, v)| !v.is_zero()).collect())
    }

    /// Payout for an exact hit-count. Absent key means zero.
    pub fn payout_for(&self, hits: u8) -> Decimal {
        self.0.get(&hits).copied().unwrap_or(Decimal::ZERO)
    }

    /// Whether any tier pays at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u8, &Decimal)> {
        self.0.iter()
    }
}

impl fmt::Display for PayoutTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "no paying tiers");
        }
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(hits, value)| format!("{hits}:{value}"))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// A named mapping of sub-bet label → candidate number set, produced by a
/// Strategy at a given history cutoff. Immutable once produced; campaigns
/// freeze a copy at creation time and never regenerate it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(BTreeMap<String, BTreeSet<u8>>);

impl Selection {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, label: impl Into<String>, numbers: BTreeSet<u8>) {
        self.0.insert(label.into(), numbers);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<u8>)> {
        self.0.iter()
    }

    pub fn get(&self, label: &str) -> Option<&BTreeSet<u8>> {
        self.0.get(label)
    }

    /// The sub-bet scoring the most hits against an event outcome.
    ///
    /// Ties resolve to the first label in map order, which keeps repeated
    /// evaluations deterministic.
    pub fn best_against(&self, event: &Event) -> Option<SubBetHits> {
        let mut best: Option<SubBetHits> = None;
        for (label, numbers) in &self.0 {
            let hits = event.hits(numbers);
            let better = match &best {
                Some(b) => hits > b.hits,
                None => true,
            };
            if better {
                best = Some(SubBetHits {
                    label: label.clone(),
                    hits,
                });
            }
        }
        best
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (label, numbers) in &self.0 {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{label}: {}", fmt_numbers(numbers))?;
            first = false;
        }
        Ok(())
    }
}

/// Best-scoring sub-bet for one evaluated event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubBetHits {
    pub label: String,
    pub hits: u8,
}

// ---------------------------------------------------------------------------
// Success mode
// ---------------------------------------------------------------------------

/// How a walk-forward trial is labeled a success.
///
/// `Profit`: total payout minus total cost over the window is positive.
/// `Hits`: the best hit-count over the window reaches the win threshold.
/// Neither mode subsumes the other; the choice is explicit configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessMode {
    Profit,
    Hits,
}

impl fmt::Display for SuccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuccessMode::Profit => write!(f, "profit"),
            SuccessMode::Hits => write!(f, "hits"),
        }
    }
}

impl std::str::FromStr for SuccessMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "profit" | "lucro" => Ok(SuccessMode::Profit),
            "hits" | "acertos" => Ok(SuccessMode::Hits),
            _ => Err(anyhow::anyhow!("Unknown success mode: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for TEIMOSA.
#[derive(Debug, thiserror::Error)]
pub enum TeimosaError {
    #[error("Event log error: {0}")]
    EventLog(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Strategy error ({strategy}): {message}")]
    Strategy { strategy: String, message: String },

    #[error("Payout model error: {0}")]
    Payout(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
