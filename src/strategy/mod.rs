//! Selection generation and payout evaluation seams.
//!
//! Defines the `Strategy` and `PayoutModel` traits the engine depends on,
//! plus the shipped implementations: the four-game group strategy and the
//! tiered payout model with per-event ticket-cost inference.

pub mod groups;
pub mod payout;

use anyhow::Result;
use rust_decimal::Decimal;

use crate::types::{Event, Selection};

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Abstraction over candidate-selection heuristics.
///
/// Implementors must be pure functions of the supplied history: no event at
/// or after the evaluation point is ever visible, and any internal
/// randomness must be seeded from `seed` (derived from the evaluation
/// point) so identical runs reproduce identical selections.
pub trait Strategy: Send + Sync {
    /// Strategy identifier for logging and configuration.
    fn name(&self) -> &str;

    /// Produce a selection using only the given history prefix.
    fn generate(&self, history: &[Event], seed: u64) -> Result<Selection>;
}

// ---------------------------------------------------------------------------
// Payout model
// ---------------------------------------------------------------------------

/// Abstraction over cost/payout scoring of a frozen selection against a
/// realized event.
pub trait PayoutModel: Send + Sync {
    fn evaluate(&self, event: &Event, selection: &Selection) -> BetOutcome;
}

/// Result of scoring one selection against one event.
#[derive(Debug, Clone, PartialEq)]
pub struct BetOutcome {
    /// Total stake for playing every sub-bet on this event.
    pub cost: Decimal,
    /// Total payout across all qualifying sub-bets.
    pub payout: Decimal,
    /// Best hit-count across sub-bets.
    pub best_hits: u8,
    /// Label of the best-scoring sub-bet (None for an empty selection).
    pub best_label: Option<String>,
}

impl BetOutcome {
    /// Net result: payout minus cost.
    pub fn profit(&self) -> Decimal {
        self.payout - self.cost
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
