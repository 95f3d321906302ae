//! Tiered payout model with per-event ticket-cost inference.
//!
//! Payouts come straight from the event's own tariff table. Ticket cost is
//! inferred per event: the 11-hit prize is by rule exactly twice the ticket
//! price, so when that tier is present the cost follows from it. Otherwise
//! the dated tariff change applies, then the configured fallback.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use super::{BetOutcome, PayoutModel};
use crate::types::{Event, Selection};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for cost inference and payout qualification.
#[derive(Debug, Clone, Deserialize)]
pub struct PayoutConfig {
    /// Fallback ticket cost when nothing can be inferred.
    pub ticket_cost: Decimal,
    /// Lowest hit-count that can pay anything.
    pub min_paying_hits: u8,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            ticket_cost: dec!(3.00),
            min_paying_hits: 11,
        }
    }
}

/// Official tariff change: tickets cost 3.00 up to 2025-07-09 and 3.50 from
/// 2025-07-10 on.
const TARIFF_CHANGE_DATE: (i32, u32, u32) = (2025, 7, 10);
const TICKET_COST_BEFORE: Decimal = dec!(3.00);
const TICKET_COST_AFTER: Decimal = dec!(3.50);

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// The shipped payout model: sparse tier lookup plus inferred ticket cost.
pub struct TieredPayoutModel {
    config: PayoutConfig,
}

impl TieredPayoutModel {
    pub fn new(config: PayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PayoutConfig {
        &self.config
    }

    /// Ticket cost in force for one event.
    ///
    /// Priority: half the 11-hit prize when that tier is present, then the
    /// dated tariff change, then the configured fallback.
    pub fn ticket_cost(&self, event: &Event) -> Decimal {
        let prize11 = event.payouts.payout_for(self.config.min_paying_hits);
        if prize11 > Decimal::ZERO {
            return (prize11 / dec!(2)).round_dp(2);
        }

        let (y, m, d) = TARIFF_CHANGE_DATE;
        match NaiveDate::from_ymd_opt(y, m, d) {
            Some(change) if event.date >= change => TICKET_COST_AFTER,
            Some(_) => TICKET_COST_BEFORE,
            None => self.config.ticket_cost,
        }
    }
}

impl PayoutModel for TieredPayoutModel {
    fn evaluate(&self, event: &Event, selection: &Selection) -> BetOutcome {
        let ticket = self.ticket_cost(event);
        let cost = ticket * Decimal::from(selection.len() as u64);

        let mut payout = Decimal::ZERO;
        let mut best_hits = 0u8;
        let mut best_label: Option<String> = None;

        for (label, numbers) in selection.iter() {
            let hits = event.hits(numbers);
            if hits >= self.config.min_paying_hits {
                payout += event.payouts.payout_for(hits);
            }
            if best_label.is_none() || hits > best_hits {
                best_hits = hits;
                best_label = Some(label.clone());
            }
        }

        BetOutcome {
            cost,
            payout,
            best_hits,
            best_label,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
