//! Draw results file parsing.
//!
//! The official results export is re-published as a delimited text file with
//! one draw per line: draw number, date, the fifteen drawn numbers, and
//! optionally the five prize tiers (11 through 15 hits) in force for that
//! draw. Header lines and malformed rows are skipped, matching how the
//! upstream export mixes banner rows into the data.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::types::{Event, PayoutTable};

/// Numbers drawn per event.
pub const DRAW_SIZE: usize = 15;

/// Prize tiers carried in the results file, lowest first.
pub const PAYING_TIERS: [u8; 5] = [11, 12, 13, 14, 15];

/// Parse the results text. Rows that do not yield a complete draw are
/// skipped with a warning rather than failing the whole file.
pub fn parse_events(text: &str) -> Vec<Event> {
    let mut events = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(event) => events.push(event),
            None => {
                // Header and banner rows land here on every file; only log
                // rows that at least look numeric.
                if line.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                    warn!(line = line_no + 1, "Skipping malformed results row");
                } else {
                    debug!(line = line_no + 1, "Skipping non-data row");
                }
            }
        }
    }

    events
}

fn parse_line(line: &str) -> Option<Event> {
    // Semicolon wins when present so pt-BR money values ("1.500,00") keep
    // their comma intact; plain comma-separated files carry ISO decimals.
    let separator = if line.contains(';') { ';' } else { ',' };
    let fields: Vec<&str> = line
        .split(separator)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();

    // index + date + 15 numbers at minimum
    if fields.len() < 2 + DRAW_SIZE {
        return None;
    }

    let index: u64 = fields[0].parse().ok()?;
    let date = parse_date(fields[1])?;

    let mut outcome: BTreeSet<u8> = BTreeSet::new();
    for field in &fields[2..2 + DRAW_SIZE] {
        outcome.insert(field.parse().ok()?);
    }
    // duplicate numbers collapse in the set; such a row is corrupt
    if outcome.len() != DRAW_SIZE {
        return None;
    }

    let mut payouts = Vec::new();
    for (tier, field) in PAYING_TIERS.iter().zip(fields.iter().skip(2 + DRAW_SIZE)) {
        let value: Decimal = parse_money(field)?;
        payouts.push((*tier, value));
    }

    Some(Event {
        index,
        date,
        outcome,
        payouts: PayoutTable::from_pairs(payouts),
    })
}

/// Accepts ISO (`2026-01-15`) and the legacy export format (`15/01/2026`).
fn parse_date(field: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(field, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(field, "%d/%m/%Y"))
        .ok()
}

/// Accepts plain decimals and the pt-BR money format (`1.234,56`).
fn parse_money(field: &str) -> Option<Decimal> {
    let cleaned = field.trim_start_matches("R$").trim();
    if let Ok(value) = cleaned.parse::<Decimal>() {
        return Some(value);
    }
    // pt-BR: thousands '.' and decimal ','
    let normalized = cleaned.replace('.', "").replace(',', ".");
    normalized.parse::<Decimal>().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
