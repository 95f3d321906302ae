//! Four-game group strategy.
//!
//! Builds four overlapping 15-number games from three statistical groups of
//! the history: the most delayed numbers (B), the most frequent overall
//! (C), and the most absent over a recent window (D), anchored by a small
//! core of recently hot numbers (A). The games are the unions A∪B, A∪C,
//! A∪D and (B∪C∪D)∖A, padded or trimmed to the fixed game size.
//!
//! The construction is fully deterministic: ranking ties resolve by number
//! ascending, so the `seed` parameter of the trait is not consumed here.

use anyhow::Result;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::Strategy;
use crate::types::{Event, Selection, TeimosaError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for the group construction.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    /// Highest number in the universe (numbers run 1..=universe_max).
    pub universe_max: u8,
    /// Numbers per game.
    pub game_size: usize,
    /// Size of the B/C/D statistical groups.
    pub group_size: usize,
    /// Size of the hot core group A.
    pub core_size: usize,
    /// How many recent events feed the hot-core and absence rankings.
    pub recent_window: usize,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            universe_max: 25,
            game_size: 15,
            group_size: 10,
            core_size: 5,
            recent_window: 40,
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// The shipped reference strategy: four games from delay/frequency/absence
/// groups.
pub struct QuadGroupStrategy {
    config: GroupConfig,
}

impl QuadGroupStrategy {
    pub fn new(config: GroupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Overall appearance count per number.
    fn frequency(&self, history: &[Event]) -> BTreeMap<u8, usize> {
        let mut counts: BTreeMap<u8, usize> =
            (1..=self.config.universe_max).map(|n| (n, 0)).collect();
        for event in history {
            for n in &event.outcome {
                if let Some(count) = counts.get_mut(n) {
                    *count += 1;
                }
            }
        }
        counts
    }

    /// Events elapsed since each number last appeared. Numbers never drawn
    /// score the full history length.
    fn delay(&self, history: &[Event]) -> BTreeMap<u8, usize> {
        let len = history.len();
        let mut delays: BTreeMap<u8, usize> =
            (1..=self.config.universe_max).map(|n| (n, len)).collect();
        for (position, event) in history.iter().enumerate() {
            for n in &event.outcome {
                if let Some(delay) = delays.get_mut(n) {
                    *delay = len - 1 - position;
                }
            }
        }
        delays
    }

    /// Top `count` numbers by score descending, ties by number ascending.
    fn top_by_desc(scores: &BTreeMap<u8, usize>, count: usize) -> BTreeSet<u8> {
        let mut ranked: Vec<(u8, usize)> = scores.iter().map(|(n, s)| (*n, *s)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().take(count).map(|(n, _)| n).collect()
    }

    /// Bottom `count` numbers by score ascending, ties by number ascending.
    fn bottom_by_asc(scores: &BTreeMap<u8, usize>, count: usize) -> BTreeSet<u8> {
        let mut ranked: Vec<(u8, usize)> = scores.iter().map(|(n, s)| (*n, *s)).collect();
        ranked.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().take(count).map(|(n, _)| n).collect()
    }

    /// Force a candidate set to exactly `game_size` numbers: trim the
    /// largest extras, or pad with the lowest absent universe numbers.
    fn fit_to_size(&self, mut game: BTreeSet<u8>) -> BTreeSet<u8> {
        while game.len() > self.config.game_size {
            let largest = *game.iter().next_back().unwrap_or(&0);
            game.remove(&largest);
        }
        let mut candidate = 1u8;
        while game.len() < self.config.game_size && candidate <= self.config.universe_max {
            game.insert(candidate);
            candidate += 1;
        }
        game
    }
}

impl Strategy for QuadGroupStrategy {
    fn name(&self) -> &str {
        "quad-group"
    }

    fn generate(&self, history: &[Event], _seed: u64) -> Result<Selection> {
        if history.is_empty() {
            return Err(TeimosaError::Strategy {
                strategy: self.name().to_string(),
                message: "empty history".to_string(),
            }
            .into());
        }

        let recent_start = history.len().saturating_sub(self.config.recent_window);
        let recent = &history[recent_start..];

        let overall_freq = self.frequency(history);
        let recent_freq = self.frequency(recent);
        let delays = self.delay(history);

        // A: hot core over the recent window
        let a = Self::top_by_desc(&recent_freq, self.config.core_size);
        // B: most delayed overall
        let b = Self::top_by_desc(&delays, self.config.group_size);
        // C: most frequent overall
        let c = Self::top_by_desc(&overall_freq, self.config.group_size);
        // D: most absent over the recent window
        let d = Self::bottom_by_asc(&recent_freq, self.config.group_size);

        debug!(
            a = %crate::types::fmt_numbers(&a),
            b = %crate::types::fmt_numbers(&b),
            c = %crate::types::fmt_numbers(&c),
            d = %crate::types::fmt_numbers(&d),
            history_len = history.len(),
            "Group rankings computed"
        );

        let mut selection = Selection::new();
        selection.insert("A_B", self.fit_to_size(&a | &b));
        selection.insert("A_C", self.fit_to_size(&a | &c));
        selection.insert("A_D", self.fit_to_size(&a | &d));
        selection.insert("B_C_D", self.fit_to_size(&(&(&b | &c) | &d) - &a));

        Ok(selection)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
