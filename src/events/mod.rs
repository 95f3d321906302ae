//! Event sequence handling.
//!
//! `EventLog` wraps the raw draw history in an ordered, duplicate-free,
//! gap-tolerant sequence. The log is read-only to the engine: every run
//! re-reads the full history and derives everything from scratch.

pub mod csv;

use std::collections::BTreeSet;

use crate::types::{Event, TeimosaError};

/// Ordered, deduplicated sequence of events.
///
/// Indexes are strictly increasing but not necessarily contiguous — the
/// upstream feed occasionally skips draw numbers. Positions (offsets into
/// the ordered sequence) are what the walk-forward math operates on;
/// indexes are what campaigns and reports reference.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Build a log from raw events: sorts by index and rejects duplicates.
    pub fn from_events(mut events: Vec<Event>) -> Result<Self, TeimosaError> {
        events.sort_by_key(|e| e.index);

        let mut seen: BTreeSet<u64> = BTreeSet::new();
        for event in &events {
            if !seen.insert(event.index) {
                return Err(TeimosaError::EventLog(format!(
                    "duplicate event index {}",
                    event.index
                )));
            }
        }

        Ok(Self { events })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Full ordered slice of events.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Most recent event, if any.
    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Highest known event index.
    pub fn max_index(&self) -> Option<u64> {
        self.last().map(|e| e.index)
    }

    /// Event with an exact index, if present in the stream.
    pub fn get(&self, index: u64) -> Option<&Event> {
        self.events
            .binary_search_by_key(&index, |e| e.index)
            .ok()
            .map(|pos| &self.events[pos])
    }

    /// Events whose index falls in `[low, high]`, in increasing order.
    /// Skipped indexes simply do not appear.
    pub fn in_index_range(&self, low: u64, high: u64) -> &[Event] {
        let start = self.events.partition_point(|e| e.index < low);
        let end = self.events.partition_point(|e| e.index <= high);
        &self.events[start..end]
    }

    /// The first `count` events — the visible history for a walk-forward
    /// base at position `count`.
    pub fn prefix(&self, count: usize) -> &[Event] {
        &self.events[..count.min(self.events.len())]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PayoutTable;
    use chrono::NaiveDate;

    fn event(index: u64) -> Event {
        Event {
            index,
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            outcome: (1..=15).collect(),
            payouts: PayoutTable::new(),
        }
    }

    #[test]
    fn test_from_events_sorts() {
        let log = EventLog::from_events(vec![event(5), event(3), event(4)]).unwrap();
        let indexes: Vec<u64> = log.events().iter().map(|e| e.index).collect();
        assert_eq!(indexes, vec![3, 4, 5]);
        assert_eq!(log.max_index(), Some(5));
    }

    #[test]
    fn test_from_events_rejects_duplicates() {
        let result = EventLog::from_events(vec![event(3), event(3)]);
        assert!(result.is_err());
        assert!(format!("{}", result.unwrap_err()).contains("duplicate"));
    }

    #[test]
    fn test_get_by_index() {
        let log = EventLog::from_events(vec![event(10), event(12), event(13)]).unwrap();
        assert_eq!(log.get(12).map(|e| e.index), Some(12));
        assert!(log.get(11).is_none());
    }

    #[test]
    fn test_in_index_range_with_gaps() {
        // 11 is missing from the stream
        let log =
            EventLog::from_events(vec![event(10), event(12), event(13), event(15)]).unwrap();
        let window: Vec<u64> = log.in_index_range(11, 13).iter().map(|e| e.index).collect();
        assert_eq!(window, vec![12, 13]);

        let empty: Vec<u64> = log.in_index_range(16, 20).iter().map(|e| e.index).collect();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_prefix_clamps() {
        let log = EventLog::from_events(vec![event(1), event(2)]).unwrap();
        assert_eq!(log.prefix(1).len(), 1);
        assert_eq!(log.prefix(10).len(), 2);
        assert!(log.prefix(0).is_empty());
    }

    #[test]
    fn test_empty_log() {
        let log = EventLog::from_events(vec![]).unwrap();
        assert!(log.is_empty());
        assert!(log.last().is_none());
        assert!(log.max_index().is_none());
    }
}
