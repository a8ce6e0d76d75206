//! Tracks which scheduled irrigation slots already fired, one shot per
//! hour per calendar date.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

/// Canonical date key used by the tracker ("%Y-%m-%d").
pub fn date_key(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Per-hour record of dates on which irrigation already ran. Marking a slot
/// prunes entries from other dates, so the map never outgrows one date per
/// hour.
#[derive(Debug, Default)]
pub struct ScheduleTracker {
    fired: HashMap<u8, HashSet<String>>,
}

impl ScheduleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_fired_today(&self, hour: u8, date_key: &str) -> bool {
        self.fired
            .get(&hour)
            .is_some_and(|days| days.contains(date_key))
    }

    pub fn mark_fired(&mut self, hour: u8, date_key: &str) {
        // Day-boundary retention: drop records from any other date.
        for days in self.fired.values_mut() {
            days.retain(|d| d == date_key);
        }
        self.fired.retain(|_, days| !days.is_empty());
        self.fired
            .entry(hour)
            .or_default()
            .insert(date_key.to_string());
    }

    /// Number of (hour, date) records currently held.
    pub fn record_count(&self) -> usize {
        self.fired.values().map(HashSet::len).sum()
    }
}
