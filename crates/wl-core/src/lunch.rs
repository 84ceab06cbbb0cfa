//! Lunch break enforcement.
//!
//! Guarantees that every day of the log carries a pause inside a fixed
//! midday window. Samples that fall inside the window are dropped and the
//! coverage right up to the window edges is preserved with synthesized
//! samples.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::entry::LogEntry;
use crate::types::ValidationError;

/// Minutes between the window edges and the synthesized entries.
pub const LUNCH_MARGIN_MINUTES: i64 = 5;

/// Wall-clock lunch window `[start, end)` in a given timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LunchWindow {
    start: NaiveTime,
    end: NaiveTime,
    timezone: Tz,
}

impl Default for LunchWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(10, 30, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(11, 30, 0).unwrap_or(NaiveTime::MIN),
            timezone: Tz::UTC,
        }
    }
}

impl LunchWindow {
    /// Creates a window; `start` must be strictly before `end`.
    pub fn new(start: NaiveTime, end: NaiveTime, timezone: Tz) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidLunchWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self {
            start,
            end,
            timezone,
        })
    }

    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    pub const fn end(&self) -> NaiveTime {
        self.end
    }

    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Whether `instant` falls inside the window on its local day.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let local = instant.with_timezone(&self.timezone).time();
        local >= self.start && local < self.end
    }

    fn local_day(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    /// The window's edges as instants on `date`.
    ///
    /// `None` when an edge does not exist on that day (DST gap).
    fn bounds_on(&self, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self
            .timezone
            .from_local_datetime(&date.and_time(self.start))
            .earliest()?;
        let end = self
            .timezone
            .from_local_datetime(&date.and_time(self.end))
            .earliest()?;
        Some((start.with_timezone(&Utc), end.with_timezone(&Utc)))
    }
}

/// Ensures each day of `entries` has a pause inside `window`.
///
/// Days that already contain a pause inside the window are returned
/// untouched. Other days lose their samples inside the window, gain a
/// sample at `start - 5min` (branch of the last earlier sample) and one at
/// `end` (branch of the first later sample) when such samples exist, and a
/// pause at `start + 5min`. Days are emitted in order of first appearance.
pub fn enforce_lunch_break(entries: &[LogEntry], window: &LunchWindow) -> Vec<LogEntry> {
    group_by_local_day(entries, window)
        .into_iter()
        .flat_map(|(date, day)| enforce_on_day(date, day, window))
        .collect()
}

fn group_by_local_day(entries: &[LogEntry], window: &LunchWindow) -> Vec<(NaiveDate, Vec<LogEntry>)> {
    let mut groups: Vec<(NaiveDate, Vec<LogEntry>)> = Vec::new();
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();

    for entry in entries {
        let date = window.local_day(entry.timestamp());
        let slot = *index.entry(date).or_insert_with(|| {
            groups.push((date, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(entry.clone());
    }

    groups
}

fn enforce_on_day(date: NaiveDate, day: Vec<LogEntry>, window: &LunchWindow) -> Vec<LogEntry> {
    let has_lunch = day
        .iter()
        .any(|entry| entry.is_pause() && window.contains(entry.timestamp()));
    if has_lunch {
        return day;
    }

    let Some((lunch_start, lunch_end)) = window.bounds_on(date) else {
        tracing::warn!(%date, "lunch window does not exist on this day, leaving it untouched");
        return day;
    };

    let mut result: Vec<LogEntry> = day
        .into_iter()
        .filter(|entry| entry.is_pause() || !window.contains(entry.timestamp()))
        .collect();

    let last_before = result
        .iter()
        .filter_map(LogEntry::as_branch_log)
        .filter(|log| log.timestamp < lunch_start)
        .max_by_key(|log| log.timestamp)
        .map(|log| log.branch.clone());
    let first_after = result
        .iter()
        .filter_map(LogEntry::as_branch_log)
        .filter(|log| log.timestamp >= lunch_end)
        .min_by_key(|log| log.timestamp)
        .map(|log| log.branch.clone());

    let kept = result.len();
    let margin = Duration::minutes(LUNCH_MARGIN_MINUTES);
    if let Some(branch) = last_before {
        result.push(LogEntry::branch(branch, lunch_start - margin));
    }
    if let Some(branch) = first_after {
        result.push(LogEntry::branch(branch, lunch_end));
    }
    result.push(LogEntry::pause(lunch_start + margin));
    result.sort_by_key(LogEntry::timestamp);

    tracing::debug!(
        %date,
        kept,
        total = result.len(),
        "inserted lunch break"
    );

    result
}
