//! Worklog blocks - the unit of billable time.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{IssueKey, ValidationError};

/// A contiguous span of work (or a meeting) attributed to one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorklogBlock {
    /// Issue the time is booked against.
    pub issue_key: IssueKey,
    /// When the span starts.
    pub start: DateTime<Utc>,
    /// Length of the span in seconds. Always positive.
    pub duration_seconds: i64,
}

impl WorklogBlock {
    /// Creates a block, rejecting empty spans.
    pub fn new(
        issue_key: IssueKey,
        start: DateTime<Utc>,
        duration_seconds: i64,
    ) -> Result<Self, ValidationError> {
        if duration_seconds <= 0 {
            return Err(ValidationError::NonPositiveDuration {
                seconds: duration_seconds,
            });
        }
        Ok(Self {
            issue_key,
            start,
            duration_seconds,
        })
    }

    /// Creates a block covering `[start, end)`.
    pub fn between(
        issue_key: IssueKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Self::new(issue_key, start, (end - start).num_seconds())
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_seconds)
    }

    /// Exclusive end of the span.
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration()
    }

    /// UTC calendar date the block starts on.
    pub fn day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Copy of this block restricted to `[start, end)`.
    ///
    /// Callers guarantee `start < end`.
    pub(crate) fn with_span(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start < end, "clipped block must keep a positive span");
        Self {
            issue_key: self.issue_key.clone(),
            start,
            duration_seconds: (end - start).num_seconds(),
        }
    }

    /// The parts of this block not covered by any of `covered`.
    ///
    /// Parts shorter than a second are dropped. Returns the block itself when
    /// nothing overlaps it and an empty list when it is fully covered.
    pub fn without_covered(&self, covered: &[Self]) -> Vec<Self> {
        let mut spans: Vec<(DateTime<Utc>, DateTime<Utc>)> =
            covered.iter().map(|other| (other.start, other.end())).collect();
        spans.sort_by_key(|span| span.0);

        let end = self.end();
        let mut cursor = self.start;
        let mut parts = Vec::new();
        for (covered_start, covered_end) in spans {
            if covered_end <= cursor || covered_start >= end {
                continue;
            }
            if (covered_start - cursor).num_seconds() > 0 {
                parts.push(self.with_span(cursor, covered_start));
            }
            cursor = cursor.max(covered_end);
        }
        if (end - cursor).num_seconds() > 0 {
            parts.push(self.with_span(cursor, end));
        }
        parts
    }
}

/// Sum of block durations in seconds.
pub fn total_seconds(blocks: &[WorklogBlock]) -> i64 {
    blocks.iter().map(|block| block.duration_seconds).sum()
}

/// Returns true when `blocks` are sorted by start and no two overlap.
pub fn is_sorted_without_overlap(blocks: &[WorklogBlock]) -> bool {
    blocks
        .windows(2)
        .all(|pair| pair[0].start <= pair[1].start && pair[0].end() <= pair[1].start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn key(s: &str) -> IssueKey {
        IssueKey::new(s).unwrap()
    }

    #[test]
    fn rejects_non_positive_duration() {
        let start = ts("2025-05-18T09:00:00Z");
        assert!(matches!(
            WorklogBlock::new(key("PRJ-1"), start, 0),
            Err(ValidationError::NonPositiveDuration { seconds: 0 })
        ));
        assert!(WorklogBlock::new(key("PRJ-1"), start, -60).is_err());
        assert!(WorklogBlock::between(key("PRJ-1"), start, start).is_err());
    }

    #[test]
    fn end_is_start_plus_duration() {
        let block = WorklogBlock::new(key("PRJ-1"), ts("2025-05-18T09:00:00Z"), 900).unwrap();
        assert_eq!(block.end(), ts("2025-05-18T09:15:00Z"));
        assert_eq!(block.day(), NaiveDate::from_ymd_opt(2025, 5, 18).unwrap());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let block = WorklogBlock::new(key("PRJ-1"), ts("2025-05-18T09:00:00Z"), 900).unwrap();
        insta::assert_snapshot!(
            serde_json::to_string(&block).unwrap(),
            @r#"{"issueKey":"PRJ-1","start":"2025-05-18T09:00:00Z","durationSeconds":900}"#
        );
    }

    #[test]
    fn without_covered_keeps_the_uncovered_tail() {
        let grown = WorklogBlock::new(key("PRJ-1"), ts("2025-05-18T09:00:00Z"), 1200).unwrap();
        let sent = WorklogBlock::new(key("PRJ-1"), ts("2025-05-18T09:00:00Z"), 900).unwrap();

        let parts = grown.without_covered(&[sent]);
        assert_eq!(
            parts,
            vec![WorklogBlock::new(key("PRJ-1"), ts("2025-05-18T09:15:00Z"), 300).unwrap()]
        );
    }

    #[test]
    fn without_covered_splits_around_holes() {
        let block = WorklogBlock::new(key("A"), ts("2025-05-18T09:00:00Z"), 3600).unwrap();
        let covered = vec![
            WorklogBlock::new(key("A"), ts("2025-05-18T09:40:00Z"), 600).unwrap(),
            WorklogBlock::new(key("A"), ts("2025-05-18T08:50:00Z"), 900).unwrap(),
        ];

        let parts: Vec<_> = block
            .without_covered(&covered)
            .iter()
            .map(|part| (part.start, part.duration_seconds))
            .collect();
        assert_eq!(
            parts,
            vec![
                (ts("2025-05-18T09:05:00Z"), 2100),
                (ts("2025-05-18T09:50:00Z"), 600),
            ]
        );
    }

    #[test]
    fn without_covered_edge_cases() {
        let block = WorklogBlock::new(key("A"), ts("2025-05-18T09:00:00Z"), 900).unwrap();
        assert_eq!(block.without_covered(&[]), vec![block.clone()]);
        assert!(block.without_covered(&[block.clone()]).is_empty());

        let touching = WorklogBlock::new(key("A"), ts("2025-05-18T09:15:00Z"), 300).unwrap();
        assert_eq!(block.without_covered(&[touching]), vec![block]);
    }

    #[test]
    fn overlap_check_detects_intersections() {
        let a = WorklogBlock::new(key("A"), ts("2025-05-18T09:00:00Z"), 900).unwrap();
        let b = WorklogBlock::new(key("B"), ts("2025-05-18T09:15:00Z"), 900).unwrap();
        let c = WorklogBlock::new(key("C"), ts("2025-05-18T09:20:00Z"), 900).unwrap();

        assert!(is_sorted_without_overlap(&[a.clone(), b.clone()]));
        assert!(!is_sorted_without_overlap(&[a.clone(), c]));
        assert!(!is_sorted_without_overlap(&[b, a]));
    }
}
