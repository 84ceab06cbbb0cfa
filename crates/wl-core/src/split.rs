//! Sequence splitting.
//!
//! Breaks the flat branch log into uninterrupted working spans. A span ends
//! at a pause marker or when the UTC calendar date changes between two
//! consecutive samples.

use crate::entry::{BranchLog, LogEntry};

/// Splits `entries` into non-empty sequences of branch samples.
///
/// Entries must already be in chronological order; nothing is re-sorted.
/// Pause markers never produce empty sequences, so leading, trailing and
/// repeated markers are harmless.
pub fn split_sequences(entries: &[LogEntry]) -> Vec<Vec<BranchLog>> {
    let mut sequences: Vec<Vec<BranchLog>> = Vec::new();
    let mut current: Vec<BranchLog> = Vec::new();

    for entry in entries {
        match entry {
            LogEntry::BranchLog(log) => {
                let crosses_day = current.last().is_some_and(|last| last.day() != log.day());
                if crosses_day {
                    sequences.push(std::mem::take(&mut current));
                }
                current.push(log.clone());
            }
            LogEntry::PauseMarker(_) => {
                if !current.is_empty() {
                    sequences.push(std::mem::take(&mut current));
                }
            }
        }
    }

    if !current.is_empty() {
        sequences.push(current);
    }

    tracing::debug!(
        entries = entries.len(),
        sequences = sequences.len(),
        "split log into sequences"
    );

    sequences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IssueKey;

    fn sample(branch: &str, ts: &str) -> LogEntry {
        LogEntry::branch(IssueKey::new(branch).unwrap(), ts.parse().unwrap())
    }

    fn pause(ts: &str) -> LogEntry {
        LogEntry::pause(ts.parse().unwrap())
    }

    fn branches(sequences: &[Vec<BranchLog>]) -> Vec<Vec<&str>> {
        sequences
            .iter()
            .map(|seq| seq.iter().map(|log| log.branch.as_str()).collect())
            .collect()
    }

    #[test]
    fn empty_log_yields_no_sequences() {
        assert!(split_sequences(&[]).is_empty());
    }

    #[test]
    fn pause_marker_ends_sequence() {
        let entries = vec![
            sample("JIR-1", "2025-05-18T09:00:00Z"),
            sample("JIR-1", "2025-05-18T09:05:00Z"),
            pause("2025-05-18T09:07:00Z"),
            sample("JIR-2", "2025-05-18T10:00:00Z"),
        ];

        let sequences = split_sequences(&entries);
        assert_eq!(branches(&sequences), vec![vec!["JIR-1", "JIR-1"], vec!["JIR-2"]]);
    }

    #[test]
    fn repeated_and_leading_pauses_do_not_emit_empty_sequences() {
        let entries = vec![
            pause("2025-05-18T08:00:00Z"),
            pause("2025-05-18T08:01:00Z"),
            sample("JIR-1", "2025-05-18T09:00:00Z"),
            pause("2025-05-18T09:01:00Z"),
            pause("2025-05-18T09:02:00Z"),
            sample("JIR-2", "2025-05-18T10:00:00Z"),
            pause("2025-05-18T10:01:00Z"),
        ];

        let sequences = split_sequences(&entries);
        assert_eq!(sequences.len(), 2);
        assert!(sequences.iter().all(|seq| !seq.is_empty()));
    }

    #[test]
    fn day_change_splits_without_pause() {
        let entries = vec![
            sample("GIT-1", "2025-05-24T23:55:00Z"),
            sample("GIT-1", "2025-05-25T09:00:00Z"),
        ];

        let sequences = split_sequences(&entries);
        assert_eq!(branches(&sequences), vec![vec!["GIT-1"], vec!["GIT-1"]]);
    }

    #[test]
    fn sequences_keep_input_order() {
        let entries = vec![
            sample("A", "2025-05-18T09:00:00Z"),
            pause("2025-05-18T09:01:00Z"),
            sample("B", "2025-05-18T10:00:00Z"),
            sample("C", "2025-05-19T10:00:00Z"),
        ];

        let sequences = split_sequences(&entries);
        assert_eq!(branches(&sequences), vec![vec!["A"], vec!["B"], vec!["C"]]);
    }
}
