//! Majority-vote chunking of branch samples into worklog blocks.

use std::num::NonZeroUsize;

use chrono::Duration;

use crate::block::WorklogBlock;
use crate::entry::BranchLog;
use crate::merge::MergePolicy;
use crate::types::IssueKey;

/// Configuration for turning samples into blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationConfig {
    /// Samples voted into one block. Default: 3.
    pub chunk_size: NonZeroUsize,

    /// Time represented by a single sample. Default: 5 minutes.
    pub sample_interval: Duration,

    /// How adjacent blocks with the same key are coalesced.
    pub merge_policy: MergePolicy,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            chunk_size: NonZeroUsize::new(3).unwrap_or(NonZeroUsize::MIN),
            sample_interval: Duration::minutes(5),
            merge_policy: MergePolicy::default(),
        }
    }
}

/// Aggregates one sequence into blocks, one per chunk.
///
/// Full chunks are attributed to the branch seen most often, ties going to
/// whichever branch appears first in the chunk. A trailing partial chunk is
/// attributed to its first sample. Each block starts at its chunk's first
/// sample and lasts one sample interval per sample.
pub fn aggregate_sequence(sequence: &[BranchLog], config: &AggregationConfig) -> Vec<WorklogBlock> {
    let chunk_size = config.chunk_size.get();

    sequence
        .chunks(chunk_size)
        .map(|chunk| {
            let first = &chunk[0];
            let issue_key = if chunk.len() == chunk_size {
                majority_branch(chunk)
            } else {
                &first.branch
            };

            let samples = i32::try_from(chunk.len()).unwrap_or(i32::MAX);
            WorklogBlock {
                issue_key: issue_key.clone(),
                start: first.timestamp,
                duration_seconds: (config.sample_interval * samples).num_seconds(),
            }
        })
        .collect()
}

/// Most frequent branch in a non-empty chunk, earliest first on ties.
fn majority_branch(chunk: &[BranchLog]) -> &IssueKey {
    let mut counts: Vec<(&IssueKey, usize)> = Vec::with_capacity(chunk.len());
    for log in chunk {
        match counts.iter_mut().find(|(branch, _)| *branch == &log.branch) {
            Some((_, count)) => *count += 1,
            None => counts.push((&log.branch, 1)),
        }
    }

    let mut best = counts[0];
    for candidate in counts.into_iter().skip(1) {
        if candidate.1 > best.1 {
            best = candidate;
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(samples: &[(&str, &str)]) -> Vec<BranchLog> {
        samples
            .iter()
            .map(|(branch, ts)| BranchLog {
                branch: IssueKey::new(*branch).unwrap(),
                timestamp: ts.parse().unwrap(),
            })
            .collect()
    }

    fn summary(blocks: &[WorklogBlock]) -> Vec<(&str, i64)> {
        blocks
            .iter()
            .map(|block| (block.issue_key.as_str(), block.duration_seconds))
            .collect()
    }

    #[test]
    fn full_chunk_uses_majority() {
        let seq = sequence(&[
            ("A", "2025-05-18T09:00:00Z"),
            ("B", "2025-05-18T09:05:00Z"),
            ("B", "2025-05-18T09:10:00Z"),
        ]);

        let blocks = aggregate_sequence(&seq, &AggregationConfig::default());
        assert_eq!(summary(&blocks), vec![("B", 900)]);
        assert_eq!(blocks[0].start, seq[0].timestamp);
    }

    #[test]
    fn full_chunk_tie_goes_to_first_seen() {
        let seq = sequence(&[
            ("A", "2025-05-18T09:00:00Z"),
            ("B", "2025-05-18T09:05:00Z"),
            ("C", "2025-05-18T09:10:00Z"),
        ]);

        let blocks = aggregate_sequence(&seq, &AggregationConfig::default());
        assert_eq!(summary(&blocks), vec![("A", 900)]);
    }

    #[test]
    fn partial_chunk_uses_first_sample() {
        let seq = sequence(&[
            ("A", "2025-05-18T09:00:00Z"),
            ("A", "2025-05-18T09:05:00Z"),
            ("A", "2025-05-18T09:10:00Z"),
            ("B", "2025-05-18T09:15:00Z"),
            ("C", "2025-05-18T09:20:00Z"),
        ]);

        let blocks = aggregate_sequence(&seq, &AggregationConfig::default());
        assert_eq!(summary(&blocks), vec![("A", 900), ("B", 600)]);
        assert_eq!(blocks[1].start, seq[3].timestamp);
    }

    #[test]
    fn single_sample_yields_one_interval() {
        let seq = sequence(&[("HOTFIX", "2025-05-18T09:00:00Z")]);

        let blocks = aggregate_sequence(&seq, &AggregationConfig::default());
        assert_eq!(summary(&blocks), vec![("HOTFIX", 300)]);
    }

    #[test]
    fn durations_sum_to_sample_count_times_interval() {
        let seq = sequence(&[
            ("SUP-3", "2025-05-18T10:00:00Z"),
            ("SUP-3", "2025-05-18T10:05:00Z"),
            ("X", "2025-05-18T10:10:00Z"),
            ("Y", "2025-05-18T10:15:00Z"),
            ("SUP-3", "2025-05-18T10:20:00Z"),
            ("Y", "2025-05-18T10:25:00Z"),
            ("SUP-3", "2025-05-18T10:30:00Z"),
        ]);

        let blocks = aggregate_sequence(&seq, &AggregationConfig::default());
        assert_eq!(blocks.len(), 3);
        assert_eq!(crate::block::total_seconds(&blocks), 7 * 300);
    }

    #[test]
    fn honours_custom_chunk_size_and_interval() {
        let config = AggregationConfig {
            chunk_size: NonZeroUsize::new(2).unwrap(),
            sample_interval: Duration::minutes(1),
            ..AggregationConfig::default()
        };
        let seq = sequence(&[
            ("A", "2025-05-18T09:00:00Z"),
            ("B", "2025-05-18T09:01:00Z"),
            ("B", "2025-05-18T09:02:00Z"),
        ]);

        let blocks = aggregate_sequence(&seq, &config);
        assert_eq!(summary(&blocks), vec![("A", 120), ("B", 60)]);
    }
}
