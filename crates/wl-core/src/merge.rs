//! Coalescing of adjacent blocks that share an issue key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::block::WorklogBlock;
use crate::types::ValidationError;

/// When two neighbouring blocks with the same key count as adjacent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// The next block must start exactly where the previous one ends.
    #[default]
    Contiguous,
    /// Any two consecutive blocks in the list, whatever the gap between them.
    ListAdjacent,
}

impl MergePolicy {
    /// String representation used in configuration files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Contiguous => "contiguous",
            Self::ListAdjacent => "list_adjacent",
        }
    }

    fn joins(self, previous: &WorklogBlock, next: &WorklogBlock) -> bool {
        if previous.issue_key != next.issue_key {
            return false;
        }
        match self {
            Self::Contiguous => previous.end() == next.start,
            Self::ListAdjacent => true,
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MergePolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contiguous" => Ok(Self::Contiguous),
            "list_adjacent" => Ok(Self::ListAdjacent),
            _ => Err(ValidationError::InvalidMergePolicy {
                value: s.to_string(),
            }),
        }
    }
}

/// Merges runs of adjacent same-key blocks into single blocks.
///
/// A merged block keeps the start of the first block of the run and the sum
/// of the run's durations. Blocks that are not adjacent under `policy` are
/// never merged, even if they share a key.
pub fn merge_consecutive_blocks(blocks: &[WorklogBlock], policy: MergePolicy) -> Vec<WorklogBlock> {
    let merged = blocks.iter().fold(Vec::<WorklogBlock>::new(), |mut acc, block| {
        match acc.last_mut() {
            Some(last) if policy.joins(last, block) => {
                last.duration_seconds += block.duration_seconds;
            }
            _ => acc.push(block.clone()),
        }
        acc
    });

    tracing::debug!(
        before = blocks.len(),
        after = merged.len(),
        policy = %policy,
        "merged consecutive blocks"
    );

    merged
}
