//! Raw observations read from the branch log.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::IssueKey;

/// One line of the branch log.
///
/// Serialized with a `type` discriminator, one JSON object per line:
///
/// ```json
/// {"type":"branch_log","branch":"PRJ-1","timestamp":"2025-05-18T09:00:00Z"}
/// {"type":"pause_marker","timestamp":"2025-05-18T12:00:00Z"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEntry {
    /// The named branch was checked out at `timestamp`.
    #[serde(alias = "BranchLog")]
    BranchLog(BranchLog),
    /// Work stopped at `timestamp`.
    #[serde(alias = "PauseMarker")]
    PauseMarker(PauseMarker),
}

/// A single branch sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchLog {
    /// Issue key or raw branch name that was active.
    pub branch: IssueKey,
    /// When the sample was taken.
    pub timestamp: DateTime<Utc>,
}

/// An explicit end of a work sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseMarker {
    /// When work stopped.
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Shorthand for a branch sample.
    pub const fn branch(branch: IssueKey, timestamp: DateTime<Utc>) -> Self {
        Self::BranchLog(BranchLog { branch, timestamp })
    }

    /// Shorthand for a pause marker.
    pub const fn pause(timestamp: DateTime<Utc>) -> Self {
        Self::PauseMarker(PauseMarker { timestamp })
    }

    /// Returns the instant of the observation, whatever its kind.
    pub const fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::BranchLog(log) => log.timestamp,
            Self::PauseMarker(pause) => pause.timestamp,
        }
    }

    /// Returns the branch sample, if this entry is one.
    pub const fn as_branch_log(&self) -> Option<&BranchLog> {
        match self {
            Self::BranchLog(log) => Some(log),
            Self::PauseMarker(_) => None,
        }
    }

    pub const fn is_pause(&self) -> bool {
        matches!(self, Self::PauseMarker(_))
    }
}

impl BranchLog {
    /// UTC calendar date of the sample.
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}
