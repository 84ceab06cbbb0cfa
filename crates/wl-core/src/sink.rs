//! Destination of aggregated blocks.

use serde::Serialize;

use crate::block::WorklogBlock;

/// Outcome counts of one submission run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SendSummary {
    /// Blocks accepted by the destination.
    pub submitted: usize,
    /// Blocks not sent because they were already submitted.
    pub skipped: usize,
    /// Blocks rejected by the destination.
    pub failed: usize,
}

impl SendSummary {
    /// True when no block failed.
    pub const fn is_complete(&self) -> bool {
        self.failed == 0
    }

    pub const fn total(&self) -> usize {
        self.submitted + self.skipped + self.failed
    }
}

/// Receives the final, remapped blocks.
///
/// Per-block failures are counted in the summary; `Err` is reserved for
/// failures that abort the whole run, such as rejected credentials.
pub trait WorklogSink {
    type Error;

    fn send_all(&mut self, blocks: &[WorklogBlock]) -> Result<SendSummary, Self::Error>;
}
