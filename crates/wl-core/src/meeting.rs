//! Meeting overlap resolution.
//!
//! Meetings take precedence over tracked work: any work block intersecting a
//! meeting is clipped, split or dropped, and the meeting itself becomes a
//! block.

use chrono::{DateTime, Utc};

use crate::block::WorklogBlock;

/// How a work block relates to a meeting interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// The block lies entirely inside the meeting.
    Inside,
    /// The block runs into the meeting's start.
    CoversStart,
    /// The block starts during the meeting and outlasts it.
    CoversEnd,
    /// The block starts before and ends after the meeting.
    Surrounds,
    /// No intersection.
    Disjoint,
}

/// Classifies `block` against the meeting `[meeting_start, meeting_end)`.
pub fn classify(block: &WorklogBlock, meeting_start: DateTime<Utc>, meeting_end: DateTime<Utc>) -> Overlap {
    let block_start = block.start;
    let block_end = block.end();

    if block_start >= meeting_start && block_end <= meeting_end {
        Overlap::Inside
    } else if block_start < meeting_start && block_end > meeting_start && block_end <= meeting_end {
        Overlap::CoversStart
    } else if block_start >= meeting_start && block_start < meeting_end && block_end > meeting_end {
        Overlap::CoversEnd
    } else if block_start < meeting_start && block_end > meeting_end {
        Overlap::Surrounds
    } else {
        Overlap::Disjoint
    }
}

/// Clips one work block against one meeting.
fn clip(block: &WorklogBlock, meeting: &WorklogBlock) -> Vec<WorklogBlock> {
    let meeting_start = meeting.start;
    let meeting_end = meeting.end();

    match classify(block, meeting_start, meeting_end) {
        Overlap::Inside => Vec::new(),
        Overlap::CoversStart => vec![block.with_span(block.start, meeting_start)],
        Overlap::CoversEnd => vec![block.with_span(meeting_end, block.end())],
        Overlap::Surrounds => vec![
            block.with_span(block.start, meeting_start),
            block.with_span(meeting_end, block.end()),
        ],
        Overlap::Disjoint => vec![block.clone()],
    }
}

/// Merges `meetings` into `work`, meetings winning every overlap.
///
/// Meetings are applied in ascending start order, each one against the work
/// blocks already clipped by the previous meetings. The meetings are then
/// added as blocks and the whole list is sorted by start. Without meetings
/// the work blocks are returned unchanged.
pub fn insert_meetings(work: &[WorklogBlock], meetings: &[WorklogBlock]) -> Vec<WorklogBlock> {
    if meetings.is_empty() {
        return work.to_vec();
    }

    let mut ordered: Vec<&WorklogBlock> = meetings.iter().collect();
    ordered.sort_by_key(|meeting| meeting.start);

    let clipped = ordered.iter().fold(work.to_vec(), |blocks, meeting| {
        blocks.iter().flat_map(|block| clip(block, meeting)).collect()
    });

    let mut combined: Vec<WorklogBlock> = ordered.into_iter().cloned().chain(clipped).collect();
    combined.sort_by_key(|block| block.start);

    tracing::debug!(
        work = work.len(),
        meetings = meetings.len(),
        result = combined.len(),
        "inserted meetings"
    );

    combined
}
