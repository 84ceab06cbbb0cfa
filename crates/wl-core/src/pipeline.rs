//! The aggregation pipeline.
//!
//! # Stages
//!
//! 1. Lunch break enforcement (optional)
//! 2. Sequence splitting on pauses and day changes
//! 3. Majority-vote chunking of each sequence
//! 4. Merging of adjacent same-key blocks
//! 5. Per-day meeting reconciliation through a [`MeetingSource`]
//!
//! Every stage takes its input by reference and builds a new output; the
//! caller's log is never modified.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::block::WorklogBlock;
use crate::chunk::{AggregationConfig, aggregate_sequence};
use crate::entry::LogEntry;
use crate::lunch::{LunchWindow, enforce_lunch_break};
use crate::meeting::insert_meetings;
use crate::merge::merge_consecutive_blocks;
use crate::split::split_sequences;

/// Configuration for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Chunking and merging parameters.
    pub aggregation: AggregationConfig,

    /// Lunch window to enforce. `None` disables the stage.
    pub lunch: Option<LunchWindow>,
}

/// Provides the meetings attended on a given day.
///
/// Implementations must already exclude all-day, incomplete and declined
/// events, and resolve each meeting's issue key.
pub trait MeetingSource {
    /// Error returned when a day cannot be fetched.
    type Error: fmt::Display;

    /// Returns the meetings of the UTC calendar day `day`.
    fn meetings_for(&self, day: NaiveDate) -> Result<Vec<WorklogBlock>, Self::Error>;
}

impl<S: MeetingSource + ?Sized> MeetingSource for &S {
    type Error = S::Error;

    fn meetings_for(&self, day: NaiveDate) -> Result<Vec<WorklogBlock>, Self::Error> {
        (**self).meetings_for(day)
    }
}

/// A calendar without meetings.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMeetings;

impl MeetingSource for NoMeetings {
    type Error = Infallible;

    fn meetings_for(&self, _day: NaiveDate) -> Result<Vec<WorklogBlock>, Self::Error> {
        Ok(Vec::new())
    }
}

/// Result of a full pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOutput {
    /// Final blocks, sorted by start.
    pub blocks: Vec<WorklogBlock>,

    /// Days whose meetings could not be fetched. Their work blocks are
    /// included unmodified.
    pub degraded_days: Vec<NaiveDate>,
}

/// Runs stages 1-4: the log becomes merged work blocks, without meetings.
///
/// Each sequence is chunked and merged on its own, so blocks never span a
/// pause marker or a UTC day change.
pub fn aggregate_work(entries: &[LogEntry], config: &PipelineConfig) -> Vec<WorklogBlock> {
    let entries = match &config.lunch {
        Some(window) => Cow::Owned(enforce_lunch_break(entries, window)),
        None => Cow::Borrowed(entries),
    };

    // Merging is per sequence: no policy may join work across a pause or a
    // day change.
    split_sequences(&entries)
        .iter()
        .flat_map(|sequence| {
            let blocks = aggregate_sequence(sequence, &config.aggregation);
            merge_consecutive_blocks(&blocks, config.aggregation.merge_policy)
        })
        .collect()
}

/// Runs the whole pipeline.
///
/// Meetings are fetched once per UTC day that has work blocks. A day whose
/// fetch fails keeps its work blocks as they are; the other days are not
/// affected.
pub fn aggregate_logs<S: MeetingSource>(
    entries: &[LogEntry],
    config: &PipelineConfig,
    meetings: &S,
) -> PipelineOutput {
    let work = aggregate_work(entries, config);

    let mut by_day: BTreeMap<NaiveDate, Vec<WorklogBlock>> = BTreeMap::new();
    for block in work {
        by_day.entry(block.day()).or_default().push(block);
    }

    let mut output = PipelineOutput::default();
    for (day, blocks) in by_day {
        match meetings.meetings_for(day) {
            Ok(day_meetings) => {
                let day_meetings = clip_to_day(&day_meetings, day);
                tracing::debug!(%day, meetings = day_meetings.len(), "fetched meetings");
                output.blocks.extend(insert_meetings(&blocks, &day_meetings));
            }
            Err(err) => {
                tracing::warn!(%day, error = %err, "failed to fetch meetings, keeping work blocks as-is");
                output.degraded_days.push(day);
                output.blocks.extend(blocks);
            }
        }
    }
    output.blocks.sort_by_key(|block| block.start);

    tracing::debug!(
        entries = entries.len(),
        blocks = output.blocks.len(),
        degraded_days = output.degraded_days.len(),
        "aggregated log"
    );

    output
}

/// `[day 00:00Z, day+1 00:00Z)`.
fn utc_day_span(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// Restricts meetings to the UTC day `day`, dropping those outside it.
///
/// A meeting across midnight is reported for both days; each day keeps only
/// its own part.
fn clip_to_day(meetings: &[WorklogBlock], day: NaiveDate) -> Vec<WorklogBlock> {
    let (day_start, day_end) = utc_day_span(day);
    meetings
        .iter()
        .filter_map(|meeting| {
            let start = meeting.start.max(day_start);
            let end = meeting.end().min(day_end);
            (start < end).then(|| meeting.with_span(start, end))
        })
        .collect()
}
