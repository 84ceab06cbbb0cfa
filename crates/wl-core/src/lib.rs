//! Core domain logic for the worklog tool.
//!
//! This crate turns a log of branch samples and pause markers into worklog
//! blocks:
//! - Sequence splitting on pauses and day changes
//! - Majority-vote chunking and merging of blocks
//! - Lunch break enforcement and meeting overlap resolution
//! - Issue key extraction and special-key remapping

pub mod block;
mod chunk;
pub mod entry;
pub mod issue;
pub mod lunch;
pub mod meeting;
pub mod merge;
pub mod pipeline;
pub mod sink;
pub mod special;
mod split;
pub mod types;

pub use block::WorklogBlock;
pub use chunk::{AggregationConfig, aggregate_sequence};
pub use entry::{BranchLog, LogEntry, PauseMarker};
pub use lunch::{LunchWindow, enforce_lunch_break};
pub use meeting::insert_meetings;
pub use merge::{MergePolicy, merge_consecutive_blocks};
pub use pipeline::{MeetingSource, NoMeetings, PipelineConfig, PipelineOutput, aggregate_logs, aggregate_work};
pub use sink::{SendSummary, WorklogSink};
pub use special::{SpecialKeys, remap_special_keys};
pub use split::split_sequences;
pub use types::{IssueKey, ValidationError};
