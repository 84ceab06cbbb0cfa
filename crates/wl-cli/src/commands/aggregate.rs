//! Aggregate command: turns the log into worklog blocks.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use clap::Args;
use tokio::runtime::Runtime;
use wl_core::{
    LogEntry, NoMeetings, PipelineOutput, WorklogBlock, aggregate_logs, block::total_seconds,
    remap_special_keys,
};

use crate::Config;
use crate::logfile::read_log;
use crate::remote::CalendarMeetings;

#[derive(Debug, Args)]
pub struct AggregateArgs {
    /// Log file to read instead of the configured one.
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Do not fetch calendar meetings.
    #[arg(long)]
    pub no_meetings: bool,

    /// Do not enforce the lunch break.
    #[arg(long)]
    pub no_lunch: bool,
}

/// Which optional pipeline stages to run.
#[derive(Debug, Clone, Copy)]
pub struct Stages {
    pub meetings: bool,
    pub lunch: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &AggregateArgs, config: &Config) -> Result<()> {
    let log_path = args.log.as_ref().unwrap_or(&config.log_path);
    let entries = read_log(log_path)?;
    let stages = Stages {
        meetings: !args.no_meetings,
        lunch: !args.no_lunch,
    };
    let blocks = build_blocks(&entries, config, stages)?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&blocks)?)?;
    } else {
        write!(writer, "{}", format_blocks(&blocks, config.display_timezone()?))?;
    }
    Ok(())
}

/// Runs the pipeline and the special-key remap.
///
/// Meetings are fetched only when both `stages.meetings` and
/// `calendar.enabled` are set.
pub fn build_blocks(entries: &[LogEntry], config: &Config, stages: Stages) -> Result<Vec<WorklogBlock>> {
    let pipeline = config.pipeline_config(stages.lunch)?;

    let output: PipelineOutput = if stages.meetings && config.calendar.enabled {
        let runtime = Runtime::new().context("failed to initialize tokio runtime")?;
        let meetings = CalendarMeetings::from_config(config, &runtime)?;
        aggregate_logs(entries, &pipeline, &meetings)
    } else {
        aggregate_logs(entries, &pipeline, &NoMeetings)
    };

    for day in &output.degraded_days {
        tracing::warn!(%day, "meetings missing for this day");
    }

    Ok(remap_special_keys(&output.blocks, &config.special_keys))
}

/// Renders blocks as a table with times in `timezone`.
pub fn format_blocks(blocks: &[WorklogBlock], timezone: Tz) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    if blocks.is_empty() {
        output.push_str("No worklog blocks.\n");
        return output;
    }

    let _ = writeln!(output, "{:<16}  {:<16}  {:>8}", "ISSUE", "START", "DURATION");
    for block in blocks {
        let start = block.start.with_timezone(&timezone).format("%Y-%m-%d %H:%M");
        let _ = writeln!(
            output,
            "{:<16}  {:<16}  {:>8}",
            block.issue_key.as_str(),
            start.to_string(),
            format_duration(block.duration_seconds)
        );
    }
    let _ = writeln!(
        output,
        "Total: {} in {} blocks",
        format_duration(total_seconds(blocks)),
        blocks.len()
    );
    output
}

/// `1h 5m`, `15m`, or `40s` for spans under a minute.
pub fn format_duration(seconds: i64) -> String {
    if seconds < 60 {
        return format!("{}s", seconds.max(0));
    }
    let total_minutes = seconds / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use wl_core::IssueKey;

    fn sample(branch: &str, ts: &str) -> LogEntry {
        LogEntry::branch(IssueKey::new(branch).unwrap(), ts.parse().unwrap())
    }

    fn no_extras() -> Stages {
        Stages {
            meetings: false,
            lunch: false,
        }
    }

    #[test]
    fn format_duration_variants() {
        assert_eq!(format_duration(40), "40s");
        assert_eq!(format_duration(900), "15m");
        assert_eq!(format_duration(3900), "1h 5m");
        assert_eq!(format_duration(-5), "0s");
    }

    #[test]
    fn build_blocks_applies_special_keys() {
        let mut config = Config::default();
        config.special_keys.support_issue = Some(IssueKey::new("SUP-1").unwrap());
        let entries = vec![
            sample("support", "2025-05-18T09:00:00Z"),
            sample("support", "2025-05-18T09:05:00Z"),
            sample("PRJ-2", "2025-05-18T09:10:00Z"),
            sample("PRJ-2", "2025-05-18T09:15:00Z"),
        ];

        let blocks = build_blocks(&entries, &config, no_extras()).unwrap();
        let keys: Vec<_> = blocks.iter().map(|b| b.issue_key.as_str()).collect();
        assert_eq!(keys, vec!["SUP-1", "PRJ-2"]);
    }

    #[test]
    fn disabled_calendar_is_never_contacted() {
        let mut config = Config::default();
        config.calendar.enabled = false;
        let entries = vec![sample("PRJ-1", "2025-05-18T09:00:00Z")];

        let stages = Stages {
            meetings: true,
            lunch: true,
        };
        assert_eq!(build_blocks(&entries, &config, stages).unwrap().len(), 1);
    }

    #[test]
    fn table_output() {
        let entries = vec![
            sample("PRJ-1", "2025-05-18T09:00:00Z"),
            sample("PRJ-1", "2025-05-18T09:05:00Z"),
            sample("PRJ-1", "2025-05-18T09:10:00Z"),
            sample("PRJ-1", "2025-05-18T09:15:00Z"),
            LogEntry::pause("2025-05-18T09:17:00Z".parse().unwrap()),
            sample("OPS-7", "2025-05-18T14:00:00Z"),
        ];
        let blocks = build_blocks(&entries, &Config::default(), no_extras()).unwrap();

        assert_snapshot!(format_blocks(&blocks, chrono_tz::Europe::Paris), @r"
        ISSUE             START             DURATION
        PRJ-1             2025-05-18 11:00       20m
        OPS-7             2025-05-18 16:00        5m
        Total: 25m in 2 blocks
        ");
    }

    #[test]
    fn empty_table_output() {
        assert_eq!(format_blocks(&[], Tz::UTC), "No worklog blocks.\n");
    }
}
