//! History command: lists ledger entries.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use chrono_tz::Tz;
use clap::Args;
use wl_db::{Database, SubmissionRecord};

use super::aggregate::format_duration;
use crate::Config;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Maximum number of entries, most recent first.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

pub fn run<W: Write>(writer: &mut W, args: &HistoryArgs, config: &Config, db: &Database) -> Result<()> {
    let records = db.list_submissions(args.limit)?;
    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&records)?)?;
    } else {
        write!(writer, "{}", format_history(&records, config.display_timezone()?))?;
    }
    Ok(())
}

fn format_history(records: &[SubmissionRecord], timezone: Tz) -> String {
    let mut output = String::new();
    if records.is_empty() {
        output.push_str("No submissions recorded.\n");
        return output;
    }

    let _ = writeln!(
        output,
        "{:<16}  {:<16}  {:>8}  {:<9}  ERROR",
        "ISSUE", "START", "DURATION", "STATUS"
    );
    for record in records {
        let start = record.started.with_timezone(&timezone).format("%Y-%m-%d %H:%M");
        let line = format!(
            "{:<16}  {:<16}  {:>8}  {:<9}  {}",
            record.issue_key,
            start.to_string(),
            format_duration(record.duration_seconds),
            record.status.as_str(),
            record.error.as_deref().unwrap_or("")
        );
        let _ = writeln!(output, "{}", line.trim_end());
    }
    output
}
