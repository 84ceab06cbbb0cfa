//! Send command: submits aggregated blocks to Jira.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use tokio::runtime::Runtime;
use wl_core::{SendSummary, WorklogBlock, WorklogSink};
use wl_db::Database;

use super::aggregate::{Stages, build_blocks, format_blocks};
use crate::Config;
use crate::logfile::{clear_log, read_log};
use crate::remote::JiraSink;

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Log file to read instead of the configured one.
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Show what would be submitted without contacting Jira.
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &SendArgs, config: &Config, db: &mut Database) -> Result<()> {
    let log_path = args.log.as_ref().unwrap_or(&config.log_path);
    let entries = read_log(log_path)?;
    let stages = Stages {
        meetings: true,
        lunch: true,
    };
    let blocks = build_blocks(&entries, config, stages)?;

    if args.dry_run {
        let pending = pending_blocks(&blocks, db)?;
        writeln!(
            writer,
            "Dry run: {} of {} blocks would be submitted.",
            pending.len(),
            blocks.len()
        )?;
        write!(writer, "{}", format_blocks(&pending, config.display_timezone()?))?;
        return Ok(());
    }

    if blocks.is_empty() {
        writeln!(writer, "Nothing to send.")?;
        return Ok(());
    }

    let runtime = Runtime::new().context("failed to initialize tokio runtime")?;
    let summary = {
        let mut sink = JiraSink::from_config(config, &runtime, db)?;
        submit(&mut sink, &blocks)?
    };
    write_summary(writer, &summary)?;

    if !summary.is_complete() {
        bail!("{} of {} worklogs failed; see `wl history`", summary.failed, summary.total());
    }
    if config.clear_log_after_send && args.log.is_none() {
        clear_log(log_path)?;
    }
    Ok(())
}

/// The parts of `blocks` the ledger does not list as submitted.
fn pending_blocks(blocks: &[WorklogBlock], db: &Database) -> Result<Vec<WorklogBlock>> {
    let mut pending = Vec::new();
    for block in blocks {
        pending.extend(db.unsent_parts(block)?);
    }
    Ok(pending)
}

/// Hands `blocks` to `sink` and logs the outcome.
pub fn submit<S>(sink: &mut S, blocks: &[WorklogBlock]) -> Result<SendSummary>
where
    S: WorklogSink,
    S::Error: Into<anyhow::Error>,
{
    let summary = sink.send_all(blocks).map_err(Into::into)?;
    tracing::info!(
        submitted = summary.submitted,
        skipped = summary.skipped,
        failed = summary.failed,
        "send finished"
    );
    Ok(summary)
}

fn write_summary<W: Write>(writer: &mut W, summary: &SendSummary) -> Result<()> {
    writeln!(
        writer,
        "Submitted: {}, already sent: {}, failed: {}",
        summary.submitted, summary.skipped, summary.failed
    )?;
    Ok(())
}
