//! Status command for showing the log and ledger state.

use std::io::Write;

use anyhow::Result;
use wl_core::LogEntry;
use wl_db::Database;

use crate::Config;
use crate::logfile::read_log;

pub fn run<W: Write>(writer: &mut W, config: &Config, db: &Database) -> Result<()> {
    let entries = read_log(&config.log_path)?;
    let counts = db.counts()?;

    writeln!(writer, "Worklog status")?;
    writeln!(writer, "Log: {}", config.log_path.display())?;

    let pauses = entries.iter().filter(|entry| entry.is_pause()).count();
    writeln!(
        writer,
        "Entries: {} ({} branch samples, {} pauses)",
        entries.len(),
        entries.len() - pauses,
        pauses
    )?;

    match entries.iter().max_by_key(|entry| entry.timestamp()) {
        Some(LogEntry::BranchLog(log)) => {
            writeln!(writer, "Last entry: {} at {}", log.branch, log.timestamp.to_rfc3339())?;
        }
        Some(LogEntry::PauseMarker(pause)) => {
            writeln!(writer, "Last entry: pause at {}", pause.timestamp.to_rfc3339())?;
        }
        None => writeln!(writer, "Last entry: none")?,
    }

    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(
        writer,
        "Submissions: {} submitted, {} failed",
        counts.submitted, counts.failed
    )?;

    Ok(())
}
