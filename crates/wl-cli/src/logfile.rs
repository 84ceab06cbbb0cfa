//! The JSON Lines branch log.
//!
//! One [`LogEntry`] per line. Writers take an exclusive lock on a sibling
//! `.lock` file so that concurrent `wl mark` calls never interleave lines.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use wl_core::LogEntry;

/// Returns the path to the lock file guarding `log_path`.
fn lock_path(log_path: &Path) -> PathBuf {
    let mut name = log_path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    log_path.with_file_name(name)
}

/// Creates the parent directory and takes the writer lock.
fn acquire_lock(log_path: &Path) -> Result<File> {
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("failed to create log directory")?;
    }
    let lock_file = File::create(lock_path(log_path)).context("failed to create lock file")?;
    lock_file
        .lock_exclusive()
        .context("failed to acquire lock")?;
    Ok(lock_file)
}

/// Reads every well-formed entry of the log.
///
/// A missing file is an empty log. Malformed lines are skipped with a
/// warning.
pub fn read_log(log_path: &Path) -> Result<Vec<LogEntry>> {
    let file = match File::open(log_path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to open {}", log_path.display()));
        }
    };
    parse_log(BufReader::new(file))
}

fn parse_log<R: BufRead>(reader: R) -> Result<Vec<LogEntry>> {
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<LogEntry>(trimmed) {
            Ok(entry) => entries.push(entry),
            Err(err) => tracing::warn!(line = idx + 1, error = %err, "skipping malformed log line"),
        }
    }
    Ok(entries)
}

/// Appends one entry to the log.
pub fn append_entry(log_path: &Path, entry: &LogEntry) -> Result<()> {
    let _lock = acquire_lock(log_path)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .context("failed to open log file")?;

    let json = serde_json::to_string(entry).context("failed to serialize entry")?;
    writeln!(file, "{json}").context("failed to write entry")?;

    Ok(())
}

/// Empties the log.
pub fn clear_log(log_path: &Path) -> Result<()> {
    let _lock = acquire_lock(log_path)?;
    File::create(log_path).context("failed to truncate log file")?;
    tracing::info!(path = %log_path.display(), "cleared log");
    Ok(())
}
