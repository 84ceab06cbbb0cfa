//! Mark command: appends a branch sample or pause marker to the log.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use wl_core::LogEntry;
use wl_core::issue::issue_key_from_branch;

use crate::cli::MarkEntry;
use crate::Config;
use crate::logfile::append_entry;

pub fn run(entry: &MarkEntry, config: &Config) -> Result<LogEntry> {
    let entry = build_entry(entry, Utc::now())?;
    append_entry(&config.log_path, &entry)?;
    tracing::info!(?entry, path = %config.log_path.display(), "appended log entry");
    Ok(entry)
}

fn build_entry(entry: &MarkEntry, now: DateTime<Utc>) -> Result<LogEntry> {
    match entry {
        MarkEntry::Branch { name } => {
            let key = issue_key_from_branch(name)
                .ok_or_else(|| anyhow!("branch name {name:?} has no usable segment"))?;
            Ok(LogEntry::branch(key, now))
        }
        MarkEntry::Pause => Ok(LogEntry::pause(now)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2025-05-18T09:00:00Z".parse().unwrap()
    }

    #[test]
    fn branch_prefix_is_stripped() {
        let entry = build_entry(
            &MarkEntry::Branch {
                name: "feature/PRJ-12".to_string(),
            },
            now(),
        )
        .unwrap();
        insta::assert_snapshot!(
            serde_json::to_string(&entry).unwrap(),
            @r#"{"type":"branch_log","branch":"PRJ-12","timestamp":"2025-05-18T09:00:00Z"}"#
        );
    }

    #[test]
    fn pause_marker() {
        let entry = build_entry(&MarkEntry::Pause, now()).unwrap();
        assert_eq!(entry, LogEntry::pause(now()));
    }

    #[test]
    fn unusable_branch_is_rejected() {
        let entry = MarkEntry::Branch {
            name: "feature/".to_string(),
        };
        assert!(build_entry(&entry, now()).is_err());
    }

    #[test]
    fn run_appends_to_configured_log() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.log_path = temp.path().join("worklog.jsonl");

        run(&MarkEntry::Pause, &config).unwrap();
        run(
            &MarkEntry::Branch {
                name: "PRJ-1".to_string(),
            },
            &config,
        )
        .unwrap();

        let entries = crate::logfile::read_log(&config.log_path).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_pause());
    }
}
