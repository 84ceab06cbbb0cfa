//! Submission ledger for the worklog tool.
//!
//! Records every attempt to submit a [`WorklogBlock`] so that re-running a
//! submission never books the same time twice, even after a block has grown
//! since it was last sent.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Wrap it in a `Mutex` or open one instance per thread.
//!
//! # Schema
//!
//! A block is identified by `(issue_key, started, duration_seconds)`. Each
//! identity has at most one row, updated in place by later attempts.
//!
//! Timestamps are stored as TEXT in RFC 3339 with millisecond precision and a
//! `Z` suffix (e.g. `2025-05-18T09:00:00.000Z`), so lexicographic order
//! matches chronological order.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use thiserror::Error;
use wl_core::{SendSummary, WorklogBlock};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored timestamp could not be parsed.
    #[error("invalid timestamp for submission {id}: {timestamp}")]
    TimestampParse {
        id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored status is not one this version knows.
    #[error("invalid status for submission {id}: {status}")]
    InvalidStatus { id: i64, status: String },
}

/// Outcome of the latest attempt for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    Failed,
}

impl SubmissionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(Self::Submitted),
            "failed" => Ok(Self::Failed),
            other => Err(other.to_string()),
        }
    }
}

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    pub id: i64,
    pub issue_key: String,
    pub started: DateTime<Utc>,
    pub duration_seconds: i64,
    pub status: SubmissionStatus,
    /// Last failure message; cleared on success.
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

/// Number of ledger rows per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerCounts {
    pub submitted: usize,
    pub failed: usize,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- submissions: one row per distinct block
            -- status: 'submitted' or 'failed'
            -- started, attempted_at: ISO 8601 UTC with milliseconds
            CREATE TABLE IF NOT EXISTS submissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                issue_key TEXT NOT NULL,
                started TEXT NOT NULL,
                duration_seconds INTEGER NOT NULL,
                status TEXT NOT NULL,
                error TEXT,
                attempted_at TEXT NOT NULL,
                UNIQUE (issue_key, started, duration_seconds)
            );

            CREATE INDEX IF NOT EXISTS idx_submissions_attempted ON submissions(attempted_at);
            CREATE INDEX IF NOT EXISTS idx_submissions_status ON submissions(status);
            ",
        )?;
        Ok(())
    }

    /// Whether `block` has already been accepted by the tracker.
    pub fn is_submitted(&self, block: &WorklogBlock) -> Result<bool, DbError> {
        let status: Option<String> = self
            .conn
            .query_row(
                "
                SELECT status FROM submissions
                WHERE issue_key = ? AND started = ? AND duration_seconds = ?
                ",
                params![
                    block.issue_key.as_str(),
                    format_timestamp(block.start),
                    block.duration_seconds
                ],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.as_deref() == Some(SubmissionStatus::Submitted.as_str()))
    }

    /// Submitted blocks with the same key that overlap `block`.
    pub fn submitted_overlapping(&self, block: &WorklogBlock) -> Result<Vec<WorklogBlock>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, started, duration_seconds FROM submissions
            WHERE issue_key = ? AND status = 'submitted' AND started < ?
                AND duration_seconds > 0
            ORDER BY started
            ",
        )?;
        let rows = stmt.query_map(
            params![block.issue_key.as_str(), format_timestamp(block.end())],
            |row| {
                let id: i64 = row.get(0)?;
                let started: String = row.get(1)?;
                let duration_seconds: i64 = row.get(2)?;
                Ok((id, started, duration_seconds))
            },
        )?;

        let mut covered = Vec::new();
        for row in rows {
            let (id, started, duration_seconds) = row?;
            let started = parse_timestamp(&started, id)?;
            let Ok(sent) = WorklogBlock::new(block.issue_key.clone(), started, duration_seconds) else {
                continue;
            };
            if sent.end() > block.start {
                covered.push(sent);
            }
        }
        Ok(covered)
    }

    /// The parts of `block` that no submitted row covers yet.
    ///
    /// Empty when the block was already booked in full. A block that grew
    /// since its last submission yields only the new time.
    pub fn unsent_parts(&self, block: &WorklogBlock) -> Result<Vec<WorklogBlock>, DbError> {
        let covered = self.submitted_overlapping(block)?;
        Ok(block.without_covered(&covered))
    }

    /// Sends the unsent parts of `blocks` through `send`, recording each
    /// attempt.
    ///
    /// A fully covered block counts as skipped; every part handed to `send`
    /// counts as submitted or failed. Only ledger errors abort the run.
    pub fn send_unsent<E, F>(&mut self, blocks: &[WorklogBlock], mut send: F) -> Result<SendSummary, DbError>
    where
        E: fmt::Display,
        F: FnMut(&WorklogBlock) -> Result<(), E>,
    {
        let mut summary = SendSummary::default();
        for block in blocks {
            let parts = self.unsent_parts(block)?;
            if parts.is_empty() {
                tracing::debug!(issue_key = %block.issue_key, start = %block.start, "already submitted");
                summary.skipped += 1;
                continue;
            }

            for part in parts {
                match send(&part) {
                    Ok(()) => {
                        self.record_success(&part, Utc::now())?;
                        summary.submitted += 1;
                    }
                    Err(err) => {
                        tracing::warn!(issue_key = %part.issue_key, start = %part.start, error = %err, "worklog rejected");
                        self.record_failure(&part, &err.to_string(), Utc::now())?;
                        summary.failed += 1;
                    }
                }
            }
        }
        Ok(summary)
    }

    /// Marks `block` as submitted, clearing any earlier failure.
    pub fn record_success(
        &mut self,
        block: &WorklogBlock,
        attempted_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO submissions (issue_key, started, duration_seconds, status, error, attempted_at)
            VALUES (?1, ?2, ?3, 'submitted', NULL, ?4)
            ON CONFLICT (issue_key, started, duration_seconds) DO UPDATE SET
                status = 'submitted',
                error = NULL,
                attempted_at = excluded.attempted_at
            ",
            params![
                block.issue_key.as_str(),
                format_timestamp(block.start),
                block.duration_seconds,
                format_timestamp(attempted_at)
            ],
        )?;
        Ok(())
    }

    /// Records a failed attempt for `block`.
    ///
    /// A block that was already submitted keeps its `submitted` row.
    pub fn record_failure(
        &mut self,
        block: &WorklogBlock,
        error: &str,
        attempted_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO submissions (issue_key, started, duration_seconds, status, error, attempted_at)
            VALUES (?1, ?2, ?3, 'failed', ?4, ?5)
            ON CONFLICT (issue_key, started, duration_seconds) DO UPDATE SET
                error = excluded.error,
                attempted_at = excluded.attempted_at
            WHERE submissions.status = 'failed'
            ",
            params![
                block.issue_key.as_str(),
                format_timestamp(block.start),
                block.duration_seconds,
                error,
                format_timestamp(attempted_at)
            ],
        )?;
        Ok(())
    }

    /// Lists the most recent attempts first, at most `limit` rows.
    pub fn list_submissions(&self, limit: usize) -> Result<Vec<SubmissionRecord>, DbError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "
            SELECT id, issue_key, started, duration_seconds, status, error, attempted_at
            FROM submissions
            ORDER BY attempted_at DESC, id DESC
            LIMIT ?
            ",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(RawSubmission {
                id: row.get(0)?,
                issue_key: row.get(1)?,
                started: row.get(2)?,
                duration_seconds: row.get(3)?,
                status: row.get(4)?,
                error: row.get(5)?,
                attempted_at: row.get(6)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    /// Counts rows per status.
    pub fn counts(&self) -> Result<LedgerCounts, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM submissions GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        let mut counts = LedgerCounts::default();
        for row in rows {
            let (status, count) = row?;
            let count = usize::try_from(count).unwrap_or_default();
            match status.parse::<SubmissionStatus>() {
                Ok(SubmissionStatus::Submitted) => counts.submitted = count,
                Ok(SubmissionStatus::Failed) => counts.failed = count,
                Err(status) => tracing::warn!(%status, count, "ignoring unknown submission status"),
            }
        }
        Ok(counts)
    }
}

/// A row as stored, before timestamp and status parsing.
struct RawSubmission {
    id: i64,
    issue_key: String,
    started: String,
    duration_seconds: i64,
    status: String,
    error: Option<String>,
    attempted_at: String,
}

impl RawSubmission {
    fn into_record(self) -> Result<SubmissionRecord, DbError> {
        let status = self
            .status
            .parse()
            .map_err(|status| DbError::InvalidStatus { id: self.id, status })?;
        Ok(SubmissionRecord {
            id: self.id,
            started: parse_timestamp(&self.started, self.id)?,
            attempted_at: parse_timestamp(&self.attempted_at, self.id)?,
            issue_key: self.issue_key,
            duration_seconds: self.duration_seconds,
            status,
            error: self.error,
        })
    }
}

fn parse_timestamp(timestamp: &str, id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
