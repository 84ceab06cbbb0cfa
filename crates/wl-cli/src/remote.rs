//! Blocking adapters between the pipeline and the async HTTP clients.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tokio::runtime::Runtime;
use wl_calendar::CalendarError;
use wl_core::{MeetingSource, SendSummary, WorklogBlock, WorklogSink};
use wl_db::Database;

use crate::Config;

/// Reads meetings from Google Calendar, one request per day.
pub struct CalendarMeetings<'a> {
    client: wl_calendar::Client,
    runtime: &'a Runtime,
}

impl<'a> CalendarMeetings<'a> {
    /// Builds the source from `config.calendar`.
    pub fn from_config(config: &Config, runtime: &'a Runtime) -> Result<Self> {
        let access_token = config
            .calendar
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "missing calendar access token (set WL_CALENDAR__ACCESS_TOKEN or config.toml)"
                )
            })?;
        let client = wl_calendar::Client::new(
            access_token,
            config.calendar.calendar_id.as_str(),
            config.meeting_issue_key()?,
        )
        .context("failed to create calendar client")?;
        Ok(Self { client, runtime })
    }
}

impl MeetingSource for CalendarMeetings<'_> {
    type Error = CalendarError;

    fn meetings_for(&self, day: NaiveDate) -> Result<Vec<WorklogBlock>, Self::Error> {
        self.runtime.block_on(self.client.meetings_for(day))
    }
}

/// Submits blocks to Jira, recording each attempt in the ledger.
///
/// Time the ledger already lists as submitted is never sent again.
pub struct JiraSink<'a> {
    client: wl_jira::Client,
    runtime: &'a Runtime,
    db: &'a mut Database,
}

impl<'a> JiraSink<'a> {
    /// Builds the sink from `config.jira`.
    pub fn from_config(config: &Config, runtime: &'a Runtime, db: &'a mut Database) -> Result<Self> {
        let jira = &config.jira;
        let missing = |key: &str, env: &str| {
            anyhow::anyhow!("missing jira.{key} (set WL_JIRA__{env} or config.toml)")
        };
        let base_url = jira.base_url.as_deref().ok_or_else(|| missing("base_url", "BASE_URL"))?;
        let email = jira.email.as_deref().ok_or_else(|| missing("email", "EMAIL"))?;
        let token = jira.token.as_deref().ok_or_else(|| missing("token", "TOKEN"))?;

        let mut client = wl_jira::Client::new(base_url, email, token)
            .context("failed to create Jira client")?
            .with_timezone(config.display_timezone()?);
        if let Some(comment) = jira.comment.as_deref() {
            client = client.with_comment(comment);
        }

        Ok(Self {
            client,
            runtime,
            db,
        })
    }
}

impl WorklogSink for JiraSink<'_> {
    type Error = anyhow::Error;

    fn send_all(&mut self, blocks: &[WorklogBlock]) -> Result<SendSummary, Self::Error> {
        self.runtime
            .block_on(self.client.check_auth())
            .context("Jira rejected the credentials")?;

        let client = &self.client;
        let runtime = self.runtime;
        let summary = self
            .db
            .send_unsent(blocks, |block| runtime.block_on(client.add_worklog(block)))?;
        Ok(summary)
    }
}
