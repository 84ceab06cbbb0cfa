//! Jira Cloud worklog submission for the worklog tool.
//!
//! Talks to the REST API v3 with basic authentication (account email and API
//! token). Callers should run [`Client::check_auth`] once before submitting
//! so that bad credentials fail the whole run instead of every block.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wl_core::WorklogBlock;

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Comment attached to every worklog unless configured otherwise.
pub const DEFAULT_COMMENT: &str = "Logged automatically by wl";

/// Format of the `started` field expected by Jira.
const STARTED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Jira client errors.
#[derive(Debug, Error)]
pub enum JiraError {
    /// Client configuration is unusable.
    #[error("invalid Jira configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The credentials were rejected.
    #[error("authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },
    /// API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

/// Jira API client.
///
/// Safe to clone and share; clones share the connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    email: String,
    token: String,
    timezone: Tz,
    comment: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("token", &"[REDACTED]")
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for the site at `base_url`.
    ///
    /// Only the origin of `base_url` is kept, so a pasted board URL works.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not https, if the email or token is
    /// blank, or if the HTTP client fails to build.
    pub fn new(
        base_url: &str,
        email: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, JiraError> {
        let base_url = normalize_base_url(base_url)?;
        let email = email.into().trim().to_string();
        let token = token.into().trim().to_string();

        if email.is_empty() {
            return Err(JiraError::InvalidConfig {
                reason: "email cannot be empty",
            });
        }
        if token.is_empty() {
            return Err(JiraError::InvalidConfig {
                reason: "API token cannot be empty",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(JiraError::ClientBuild)?;

        Ok(Self {
            http,
            base_url,
            email,
            token,
            timezone: Tz::UTC,
            comment: DEFAULT_COMMENT.to_string(),
        })
    }

    /// Sets the timezone `started` is expressed in.
    #[must_use]
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Sets the worklog comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Normalized site root, always ending with `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Verifies the credentials against `rest/api/3/myself`.
    pub async fn check_auth(&self) -> Result<(), JiraError> {
        let response = self
            .http
            .get(format!("{}rest/api/3/myself", self.base_url))
            .basic_auth(&self.email, Some(&self.token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JiraError::Auth {
                status: status.as_u16(),
                message: parse_api_error(&body).unwrap_or(body),
            });
        }
        tracing::debug!(base_url = %self.base_url, "Jira credentials accepted");
        Ok(())
    }

    /// Adds `block` as a worklog on its issue.
    pub async fn add_worklog(&self, block: &WorklogBlock) -> Result<(), JiraError> {
        let request = self.worklog_request(block);
        let response = self
            .http
            .post(format!(
                "{}rest/api/3/issue/{}/worklog",
                self.base_url, block.issue_key
            ))
            .basic_auth(&self.email, Some(&self.token))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JiraError::Api {
                status: status.as_u16(),
                message: parse_api_error(&body).unwrap_or(body),
            });
        }

        tracing::info!(
            issue_key = %block.issue_key,
            started = %request.started,
            seconds = block.duration_seconds,
            "worklog submitted"
        );
        Ok(())
    }

    /// Body of the worklog POST for `block`.
    pub fn worklog_request(&self, block: &WorklogBlock) -> WorklogRequest {
        WorklogRequest {
            started: format_started(block.start, self.timezone),
            time_spent_seconds: block.duration_seconds,
            comment: Document::paragraph(&self.comment),
        }
    }
}

/// Reduces `raw` to `https://host[:port]/`.
pub fn normalize_base_url(raw: &str) -> Result<String, JiraError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(JiraError::InvalidConfig {
            reason: "base URL cannot be empty",
        });
    }
    let url = Url::parse(raw).map_err(|_| JiraError::InvalidConfig {
        reason: "base URL is not a valid URL",
    })?;
    if url.scheme() != "https" {
        return Err(JiraError::InvalidConfig {
            reason: "base URL must use https",
        });
    }
    if url.host_str().is_none() {
        return Err(JiraError::InvalidConfig {
            reason: "base URL has no host",
        });
    }
    Ok(format!("{}/", url.origin().ascii_serialization()))
}

/// Formats `instant` as Jira's `started`, e.g. `2025-05-18T11:00:00.000+0200`.
pub fn format_started(instant: DateTime<Utc>, timezone: Tz) -> String {
    instant.with_timezone(&timezone).format(STARTED_FORMAT).to_string()
}

/// Body of `POST rest/api/3/issue/{key}/worklog`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorklogRequest {
    pub started: String,
    pub time_spent_seconds: i64,
    pub comment: Document,
}

/// Minimal Atlassian Document Format value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    #[serde(rename = "type")]
    kind: &'static str,
    version: u8,
    content: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Node {
    Paragraph { content: Vec<Node> },
    Text { text: String },
}

impl Document {
    /// A document made of one paragraph of plain text.
    pub fn paragraph(text: &str) -> Self {
        Self {
            kind: "doc",
            version: 1,
            content: vec![Node::Paragraph {
                content: vec![Node::Text {
                    text: text.to_string(),
                }],
            }],
        }
    }
}

fn parse_api_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ErrorPayload {
        #[serde(default)]
        error_messages: Vec<String>,
        #[serde(default)]
        message: Option<String>,
    }

    let payload = serde_json::from_str::<ErrorPayload>(body).ok()?;
    if !payload.error_messages.is_empty() {
        return Some(payload.error_messages.join("; "));
    }
    payload.message
}
