//! Configuration loading and management.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use wl_core::{AggregationConfig, IssueKey, LunchWindow, MergePolicy, PipelineConfig, SpecialKeys};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the JSON Lines branch log.
    pub log_path: PathBuf,

    /// Path to the submission ledger.
    pub database_path: PathBuf,

    /// Empty the log once every block of a `send` was accepted.
    #[serde(default)]
    pub clear_log_after_send: bool,

    #[serde(default)]
    pub aggregation: AggregationSettings,

    #[serde(default)]
    pub lunch: LunchSettings,

    #[serde(default)]
    pub jira: JiraSettings,

    #[serde(default)]
    pub calendar: CalendarSettings,

    #[serde(default)]
    pub special_keys: SpecialKeys,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationSettings {
    pub chunk_size: usize,
    pub sample_interval_secs: i64,
    pub merge_policy: MergePolicy,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            chunk_size: 3,
            sample_interval_secs: 300,
            merge_policy: MergePolicy::default(),
        }
    }
}

/// Lunch window as wall-clock `HH:MM` times in an IANA timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LunchSettings {
    pub enabled: bool,
    pub start: String,
    pub end: String,
    pub timezone: String,
}

impl Default for LunchSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            start: "10:30".to_string(),
            end: "11:30".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Timezone of the `started` field and of printed times.
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Default for JiraSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            email: None,
            token: None,
            timezone: "UTC".to_string(),
            comment: None,
        }
    }
}

impl fmt::Debug for JiraSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraSettings")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timezone", &self.timezone)
            .field("comment", &self.comment)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub calendar_id: String,
    /// Issue for meetings whose description names none.
    pub meeting_issue_key: String,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            access_token: None,
            calendar_id: "primary".to_string(),
            meeting_issue_key: "MEETING".to_string(),
        }
    }
}

impl fmt::Debug for CalendarSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarSettings")
            .field("enabled", &self.enabled)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("calendar_id", &self.calendar_id)
            .field("meeting_issue_key", &self.meeting_issue_key)
            .finish()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("log_path", &self.log_path)
            .field("database_path", &self.database_path)
            .field("clear_log_after_send", &self.clear_log_after_send)
            .field("aggregation", &self.aggregation)
            .field("lunch", &self.lunch)
            .field("jira", &self.jira)
            .field("calendar", &self.calendar)
            .field("special_keys", &self.special_keys)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            log_path: data_dir.join("worklog.jsonl"),
            database_path: data_dir.join("wl.db"),
            clear_log_after_send: false,
            aggregation: AggregationSettings::default(),
            lunch: LunchSettings::default(),
            jira: JiraSettings::default(),
            calendar: CalendarSettings::default(),
            special_keys: SpecialKeys::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, `<config_dir>/wl/config.toml`, the given
    /// file, then `WL_*` environment variables (`WL_JIRA__TOKEN` sets
    /// `jira.token`).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (WL_*)
        figment = figment.merge(Env::prefixed("WL_").split("__"));

        figment.extract()
    }

    /// Pipeline settings; `lunch` overrides `lunch.enabled`.
    pub fn pipeline_config(&self, lunch: bool) -> Result<PipelineConfig> {
        let settings = &self.aggregation;
        let chunk_size = NonZeroUsize::new(settings.chunk_size)
            .ok_or_else(|| anyhow!("aggregation.chunk_size must be at least 1"))?;
        if settings.sample_interval_secs <= 0 {
            bail!("aggregation.sample_interval_secs must be positive");
        }

        let lunch = if lunch && self.lunch.enabled {
            Some(self.lunch_window()?)
        } else {
            None
        };

        Ok(PipelineConfig {
            aggregation: AggregationConfig {
                chunk_size,
                sample_interval: Duration::seconds(settings.sample_interval_secs),
                merge_policy: settings.merge_policy,
            },
            lunch,
        })
    }

    /// The configured lunch window, whether or not it is enabled.
    pub fn lunch_window(&self) -> Result<LunchWindow> {
        let start = parse_wall_time(&self.lunch.start).context("invalid lunch.start")?;
        let end = parse_wall_time(&self.lunch.end).context("invalid lunch.end")?;
        let timezone = parse_timezone(&self.lunch.timezone).context("invalid lunch.timezone")?;
        Ok(LunchWindow::new(start, end, timezone)?)
    }

    /// Timezone for Jira `started` values and printed times.
    pub fn display_timezone(&self) -> Result<Tz> {
        parse_timezone(&self.jira.timezone).context("invalid jira.timezone")
    }

    /// Issue receiving meetings without their own key.
    pub fn meeting_issue_key(&self) -> Result<IssueKey> {
        IssueKey::new(self.calendar.meeting_issue_key.as_str())
            .context("invalid calendar.meeting_issue_key")
    }
}

fn parse_wall_time(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .with_context(|| format!("expected HH:MM, got {value:?}"))
}

fn parse_timezone(value: &str) -> Result<Tz> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|err| anyhow!("unknown timezone {value:?}: {err}"))
}

/// Returns the platform-specific config directory for wl.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("wl"))
}

/// Returns the platform-specific data directory for wl.
///
/// On Linux: `~/.local/share/wl`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("wl"))
}
