//! Application configuration.
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! `GREENLIGHT_*` environment variables, then programmatic overrides.
//! Validation runs once at the end.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::sla::WorkCalendar;
use crate::workflows::WorkflowSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file `{path}`: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("cannot parse config file `{path}`: {source}")]
    Parse { path: String, source: toml::de::Error },
    #[error("environment variable `{name}` is not valid: {reason}")]
    Env { name: String, reason: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        })
    }
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub api_base_url: String,
    /// Delivery can be disabled wholesale, e.g. for local smoke runs.
    pub enabled: bool,
}

#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    pub owner_skip_below: i64,
    pub reopen_below_score: u8,
    pub rework_sla_hours: u32,
    pub window_start: u32,
    pub window_end: u32,
    pub day_capacity_hours: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub workflow: WorkflowConfig,
    pub logging: LoggingConfig,
}

/// Programmatic overrides, applied last. Used by the CLI flags.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub telegram_bot_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://greenlight.db".to_owned(),
                max_connections: 5,
                busy_timeout_secs: 5,
            },
            telegram: TelegramConfig {
                bot_token: SecretString::from(String::new()),
                api_base_url: "https://api.telegram.org".to_owned(),
                enabled: false,
            },
            workflow: WorkflowConfig {
                owner_skip_below: 30_000,
                reopen_below_score: 3,
                rework_sla_hours: 24,
                window_start: 9,
                window_end: 17,
                day_capacity_hours: 9,
            },
            logging: LoggingConfig { level: "info".to_owned(), format: LogFormat::Compact },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    telegram: Option<TelegramPatch>,
    workflow: Option<WorkflowPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    busy_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TelegramPatch {
    bot_token: Option<String>,
    api_base_url: Option<String>,
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkflowPatch {
    owner_skip_below: Option<i64>,
    reopen_below_score: Option<u8>,
    rework_sla_hours: Option<u32>,
    window_start: Option<u32>,
    window_end: Option<u32>,
    day_capacity_hours: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<String>,
}

impl AppConfig {
    /// Full load: defaults, optional file, `GREENLIGHT_*` env, overrides.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = AppConfig::default();
        if let Some(path) = path {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            let patch: ConfigPatch =
                toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?;
            config.apply_patch(patch)?;
        }
        config.apply_env(|name| std::env::var(name).ok())?;
        config.apply_overrides(overrides)?;
        config.validate()?;
        Ok(config)
    }

    pub fn calendar(&self) -> WorkCalendar {
        WorkCalendar {
            window_start: self.workflow.window_start,
            window_end: self.workflow.window_end,
            day_capacity_hours: self.workflow.day_capacity_hours,
        }
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            owner_skip_below: self.workflow.owner_skip_below,
            reopen_below_score: self.workflow.reopen_below_score,
            rework_sla_hours: self.workflow.rework_sla_hours,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(db) = patch.database {
            if let Some(url) = db.url {
                self.database.url = url;
            }
            if let Some(n) = db.max_connections {
                self.database.max_connections = n;
            }
            if let Some(n) = db.busy_timeout_secs {
                self.database.busy_timeout_secs = n;
            }
        }
        if let Some(tg) = patch.telegram {
            if let Some(token) = tg.bot_token {
                self.telegram.bot_token = SecretString::from(token);
            }
            if let Some(url) = tg.api_base_url {
                self.telegram.api_base_url = url;
            }
            if let Some(enabled) = tg.enabled {
                self.telegram.enabled = enabled;
            }
        }
        if let Some(wf) = patch.workflow {
            if let Some(v) = wf.owner_skip_below {
                self.workflow.owner_skip_below = v;
            }
            if let Some(v) = wf.reopen_below_score {
                self.workflow.reopen_below_score = v;
            }
            if let Some(v) = wf.rework_sla_hours {
                self.workflow.rework_sla_hours = v;
            }
            if let Some(v) = wf.window_start {
                self.workflow.window_start = v;
            }
            if let Some(v) = wf.window_end {
                self.workflow.window_end = v;
            }
            if let Some(v) = wf.day_capacity_hours {
                self.workflow.day_capacity_hours = v;
            }
        }
        if let Some(log) = patch.logging {
            if let Some(level) = log.level {
                self.logging.level = level;
            }
            if let Some(format) = log.format {
                self.logging.format = format.parse().map_err(|reason| ConfigError::Env {
                    name: "logging.format".to_owned(),
                    reason,
                })?;
            }
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, get: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = get("GREENLIGHT_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(raw) = get("GREENLIGHT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("GREENLIGHT_DATABASE_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(token) = get("GREENLIGHT_TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = SecretString::from(token);
        }
        if let Some(url) = get("GREENLIGHT_TELEGRAM_API_BASE_URL") {
            self.telegram.api_base_url = url;
        }
        if let Some(raw) = get("GREENLIGHT_TELEGRAM_ENABLED") {
            self.telegram.enabled = parse_env("GREENLIGHT_TELEGRAM_ENABLED", &raw)?;
        }
        if let Some(raw) = get("GREENLIGHT_OWNER_SKIP_BELOW") {
            self.workflow.owner_skip_below = parse_env("GREENLIGHT_OWNER_SKIP_BELOW", &raw)?;
        }
        if let Some(raw) = get("GREENLIGHT_REOPEN_BELOW_SCORE") {
            self.workflow.reopen_below_score = parse_env("GREENLIGHT_REOPEN_BELOW_SCORE", &raw)?;
        }
        if let Some(raw) = get("GREENLIGHT_REWORK_SLA_HOURS") {
            self.workflow.rework_sla_hours = parse_env("GREENLIGHT_REWORK_SLA_HOURS", &raw)?;
        }
        if let Some(level) = get("GREENLIGHT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(raw) = get("GREENLIGHT_LOG_FORMAT") {
            self.logging.format = raw.parse().map_err(|reason| ConfigError::Env {
                name: "GREENLIGHT_LOG_FORMAT".to_owned(),
                reason,
            })?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(token) = overrides.telegram_bot_token {
            self.telegram.bot_token = SecretString::from(token);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::Invalid("database.url must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be positive".into()));
        }
        if self.workflow.window_start >= self.workflow.window_end {
            return Err(ConfigError::Invalid(
                "workflow.window_start must be before workflow.window_end".into(),
            ));
        }
        if self.workflow.window_end > 23 {
            return Err(ConfigError::Invalid("workflow.window_end must be at most 23".into()));
        }
        if self.workflow.day_capacity_hours == 0 {
            return Err(ConfigError::Invalid(
                "workflow.day_capacity_hours must be positive".into(),
            ));
        }
        if !(1..=5).contains(&self.workflow.reopen_below_score) {
            return Err(ConfigError::Invalid(
                "workflow.reopen_below_score must be within 1..=5".into(),
            ));
        }
        if self.workflow.owner_skip_below < 0 {
            return Err(ConfigError::Invalid(
                "workflow.owner_skip_below must not be negative".into(),
            ));
        }
        if self.telegram.enabled {
            use secrecy::ExposeSecret;
            if self.telegram.bot_token.expose_secret().is_empty() {
                return Err(ConfigError::Invalid(
                    "telegram.enabled requires telegram.bot_token".into(),
                ));
            }
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    raw.parse().map_err(|err: T::Err| ConfigError::Env {
        name: name.to_owned(),
        reason: err.to_string(),
    })
}
