use std::env;
use std::fs;
use std::path::Path;

use secrecy::ExposeSecret;
use toml::Value;

use crate::CliContext;

pub fn run(ctx: &CliContext) -> String {
    let config = match ctx.load_config() {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = ctx.effective_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let doc = config_file_doc.as_ref();
    let file = config_file_path.as_deref();

    let flag_database_url = ctx.overrides.database_url.is_some();
    let flag_log_level = ctx.overrides.log_level.is_some();

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        if flag_database_url {
            "flag (--database-url)".to_string()
        } else {
            field_source("database.url", Some("GREENLIGHT_DATABASE_URL"), doc, file)
        },
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        field_source(
            "database.max_connections",
            Some("GREENLIGHT_DATABASE_MAX_CONNECTIONS"),
            doc,
            file,
        ),
    ));
    lines.push(render_line(
        "database.busy_timeout_secs",
        &config.database.busy_timeout_secs.to_string(),
        field_source("database.busy_timeout_secs", None, doc, file),
    ));

    lines.push(render_line(
        "telegram.bot_token",
        &redact_token(config.telegram.bot_token.expose_secret()),
        field_source("telegram.bot_token", Some("GREENLIGHT_TELEGRAM_BOT_TOKEN"), doc, file),
    ));
    lines.push(render_line(
        "telegram.api_base_url",
        &config.telegram.api_base_url,
        field_source("telegram.api_base_url", Some("GREENLIGHT_TELEGRAM_API_BASE_URL"), doc, file),
    ));
    lines.push(render_line(
        "telegram.enabled",
        &config.telegram.enabled.to_string(),
        field_source("telegram.enabled", Some("GREENLIGHT_TELEGRAM_ENABLED"), doc, file),
    ));

    lines.push(render_line(
        "workflow.owner_skip_below",
        &config.workflow.owner_skip_below.to_string(),
        field_source("workflow.owner_skip_below", Some("GREENLIGHT_OWNER_SKIP_BELOW"), doc, file),
    ));
    lines.push(render_line(
        "workflow.reopen_below_score",
        &config.workflow.reopen_below_score.to_string(),
        field_source(
            "workflow.reopen_below_score",
            Some("GREENLIGHT_REOPEN_BELOW_SCORE"),
            doc,
            file,
        ),
    ));
    lines.push(render_line(
        "workflow.rework_sla_hours",
        &config.workflow.rework_sla_hours.to_string(),
        field_source("workflow.rework_sla_hours", Some("GREENLIGHT_REWORK_SLA_HOURS"), doc, file),
    ));
    lines.push(render_line(
        "workflow.window_start",
        &config.workflow.window_start.to_string(),
        field_source("workflow.window_start", None, doc, file),
    ));
    lines.push(render_line(
        "workflow.window_end",
        &config.workflow.window_end.to_string(),
        field_source("workflow.window_end", None, doc, file),
    ));
    lines.push(render_line(
        "workflow.day_capacity_hours",
        &config.workflow.day_capacity_hours.to_string(),
        field_source("workflow.day_capacity_hours", None, doc, file),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        if flag_log_level {
            "flag (--log-level)".to_string()
        } else {
            field_source("logging.level", Some("GREENLIGHT_LOG_LEVEL"), doc, file)
        },
    ));
    lines.push(render_line(
        "logging.format",
        &config.logging.format.to_string(),
        field_source("logging.format", Some("GREENLIGHT_LOG_FORMAT"), doc, file),
    ));

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Bot tokens look like `<numeric id>:<secret>`; only the id survives.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<unset>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once(':') {
        return format!("{prefix}:***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_redaction_keeps_only_the_bot_id() {
        assert_eq!(redact_token("123456:AAH-secret-part"), "123456:***");
        assert_eq!(redact_token("opaque"), "<redacted>");
        assert_eq!(redact_token(""), "<unset>");
    }

    #[test]
    fn nested_key_lookup_walks_tables() {
        let doc: Value = "[workflow]\nowner_skip_below = 45000\n".parse().unwrap();
        assert!(contains_path(&doc, "workflow.owner_skip_below"));
        assert!(!contains_path(&doc, "workflow.window_start"));
        assert!(!contains_path(&doc, "database.url"));
    }
}
