use std::env;
use std::sync::{Mutex, OnceLock};

use greenlight_cli::commands::{config, migrate, seed, smoke};
use greenlight_cli::CliContext;
use greenlight_core::config::ConfigOverrides;
use serde_json::Value;

#[test]
fn migrate_succeeds_against_an_in_memory_database() {
    with_env(&[("GREENLIGHT_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run(&ctx());
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_reports_config_validation_failures() {
    with_env(
        &[
            ("GREENLIGHT_DATABASE_URL", "sqlite::memory:"),
            ("GREENLIGHT_REOPEN_BELOW_SCORE", "9"),
        ],
        || {
            let result = migrate::run(&ctx());
            assert_eq!(result.exit_code, 2, "expected config validation failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "config_validation");
        },
    );
}

#[test]
fn seed_loads_the_reference_fixtures() {
    with_env(&[("GREENLIGHT_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run(&ctx());
        assert_eq!(result.exit_code, 0, "expected successful seed run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("13 workers"));
        assert!(message.contains("2 catalog problems"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_env(&[("GREENLIGHT_DATABASE_URL", "sqlite::memory:")], || {
        let first = seed::run(&ctx());
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["status"], "ok");

        let second = seed::run(&ctx());
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);
        assert_eq!(second_payload["status"], "ok");

        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn smoke_passes_with_a_valid_environment() {
    with_env(&[("GREENLIGHT_DATABASE_URL", "sqlite::memory:")], || {
        let result = smoke::run(&ctx());
        assert_eq!(result.exit_code, 0, "expected successful smoke report");

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "smoke");
        assert_eq!(payload["status"], "pass");

        let walk = payload["checks"]
            .as_array()
            .and_then(|checks| {
                checks.iter().find(|check| check["name"] == "approval_walk")
            })
            .cloned()
            .unwrap_or_default();
        assert_eq!(walk["status"], "pass");
        assert!(walk["message"].as_str().unwrap_or("").contains("fully approved"));
    });
}

#[test]
fn smoke_fails_when_config_is_invalid() {
    with_env(
        &[
            ("GREENLIGHT_DATABASE_URL", "sqlite::memory:"),
            ("GREENLIGHT_REOPEN_BELOW_SCORE", "9"),
        ],
        || {
            let result = smoke::run(&ctx());
            assert_eq!(result.exit_code, 6, "expected smoke failure code");

            let payload = parse_payload(last_line(&result.output));
            assert_eq!(payload["command"], "smoke");
            assert_eq!(payload["status"], "fail");
        },
    );
}

#[test]
fn config_redacts_the_bot_token_and_names_its_source() {
    with_env(
        &[
            ("GREENLIGHT_DATABASE_URL", "sqlite::memory:"),
            ("GREENLIGHT_TELEGRAM_BOT_TOKEN", "123456:AAH-secret"),
        ],
        || {
            let output = config::run(&ctx());
            assert!(output.contains("123456:***"));
            assert!(!output.contains("AAH-secret"));
            assert!(output.contains("env (GREENLIGHT_TELEGRAM_BOT_TOKEN)"));
        },
    );
}

fn ctx() -> CliContext {
    CliContext { config_path: None, overrides: ConfigOverrides::default() }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "GREENLIGHT_DATABASE_URL",
        "GREENLIGHT_DATABASE_MAX_CONNECTIONS",
        "GREENLIGHT_TELEGRAM_BOT_TOKEN",
        "GREENLIGHT_TELEGRAM_API_BASE_URL",
        "GREENLIGHT_TELEGRAM_ENABLED",
        "GREENLIGHT_OWNER_SKIP_BELOW",
        "GREENLIGHT_REOPEN_BELOW_SCORE",
        "GREENLIGHT_REWORK_SLA_HOURS",
        "GREENLIGHT_LOG_LEVEL",
        "GREENLIGHT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
