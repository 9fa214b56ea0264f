pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use greenlight_core::config::{AppConfig, ConfigError, ConfigOverrides, LogFormat};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "greenlight",
    about = "Greenlight operator CLI",
    long_about = "Operate Greenlight migrations, reference fixtures, config inspection, and smoke validation.",
    after_help = "Examples:\n  greenlight migrate\n  greenlight config\n  greenlight smoke"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Read configuration from this TOML file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "URL", help = "Override the database URL")]
    database_url: Option<String>,
    #[arg(long, global = true, value_name = "LEVEL", help = "Override the log level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic reference fixtures (idempotent)")]
    Seed,
    #[command(about = "Run end-to-end readiness checks with per-check timing details")]
    Smoke,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

/// Where the subcommands get their configuration from: the `--config` path
/// and the flag overrides, applied on top of file and environment layers.
pub struct CliContext {
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

impl CliContext {
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        AppConfig::load(self.effective_config_path().as_deref(), self.overrides.clone())
    }

    /// `--config` wins; otherwise the conventional file locations are probed.
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            return Some(path.clone());
        }
        for candidate in ["greenlight.toml", "config/greenlight.toml"] {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let ctx = CliContext {
        config_path: cli.config,
        overrides: ConfigOverrides {
            database_url: cli.database_url,
            log_level: cli.log_level,
            telegram_bot_token: None,
        },
    };

    // Commands report config errors themselves; a broken config just means
    // no subscriber here.
    if let Ok(config) = ctx.load_config() {
        init_tracing(&config);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(&ctx),
        Command::Seed => commands::seed::run(&ctx),
        Command::Smoke => commands::smoke::run(&ctx),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&ctx) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    // try_init so a second invocation under tests keeps the first subscriber
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
