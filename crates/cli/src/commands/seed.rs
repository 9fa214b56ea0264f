use crate::commands::CommandResult;
use crate::CliContext;
use greenlight_db::fixtures::SeedSummary;
use greenlight_db::{connect_with_settings, fixtures, migrations};

pub fn run(ctx: &CliContext) -> CommandResult {
    let config = match ctx.load_config() {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        // One connection, so an in-memory database URL stays one database
        // between migration, seed and verification.
        let pool = connect_with_settings(&config.database.url, 1, config.database.busy_timeout_secs)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        fixtures::seed(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let summary = fixtures::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        pool.close().await;

        if summary.workers == 0 || summary.problems == 0 {
            return Err((
                "seed_verification",
                format!("seed left the database incomplete: {}", seed_summary_line(&summary)),
                6u8,
            ));
        }
        Ok::<SeedSummary, (&'static str, String, u8)>(summary)
    });

    match result {
        Ok(summary) => CommandResult::success(
            "seed",
            format!("reference fixtures loaded: {}", seed_summary_line(&summary)),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn seed_summary_line(summary: &SeedSummary) -> String {
    format!(
        "{} departments, {} workers, {} expenditures, {} catalog problems",
        summary.departments, summary.workers, summary.expenditures, summary.problems,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line_names_every_fixture_family() {
        let line = seed_summary_line(&SeedSummary {
            departments: 2,
            workers: 13,
            expenditures: 1,
            problems: 2,
        });
        assert_eq!(line, "2 departments, 13 workers, 1 expenditures, 2 catalog problems");
    }
}
