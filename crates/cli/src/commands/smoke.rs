use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context};
use serde::Serialize;

use crate::commands::CommandResult;
use crate::CliContext;
use greenlight_core::chain::Decision;
use greenlight_core::domain::{PaymentMethod, WorkerId};
use greenlight_core::sla::WorkCalendar;
use greenlight_core::workflows::payment::{
    NewPaymentBid, ACCOUNTANT_CARD, AUDIT, COST_CENTER, FINANCIAL_CENTER, OWNER, PARALEGAL,
    TELLER_CARD,
};
use greenlight_core::workflows::WorkflowSettings;
use greenlight_db::repositories::{
    SqlPaymentBidRepository, SqlTicketRepository, SqlWorkerBidRepository, SqlWorkerRepository,
};
use greenlight_db::{connect_with_settings, fixtures, migrations};
use greenlight_notify::RecordingNotifier;
use greenlight_service::ChainService;
use rust_decimal::Decimal;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

pub fn run(ctx: &CliContext) -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config_started = Instant::now();
    let config = match ctx.load_config() {
        Ok(config) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Pass,
                elapsed_ms: config_started.elapsed().as_millis() as u64,
                message: "configuration loaded and validated".to_string(),
            });
            config
        }
        Err(error) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Fail,
                elapsed_ms: config_started.elapsed().as_millis() as u64,
                message: error.to_string(),
            });
            checks.push(skipped("db_connectivity"));
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("approval_walk"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Fail,
                elapsed_ms: 0,
                message: format!("failed to initialize async runtime: {error}"),
            });
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("approval_walk"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let db_started = Instant::now();
    let db_result = runtime.block_on(async {
        connect_with_settings(&config.database.url, 1, config.database.busy_timeout_secs).await
    });

    let pool = match db_result {
        Ok(pool) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Pass,
                elapsed_ms: db_started.elapsed().as_millis() as u64,
                message: format!("connected using `{}`", config.database.url),
            });
            pool
        }
        Err(error) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Fail,
                elapsed_ms: db_started.elapsed().as_millis() as u64,
                message: format!("failed to connect: {error}"),
            });
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("approval_walk"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let migration_started = Instant::now();
    let migration_result = runtime.block_on(async { migrations::run_pending(&pool).await });
    runtime.block_on(async {
        pool.close().await;
    });

    match migration_result {
        Ok(()) => checks.push(SmokeCheck {
            name: "migration_visibility",
            status: SmokeStatus::Pass,
            elapsed_ms: migration_started.elapsed().as_millis() as u64,
            message: "migrations are visible and executable".to_string(),
        }),
        Err(error) => checks.push(SmokeCheck {
            name: "migration_visibility",
            status: SmokeStatus::Fail,
            elapsed_ms: migration_started.elapsed().as_millis() as u64,
            message: format!("migration execution failed: {error}"),
        }),
    }

    let walk_started = Instant::now();
    let walk_result = runtime.block_on(approval_walk());
    match walk_result {
        Ok(message) => checks.push(SmokeCheck {
            name: "approval_walk",
            status: SmokeStatus::Pass,
            elapsed_ms: walk_started.elapsed().as_millis() as u64,
            message,
        }),
        Err(error) => checks.push(SmokeCheck {
            name: "approval_walk",
            status: SmokeStatus::Fail,
            elapsed_ms: walk_started.elapsed().as_millis() as u64,
            message: format!("{error:#}"),
        }),
    }

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

/// Full payment walk against a throwaway in-memory database: migrate, seed,
/// create a card bid and approve every stage to closure. The configured
/// database is never written.
async fn approval_walk() -> anyhow::Result<String> {
    let pool = connect_with_settings("sqlite::memory:", 1, 5)
        .await
        .context("in-memory database")?;
    migrations::run_pending(&pool).await.context("migrations")?;
    fixtures::seed(&pool).await.context("fixtures")?;

    let notifier = Arc::new(RecordingNotifier::new());
    let service = ChainService::new(
        Arc::new(SqlPaymentBidRepository::new(pool.clone())),
        Arc::new(SqlWorkerBidRepository::new(pool.clone())),
        Arc::new(SqlTicketRepository::new(pool.clone())),
        Arc::new(SqlWorkerRepository::new(pool.clone())),
        notifier.clone(),
        WorkflowSettings::default(),
        WorkCalendar::default(),
    );

    let created = service
        .create_payment_bid(NewPaymentBid {
            amount: Decimal::from(50_000),
            payment_method: PaymentMethod::Card,
            purpose: "smoke walk".to_string(),
            requester_id: fixtures::REQUESTER,
            department_id: fixtures::DEPARTMENT_MAIN,
            expenditure: fixtures::expenditure(),
            comment: None,
        })
        .await
        .context("create payment bid")?;

    let actors = [
        (FINANCIAL_CENTER, fixtures::FAC),
        (COST_CENTER, fixtures::CC),
        (PARALEGAL, fixtures::PARALEGAL_APPROVER),
        (AUDIT, fixtures::AUDITOR),
        (OWNER, fixtures::OWNER),
        (ACCOUNTANT_CARD, fixtures::ACCOUNTANT),
        (TELLER_CARD, fixtures::TELLER),
    ];

    let bid_id = created.bid.id;
    let mut stage = created.activation.activated;
    let mut decisions = 0usize;
    let mut closed = created.activation.closed;
    while let Some(current) = stage {
        let actor: WorkerId = actors
            .iter()
            .find(|(s, _)| *s == current)
            .map(|(_, worker)| *worker)
            .ok_or_else(|| anyhow!("no seeded approver for stage `{}`", current.as_str()))?;
        let decided = service
            .decide_payment_bid(bid_id, actor, Decision::Approve, None)
            .await
            .with_context(|| format!("approve stage `{}`", current.as_str()))?;
        decisions += 1;
        stage = decided.outcome.activated;
        closed = decided.outcome.closed;
    }
    if !closed {
        return Err(anyhow!("walk ended with the bid still open"));
    }

    let delivered = notifier.sent().await.len();
    pool.close().await;
    Ok(format!(
        "payment bid #{bid_id} fully approved after {decisions} decisions, {delivered} notices delivered"
    ))
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due to previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
