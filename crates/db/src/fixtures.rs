//! Deterministic seed data for `greenlight seed`, smoke runs and the
//! repository tests. Ids are fixed so tests can reference them directly.

use greenlight_core::domain::{
    ApprovalScope, DepartmentId, Expenditure, ExpenditureId, PostId, Problem, ProblemId,
    TicketKind, WorkerId,
};

use crate::repositories::RepositoryError;
use crate::DbPool;

pub const DEPARTMENT_MAIN: DepartmentId = DepartmentId(1);
pub const DEPARTMENT_NORTH: DepartmentId = DepartmentId(2);

pub const POST_MANAGER: PostId = PostId(1);
pub const POST_COOK: PostId = PostId(10);

pub const FAC: WorkerId = WorkerId(1);
pub const CC: WorkerId = WorkerId(2);
pub const PARALEGAL_APPROVER: WorkerId = WorkerId(3);
pub const AUDITOR: WorkerId = WorkerId(4);
pub const OWNER: WorkerId = WorkerId(5);
pub const ACCOUNTANT: WorkerId = WorkerId(6);
pub const TELLER: WorkerId = WorkerId(7);
pub const SECURITY_OFFICER: WorkerId = WorkerId(8);
pub const HR_ACCOUNTANT: WorkerId = WorkerId(9);
pub const REQUESTER: WorkerId = WorkerId(10);
pub const REPAIRMAN: WorkerId = WorkerId(11);
pub const APPRAISER: WorkerId = WorkerId(12);
pub const TELLER_NORTH: WorkerId = WorkerId(13);

/// Seeded expenditure row 1, as a domain value.
pub fn expenditure() -> Expenditure {
    Expenditure {
        id: ExpenditureId(1),
        name: "Equipment maintenance".to_owned(),
        fac: FAC,
        cc: CC,
        paralegal: PARALEGAL_APPROVER,
    }
}

pub fn technical_problem() -> Problem {
    Problem {
        id: ProblemId(1),
        kind: TicketKind::Technical,
        name: "Kitchen equipment failure".to_owned(),
        sla_hours: 8,
    }
}

pub fn it_problem() -> Problem {
    Problem {
        id: ProblemId(2),
        kind: TicketKind::It,
        name: "POS terminal offline".to_owned(),
        sla_hours: 4,
    }
}

fn scopes_json(scopes: &[ApprovalScope]) -> String {
    let names: Vec<&str> = scopes.iter().map(|s| s.as_str()).collect();
    serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_owned())
}

/// Insert the reference data. Idempotent: rows are keyed and re-seeding an
/// already-seeded database is a no-op.
pub async fn seed(pool: &DbPool) -> Result<(), RepositoryError> {
    for (id, name, address) in [
        (DEPARTMENT_MAIN.0, "Central", "12 Market St"),
        (DEPARTMENT_NORTH.0, "North", "4 Hillside Ave"),
    ] {
        sqlx::query("INSERT OR IGNORE INTO departments (id, name, address) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(address)
            .execute(pool)
            .await?;
    }

    let posts: [(i64, &str, Vec<ApprovalScope>); 10] = [
        (POST_MANAGER.0, "Restaurant manager", vec![]),
        (2, "Financial controller", vec![]),
        (3, "Auditor", vec![ApprovalScope::PaymentAudit]),
        (4, "Owner", vec![ApprovalScope::PaymentOwner]),
        (
            5,
            "Accountant",
            vec![ApprovalScope::PaymentAccountantCard, ApprovalScope::PaymentAccountantCash],
        ),
        (
            6,
            "Teller",
            vec![ApprovalScope::PaymentTellerCard, ApprovalScope::PaymentTellerCash],
        ),
        (7, "Security officer", vec![ApprovalScope::HiringSecurity]),
        (8, "Payroll accountant", vec![ApprovalScope::HiringAccounting]),
        (9, "Repairman", vec![]),
        (POST_COOK.0, "Cook", vec![]),
    ];
    for (id, name, scopes) in &posts {
        sqlx::query("INSERT OR IGNORE INTO posts (id, name, scopes) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(scopes_json(scopes))
            .execute(pool)
            .await?;
    }

    let workers: [(i64, &str, &str, i64, i64, i64); 13] = [
        (FAC.0, "Marina", "Volkova", 1001, 2, DEPARTMENT_MAIN.0),
        (CC.0, "Oleg", "Fedorov", 1002, 2, DEPARTMENT_MAIN.0),
        (PARALEGAL_APPROVER.0, "Daria", "Sokolova", 1003, 2, DEPARTMENT_MAIN.0),
        (AUDITOR.0, "Ivan", "Morozov", 1004, 3, DEPARTMENT_MAIN.0),
        (OWNER.0, "Sergey", "Lebedev", 1005, 4, DEPARTMENT_MAIN.0),
        (ACCOUNTANT.0, "Elena", "Kuznetsova", 1006, 5, DEPARTMENT_MAIN.0),
        (TELLER.0, "Olga", "Nikitina", 1007, 6, DEPARTMENT_MAIN.0),
        (SECURITY_OFFICER.0, "Andrey", "Orlov", 1008, 7, DEPARTMENT_MAIN.0),
        (HR_ACCOUNTANT.0, "Tatiana", "Egorova", 1009, 8, DEPARTMENT_MAIN.0),
        (REQUESTER.0, "Nikolay", "Pavlov", 1010, 1, DEPARTMENT_MAIN.0),
        (REPAIRMAN.0, "Viktor", "Stepanov", 1011, 9, DEPARTMENT_MAIN.0),
        (APPRAISER.0, "Ksenia", "Belova", 1012, 1, DEPARTMENT_MAIN.0),
        (TELLER_NORTH.0, "Galina", "Romanova", 1013, 6, DEPARTMENT_NORTH.0),
    ];
    for (id, first, last, telegram, post, department) in workers {
        sqlx::query(
            "INSERT OR IGNORE INTO workers
                 (id, first_name, last_name, phone_number, telegram_id, post_id, department_id)
             VALUES (?, ?, ?, '', ?, ?, ?)",
        )
        .bind(id)
        .bind(first)
        .bind(last)
        .bind(telegram)
        .bind(post)
        .bind(department)
        .execute(pool)
        .await?;
    }

    let exp = expenditure();
    sqlx::query(
        "INSERT OR IGNORE INTO expenditures (id, name, fac_id, cc_id, paralegal_id)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(exp.id.0)
    .bind(&exp.name)
    .bind(exp.fac.0)
    .bind(exp.cc.0)
    .bind(exp.paralegal.0)
    .execute(pool)
    .await?;

    for problem in [technical_problem(), it_problem()] {
        sqlx::query("INSERT OR IGNORE INTO problems (id, kind, name, sla_hours) VALUES (?, ?, ?, ?)")
            .bind(problem.id.0)
            .bind(problem.kind.as_str())
            .bind(&problem.name)
            .bind(i64::from(problem.sla_hours))
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// Row counts the seed is expected to leave behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub departments: i64,
    pub workers: i64,
    pub expenditures: i64,
    pub problems: i64,
}

pub async fn verify(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
    Ok(SeedSummary {
        departments: count(pool, "SELECT COUNT(*) FROM departments").await?,
        workers: count(pool, "SELECT COUNT(*) FROM workers").await?,
        expenditures: count(pool, "SELECT COUNT(*) FROM expenditures").await?,
        problems: count(pool, "SELECT COUNT(*) FROM problems").await?,
    })
}

async fn count(pool: &DbPool, sql: &str) -> Result<i64, RepositoryError> {
    let row: (i64,) = sqlx::query_as(sql).fetch_one(pool).await?;
    Ok(row.0)
}
