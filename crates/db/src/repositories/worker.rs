use async_trait::async_trait;
use sqlx::Row;

use greenlight_core::domain::{ApprovalScope, DepartmentId, PostId, Worker, WorkerId};
use greenlight_core::resolve::{DirectoryError, WorkerDirectory};

use crate::DbPool;

/// Worker lookups for coordinator resolution. Post scopes are stored as a
/// JSON string array; pools are small, so scope filtering happens after
/// decode rather than in SQL.
pub struct SqlWorkerRepository {
    pool: DbPool,
}

impl SqlWorkerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_WORKER: &str = "SELECT w.id, w.first_name, w.last_name, w.patronymic,
            w.phone_number, w.telegram_id, w.post_id, w.department_id, p.scopes
     FROM workers w
     JOIN posts p ON p.id = w.post_id";

fn row_to_worker(row: &sqlx::sqlite::SqliteRow) -> Result<(Worker, Vec<ApprovalScope>), DirectoryError> {
    let decode = |e: sqlx::Error| DirectoryError(e.to_string());

    let id: i64 = row.try_get("id").map_err(decode)?;
    let first_name: String = row.try_get("first_name").map_err(decode)?;
    let last_name: String = row.try_get("last_name").map_err(decode)?;
    let patronymic: Option<String> = row.try_get("patronymic").map_err(decode)?;
    let phone_number: String = row.try_get("phone_number").map_err(decode)?;
    let telegram_id: Option<i64> = row.try_get("telegram_id").map_err(decode)?;
    let post_id: i64 = row.try_get("post_id").map_err(decode)?;
    let department_id: i64 = row.try_get("department_id").map_err(decode)?;
    let scopes_raw: String = row.try_get("scopes").map_err(decode)?;

    let scope_names: Vec<String> = serde_json::from_str(&scopes_raw)
        .map_err(|e| DirectoryError(format!("post scopes: {e}")))?;
    let scopes = scope_names.iter().filter_map(|name| ApprovalScope::parse(name)).collect();

    Ok((
        Worker {
            id: WorkerId(id),
            first_name,
            last_name,
            patronymic,
            phone_number,
            telegram_id,
            post_id: PostId(post_id),
            department_id: DepartmentId(department_id),
        },
        scopes,
    ))
}

#[async_trait]
impl WorkerDirectory for SqlWorkerRepository {
    async fn find_by_id(&self, id: WorkerId) -> Result<Option<Worker>, DirectoryError> {
        let row = sqlx::query(&format!("{SELECT_WORKER} WHERE w.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DirectoryError(e.to_string()))?;

        match row {
            Some(ref r) => Ok(Some(row_to_worker(r)?.0)),
            None => Ok(None),
        }
    }

    async fn find_by_scope(&self, scope: ApprovalScope) -> Result<Vec<Worker>, DirectoryError> {
        let rows = sqlx::query(&format!("{SELECT_WORKER} ORDER BY w.id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DirectoryError(e.to_string()))?;

        let mut matched = Vec::new();
        for row in &rows {
            let (worker, scopes) = row_to_worker(row)?;
            if scopes.contains(&scope) {
                matched.push(worker);
            }
        }
        Ok(matched)
    }

    async fn find_by_scope_in_department(
        &self,
        scope: ApprovalScope,
        department: DepartmentId,
    ) -> Result<Vec<Worker>, DirectoryError> {
        let rows = sqlx::query(&format!("{SELECT_WORKER} WHERE w.department_id = ? ORDER BY w.id"))
            .bind(department.0)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DirectoryError(e.to_string()))?;

        let mut matched = Vec::new();
        for row in &rows {
            let (worker, scopes) = row_to_worker(row)?;
            if scopes.contains(&scope) {
                matched.push(worker);
            }
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::{connect_with_settings, migrations};

    async fn pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        fixtures::seed(&pool).await.expect("seed");
        pool
    }

    #[tokio::test]
    async fn finds_worker_by_id() {
        let repo = SqlWorkerRepository::new(pool().await);
        let worker = repo.find_by_id(fixtures::FAC).await.expect("query").expect("exists");
        assert_eq!(worker.id, fixtures::FAC);
        assert!(worker.telegram_id.is_some());
    }

    #[tokio::test]
    async fn scope_lookup_matches_post_scopes() {
        let repo = SqlWorkerRepository::new(pool().await);
        let auditors = repo.find_by_scope(ApprovalScope::PaymentAudit).await.expect("query");
        assert_eq!(auditors.iter().map(|w| w.id).collect::<Vec<_>>(), vec![fixtures::AUDITOR]);
    }

    #[tokio::test]
    async fn department_scope_lookup_narrows_the_pool() {
        let repo = SqlWorkerRepository::new(pool().await);
        let all = repo.find_by_scope(ApprovalScope::PaymentTellerCash).await.expect("query");
        assert_eq!(all.len(), 2);

        let north = repo
            .find_by_scope_in_department(
                ApprovalScope::PaymentTellerCash,
                fixtures::DEPARTMENT_NORTH,
            )
            .await
            .expect("query");
        assert_eq!(north.iter().map(|w| w.id).collect::<Vec<_>>(), vec![fixtures::TELLER_NORTH]);
    }

    #[tokio::test]
    async fn empty_scope_pool_is_empty_not_error() {
        let repo = SqlWorkerRepository::new(pool().await);
        let owners = repo
            .find_by_scope_in_department(ApprovalScope::PaymentOwner, fixtures::DEPARTMENT_NORTH)
            .await
            .expect("query");
        assert!(owners.is_empty());
    }
}
