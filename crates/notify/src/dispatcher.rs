//! Target resolution and fan-out.
//!
//! Dispatch runs after the triggering transition is committed, so nothing
//! here returns an error to the caller: failures are logged, counted in the
//! report, and dropped.

use std::sync::Arc;

use tracing::warn;

use greenlight_core::resolve::{NotifyTarget, WorkerDirectory};

use crate::notifier::Notifier;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
    /// Workers matched the target but have no chat to reach them on.
    pub unreachable: usize,
    /// True when the target resolved to nobody, a data-integrity condition.
    pub empty_target: bool,
}

pub struct Dispatcher {
    directory: Arc<dyn WorkerDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(directory: Arc<dyn WorkerDirectory>, notifier: Arc<dyn Notifier>) -> Self {
        Self { directory, notifier }
    }

    pub async fn dispatch(
        &self,
        target: &NotifyTarget,
        text: &str,
        correlation_id: &str,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        let workers = match target.resolve(self.directory.as_ref()).await {
            Ok(workers) => workers,
            Err(err) => {
                warn!(
                    event_name = "notify.resolve_failed",
                    correlation_id,
                    error = %err,
                    "coordinator resolution failed; notification dropped"
                );
                report.failed += 1;
                return report;
            }
        };

        if workers.is_empty() {
            warn!(
                event_name = "notify.empty_target",
                correlation_id,
                target = ?target,
                "no coordinator matches the notification target"
            );
            report.empty_target = true;
            return report;
        }

        for worker in workers {
            let Some(chat_id) = worker.telegram_id else {
                warn!(
                    event_name = "notify.unreachable_worker",
                    correlation_id,
                    worker_id = worker.id.0,
                    "worker has no chat id; skipping"
                );
                report.unreachable += 1;
                continue;
            };
            match self.notifier.send(chat_id, text).await {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    warn!(
                        event_name = "notify.delivery_failed",
                        correlation_id,
                        worker_id = worker.id.0,
                        error = %err,
                        "delivery failed; message dropped"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::RecordingNotifier;
    use greenlight_core::domain::{
        ApprovalScope, DepartmentId, PostId, Worker, WorkerId,
    };
    use greenlight_db::repositories::InMemoryWorkerDirectory;

    fn worker(id: i64, telegram_id: Option<i64>, department: i64) -> Worker {
        Worker {
            id: WorkerId(id),
            first_name: "Test".into(),
            last_name: format!("Worker{id}"),
            patronymic: None,
            phone_number: String::new(),
            telegram_id,
            post_id: PostId(1),
            department_id: DepartmentId(department),
        }
    }

    #[tokio::test]
    async fn fans_out_to_every_scope_member() {
        let directory = Arc::new(InMemoryWorkerDirectory::new());
        directory.add(worker(1, Some(101), 1), vec![ApprovalScope::PaymentAudit]).await;
        directory.add(worker(2, Some(102), 1), vec![ApprovalScope::PaymentAudit]).await;
        directory.add(worker(3, Some(103), 1), vec![ApprovalScope::PaymentOwner]).await;
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = Dispatcher::new(directory, notifier.clone());

        let report = dispatcher
            .dispatch(&NotifyTarget::Scope(ApprovalScope::PaymentAudit), "new bid", "corr")
            .await;

        assert_eq!(report.delivered, 2);
        assert!(!report.empty_target);
        let chats: Vec<i64> = notifier.sent().await.iter().map(|(chat, _)| *chat).collect();
        assert_eq!(chats, vec![101, 102]);
    }

    #[tokio::test]
    async fn department_scope_narrows_delivery() {
        let directory = Arc::new(InMemoryWorkerDirectory::new());
        directory.add(worker(1, Some(101), 1), vec![ApprovalScope::PaymentTellerCash]).await;
        directory.add(worker(2, Some(102), 2), vec![ApprovalScope::PaymentTellerCash]).await;
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = Dispatcher::new(directory, notifier.clone());

        let report = dispatcher
            .dispatch(
                &NotifyTarget::DepartmentScope {
                    scope: ApprovalScope::PaymentTellerCash,
                    department: DepartmentId(2),
                },
                "cash payout",
                "corr",
            )
            .await;

        assert_eq!(report.delivered, 1);
        assert_eq!(notifier.sent().await[0].0, 102);
    }

    #[tokio::test]
    async fn empty_target_is_reported_not_errored() {
        let directory = Arc::new(InMemoryWorkerDirectory::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = Dispatcher::new(directory, notifier);

        let report = dispatcher
            .dispatch(&NotifyTarget::Worker(WorkerId(404)), "hello", "corr")
            .await;

        assert!(report.empty_target);
        assert_eq!(report.delivered, 0);
    }

    #[tokio::test]
    async fn workers_without_chat_ids_are_counted_unreachable() {
        let directory = Arc::new(InMemoryWorkerDirectory::new());
        directory.add(worker(1, None, 1), vec![ApprovalScope::HiringSecurity]).await;
        directory.add(worker(2, Some(102), 1), vec![ApprovalScope::HiringSecurity]).await;
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = Dispatcher::new(directory, notifier);

        let report = dispatcher
            .dispatch(&NotifyTarget::Scope(ApprovalScope::HiringSecurity), "candidate", "corr")
            .await;

        assert_eq!(report.unreachable, 1);
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn delivery_failures_never_escape() {
        let directory = Arc::new(InMemoryWorkerDirectory::new());
        directory.add(worker(1, Some(101), 1), vec![ApprovalScope::PaymentAudit]).await;
        let notifier = Arc::new(RecordingNotifier::failing());
        let dispatcher = Dispatcher::new(directory, notifier);

        let report = dispatcher
            .dispatch(&NotifyTarget::Scope(ApprovalScope::PaymentAudit), "new bid", "corr")
            .await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 0);
    }
}
