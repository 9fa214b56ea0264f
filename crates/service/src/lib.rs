//! Orchestration layer: the only public entry points to the approval chains.
//!
//! Every operation follows the same shape: load the entity, run the pure
//! transition, persist through the stage-guarded update, and only then
//! dispatch notifications. A fresh correlation id ties the tracing events of
//! one operation together.

mod hiring;
mod payment;
mod tickets;

pub use hiring::{HiringDecision, WorkerBidCreated};
pub use payment::{PaymentCreated, PaymentDecision, PayoutDetails};
pub use tickets::{TicketConfirmed, TicketOpened, OpenTicket};

use std::sync::Arc;

use greenlight_core::errors::ApplicationError;
use greenlight_core::resolve::WorkerDirectory;
use greenlight_core::sla::WorkCalendar;
use greenlight_core::workflows::WorkflowSettings;
use greenlight_db::repositories::{
    PaymentBidRepository, RepositoryError, TicketRepository, WorkerBidRepository,
};
use greenlight_notify::{Dispatcher, Notifier};

pub struct ChainService {
    payment_bids: Arc<dyn PaymentBidRepository>,
    worker_bids: Arc<dyn WorkerBidRepository>,
    tickets: Arc<dyn TicketRepository>,
    dispatcher: Dispatcher,
    settings: WorkflowSettings,
    calendar: WorkCalendar,
}

impl ChainService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        payment_bids: Arc<dyn PaymentBidRepository>,
        worker_bids: Arc<dyn WorkerBidRepository>,
        tickets: Arc<dyn TicketRepository>,
        directory: Arc<dyn WorkerDirectory>,
        notifier: Arc<dyn Notifier>,
        settings: WorkflowSettings,
        calendar: WorkCalendar,
    ) -> Self {
        Self {
            payment_bids,
            worker_bids,
            tickets,
            dispatcher: Dispatcher::new(directory, notifier),
            settings,
            calendar,
        }
    }
}

fn new_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn map_repo(err: RepositoryError) -> ApplicationError {
    match err {
        RepositoryError::StaleStage { stage } => ApplicationError::StageConflict { stage },
        other => ApplicationError::Persistence(other.to_string()),
    }
}
