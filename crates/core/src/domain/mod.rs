//! Chain-bearing entities and the reference data they hang off.

mod expenditure;
mod payment_bid;
mod ticket;
mod worker;
mod worker_bid;

pub use expenditure::{Expenditure, ExpenditureId};
pub use payment_bid::{PaymentBid, PaymentBidId, PaymentMethod};
pub use ticket::{Problem, ProblemId, Ticket, TicketId, TicketKind};
pub use worker::{ApprovalScope, DepartmentId, PostId, Worker, WorkerId};
pub use worker_bid::{Candidate, WorkerBid, WorkerBidId};
