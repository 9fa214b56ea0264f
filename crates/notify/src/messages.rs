//! Message texts per workflow event. Plain text; the chat client renders
//! nothing fancier.

use chrono::{DateTime, Utc};

use greenlight_core::domain::{PaymentBid, Ticket, WorkerBid};

fn fmt_when(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

pub fn payment_stage_assigned(bid: &PaymentBid) -> String {
    format!(
        "Payment bid #{} is awaiting your approval.\nAmount: {} ({})\nPurpose: {}\nExpenditure: {}",
        bid.id,
        bid.amount,
        bid.payment_method.as_str(),
        bid.purpose,
        bid.expenditure.name,
    )
}

pub fn payment_bid_approved(bid: &PaymentBid) -> String {
    format!("Payment bid #{} was fully approved. Amount: {}.", bid.id, bid.amount)
}

pub fn payment_bid_denied(bid: &PaymentBid) -> String {
    let reason = bid.denial_reason.as_deref().unwrap_or("no reason given");
    format!("Payment bid #{} was denied: {}.", bid.id, reason)
}

pub fn hiring_stage_assigned(bid: &WorkerBid) -> String {
    format!(
        "Hiring bid #{} is awaiting your review.\nCandidate: {}\nPhone: {}",
        bid.id,
        bid.candidate.full_name(),
        bid.candidate.phone_number,
    )
}

pub fn hiring_approved(bid: &WorkerBid) -> String {
    format!("Hiring bid #{}: {} was approved for employment.", bid.id, bid.candidate.full_name())
}

pub fn hiring_denied(bid: &WorkerBid) -> String {
    let reason = bid.denial_reason.as_deref().unwrap_or("no reason given");
    format!("Hiring bid #{}: {} was rejected: {}.", bid.id, bid.candidate.full_name(), reason)
}

pub fn ticket_repair_assigned(ticket: &Ticket) -> String {
    format!(
        "Ticket #{}: {}.\n{}\nDeadline: {}",
        ticket.id,
        ticket.problem.name,
        ticket.description,
        fmt_when(ticket.deadline),
    )
}

pub fn ticket_awaiting_confirmation(ticket: &Ticket) -> String {
    format!(
        "Ticket #{}: the repairman reports {} as fixed. Please score the work 1-5.",
        ticket.id, ticket.problem.name,
    )
}

pub fn ticket_reopened(ticket: &Ticket, rework_deadline: DateTime<Utc>) -> String {
    format!(
        "Ticket #{} was sent back for rework. New deadline: {}.",
        ticket.id,
        fmt_when(rework_deadline),
    )
}

pub fn ticket_closed(ticket: &Ticket) -> String {
    format!("Ticket #{} ({}) is confirmed fixed and closed.", ticket.id, ticket.problem.name)
}

pub fn ticket_closed_unresolved(ticket: &Ticket) -> String {
    format!(
        "Ticket #{} ({}) was closed unresolved after a failed rework.",
        ticket.id, ticket.problem.name,
    )
}

pub fn ticket_cancelled(ticket: &Ticket) -> String {
    format!("Ticket #{} ({}) was cancelled.", ticket.id, ticket.problem.name)
}
