//! Per-workflow chain configurations: stage orders, skip rules, routing.

pub mod hiring;
pub mod maintenance;
pub mod payment;

use rust_decimal::Decimal;

/// Policy knobs shared across workflows, sourced from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkflowSettings {
    /// Owner stage is skipped for amounts strictly below this (whole currency
    /// units).
    pub owner_skip_below: i64,
    /// Confirmation scores below this reopen (or finalize) a ticket.
    pub reopen_below_score: u8,
    /// Budget for the rework pass, in working hours.
    pub rework_sla_hours: u32,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self { owner_skip_below: 30_000, reopen_below_score: 3, rework_sla_hours: 24 }
    }
}

impl WorkflowSettings {
    pub fn owner_skip_below_amount(&self) -> Decimal {
        Decimal::from(self.owner_skip_below)
    }
}
