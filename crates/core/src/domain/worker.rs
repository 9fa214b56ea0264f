use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepartmentId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(pub i64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Capability tag carried by a post. Scope-pooled chain stages notify every
/// worker whose post carries the matching scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalScope {
    PaymentAudit,
    PaymentOwner,
    PaymentAccountantCard,
    PaymentAccountantCash,
    PaymentTellerCard,
    PaymentTellerCash,
    HiringSecurity,
    HiringAccounting,
}

impl ApprovalScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalScope::PaymentAudit => "payment_audit",
            ApprovalScope::PaymentOwner => "payment_owner",
            ApprovalScope::PaymentAccountantCard => "payment_accountant_card",
            ApprovalScope::PaymentAccountantCash => "payment_accountant_cash",
            ApprovalScope::PaymentTellerCard => "payment_teller_card",
            ApprovalScope::PaymentTellerCash => "payment_teller_cash",
            ApprovalScope::HiringSecurity => "hiring_security",
            ApprovalScope::HiringAccounting => "hiring_accounting",
        }
    }

    pub fn parse(value: &str) -> Option<ApprovalScope> {
        match value {
            "payment_audit" => Some(ApprovalScope::PaymentAudit),
            "payment_owner" => Some(ApprovalScope::PaymentOwner),
            "payment_accountant_card" => Some(ApprovalScope::PaymentAccountantCard),
            "payment_accountant_cash" => Some(ApprovalScope::PaymentAccountantCash),
            "payment_teller_card" => Some(ApprovalScope::PaymentTellerCard),
            "payment_teller_cash" => Some(ApprovalScope::PaymentTellerCash),
            "hiring_security" => Some(ApprovalScope::HiringSecurity),
            "hiring_accounting" => Some(ApprovalScope::HiringAccounting),
            _ => None,
        }
    }
}

impl fmt::Display for ApprovalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Worker {
    pub id: WorkerId,
    pub first_name: String,
    pub last_name: String,
    pub patronymic: Option<String>,
    pub phone_number: String,
    /// Telegram chat id; workers without one cannot receive notifications.
    pub telegram_id: Option<i64>,
    pub post_id: PostId,
    pub department_id: DepartmentId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_round_trip() {
        for scope in [
            ApprovalScope::PaymentAudit,
            ApprovalScope::PaymentOwner,
            ApprovalScope::PaymentAccountantCard,
            ApprovalScope::PaymentAccountantCash,
            ApprovalScope::PaymentTellerCard,
            ApprovalScope::PaymentTellerCash,
            ApprovalScope::HiringSecurity,
            ApprovalScope::HiringAccounting,
        ] {
            assert_eq!(ApprovalScope::parse(scope.as_str()), Some(scope));
        }
        assert_eq!(ApprovalScope::parse("payment_unknown"), None);
    }
}
