//! Shared approval lifecycle
//!
//! Loan applications, crypto transfer requests and transfer requests all follow
//! `pending -> approved -> completed` or `pending -> rejected`.

use crate::types::LedgerError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl ApprovalStatus {
    /// Rejected and completed records never change again
    pub fn is_terminal(self) -> bool {
        matches!(self, ApprovalStatus::Rejected | ApprovalStatus::Completed)
    }

    /// Fail with `InvalidState` unless the record is still pending
    pub fn ensure_pending(self, entity: &str, id: u32, operation: &str) -> Result<(), LedgerError> {
        if self == ApprovalStatus::Pending {
            Ok(())
        } else {
            Err(LedgerError::invalid_state(entity, id, self, operation))
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Completed => "completed",
        };
        f.write_str(name)
    }
}
