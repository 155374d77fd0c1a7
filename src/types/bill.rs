//! Bills and bill payments

use super::ids::{AccountId, BillId, BillPaymentId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Pending,
    Paid,
    Overdue,
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BillStatus::Pending => "pending",
            BillStatus::Paid => "paid",
            BillStatus::Overdue => "overdue",
        };
        f.write_str(name)
    }
}

/// Bill registered by a user against a payee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub user_id: UserId,
    pub payee_name: String,
    /// Account number the payment is addressed to
    pub payee_account_number: String,
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
}

/// Bill registration input
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewBill {
    pub payee_name: String,
    pub payee_account_number: String,
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
}

/// Immutable record of a bill settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillPayment {
    pub id: BillPaymentId,
    pub bill_id: BillId,
    pub account_id: AccountId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub reference: String,
    pub paid_at: DateTime<Utc>,
}
