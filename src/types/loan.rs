//! Loan catalog and applications

use super::approval::ApprovalStatus;
use super::ids::{AccountId, LoanApplicationId, LoanId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Static loan product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanProduct {
    pub id: LoanId,
    pub name: String,
    pub loan_type: String,
    /// Annual rate in percent
    pub interest_rate: Decimal,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub min_term_months: u32,
    pub max_term_months: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: LoanApplicationId,
    pub user_id: UserId,
    pub loan_id: LoanId,
    pub amount: Decimal,
    pub term_months: u32,
    pub purpose: String,
    /// Account credited on disbursement
    pub deposit_account_id: AccountId,
    pub status: ApprovalStatus,
    pub reviewed_by: Option<UserId>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Loan application input
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoanRequest {
    pub loan_id: LoanId,
    pub amount: String,
    pub term_months: u32,
    pub purpose: String,
    pub deposit_account_id: AccountId,
}
