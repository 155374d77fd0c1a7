//! External bank accounts and international transfers

use super::ids::{AccountId, ExternalAccountId, InternationalTransferId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Foreign bank account registered as a transfer destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalBankAccount {
    pub id: ExternalAccountId,
    pub user_id: UserId,
    pub bank_name: String,
    pub account_holder: String,
    pub account_number: String,
    pub swift_code: String,
    pub country: String,
    /// Currency the foreign account is held in
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Create/update input for an external account
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExternalAccountDetails {
    pub bank_name: String,
    pub account_holder: String,
    pub account_number: String,
    pub swift_code: String,
    pub country: String,
    pub currency: String,
}

/// Lifecycle of an international transfer
///
/// `Pending` moves to `Completed` once its settlement time has passed, or to
/// `Failed` (with a refund) when an administrator fails it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternationalTransferStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for InternationalTransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InternationalTransferStatus::Pending => "pending",
            InternationalTransferStatus::Processing => "processing",
            InternationalTransferStatus::Completed => "completed",
            InternationalTransferStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternationalTransfer {
    pub id: InternationalTransferId,
    pub user_id: UserId,
    pub from_account_id: AccountId,
    pub external_account_id: ExternalAccountId,
    /// Amount in the source currency, before fees
    pub amount: Decimal,
    pub source_currency: String,
    pub target_currency: String,
    pub exchange_rate: Decimal,
    pub fee: Decimal,
    /// Amount the beneficiary receives, in the target currency
    pub converted_amount: Decimal,
    /// Amount debited from the source account (amount + fee)
    pub total_debit: Decimal,
    pub purpose: String,
    pub status: InternationalTransferStatus,
    pub reference: String,
    pub estimated_delivery: DateTime<Utc>,
    /// Earliest time the settlement pass may complete the transfer
    pub settle_after: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User request for an international transfer
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InternationalRequest {
    pub from_account_id: AccountId,
    pub external_account_id: ExternalAccountId,
    pub amount: String,
    pub purpose: String,
}
