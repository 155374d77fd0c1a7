//! Cryptocurrency reference data and transfer requests

use super::approval::ApprovalStatus;
use super::ids::{AccountId, CryptoTransferRequestId, TransferRequestId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Static reference data for one crypto asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cryptocurrency {
    pub symbol: String,
    pub name: String,
    /// Price of one unit in USD
    pub usd_rate: Decimal,
    /// Price of one unit in EUR
    pub eur_rate: Decimal,
    /// Smallest purchase, in units of the asset
    pub min_purchase: Decimal,
}

/// Purchase of crypto with a fiat account
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CryptoPurchase {
    pub from_account_id: AccountId,
    pub symbol: String,
    /// Fiat amount to spend
    pub amount: String,
}

/// Exchange between two crypto assets
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CryptoExchange {
    pub from_account_id: AccountId,
    pub target_symbol: String,
    /// Units of the source asset to sell
    pub amount: String,
}

/// Outcome of a purchase or exchange
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CryptoReceipt {
    pub reference: String,
    pub debited_account_id: AccountId,
    pub debited_amount: Decimal,
    pub credited_account_id: AccountId,
    pub credited_amount: Decimal,
    /// USD value that priced the trade
    pub usd_value: Decimal,
}

/// Admin-approved movement of crypto to another account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoTransferRequest {
    pub id: CryptoTransferRequestId,
    pub user_id: UserId,
    pub from_account_id: AccountId,
    pub to_account_number: String,
    pub symbol: String,
    pub amount: Decimal,
    pub note: String,
    pub status: ApprovalStatus,
    pub reviewed_by: Option<UserId>,
    pub review_note: Option<String>,
    /// Set once the movement has been booked
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCryptoTransferRequest {
    pub from_account_id: AccountId,
    pub to_account_number: String,
    pub amount: String,
    pub note: String,
}

/// Admin-approved intra-bank transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub id: TransferRequestId,
    pub user_id: UserId,
    pub from_account_id: AccountId,
    pub to_account_number: String,
    pub amount: Decimal,
    pub description: String,
    pub status: ApprovalStatus,
    pub reviewed_by: Option<UserId>,
    pub review_note: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTransferRequest {
    pub from_account_id: AccountId,
    pub to_account_number: String,
    pub amount: String,
    pub description: String,
}
