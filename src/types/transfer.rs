//! Inputs and receipts of intra-bank movements

use super::bill::{Bill, BillPayment};
use super::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Intra-bank fund transfer input
///
/// Accounts are addressed by account number; the destination may belong to
/// any user.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FundTransfer {
    pub from_account_number: String,
    pub to_account_number: String,
    /// Decimal amount as entered by the user
    pub amount: String,
    pub description: String,
}

impl FundTransfer {
    pub fn new(from: &str, to: &str, amount: &str, description: &str) -> Self {
        FundTransfer {
            from_account_number: from.to_string(),
            to_account_number: to.to_string(),
            amount: amount.to_string(),
            description: description.to_string(),
        }
    }
}

/// Both legs of a completed transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReceipt {
    pub reference: String,
    pub debit: Transaction,
    pub credit: Transaction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillPaymentReceipt {
    pub bill: Bill,
    pub payment: BillPayment,
    pub transaction: Transaction,
}
