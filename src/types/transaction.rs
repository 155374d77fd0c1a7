//! Transaction-related types for the bank ledger
//!
//! A [`Transaction`] is an immutable log entry for one leg of a ledger movement.
//! Paired legs (debit and credit) share a reference string instead of a foreign
//! key. Only the categorization metadata may change after creation.

use super::ids::{AccountId, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What kind of movement produced the entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Cash in: opening balance, manual deposit, incoming intra-bank transfer
    Deposit,
    /// Cash out: outgoing intra-bank transfer, bill payment, international transfer
    Withdrawal,
    CryptoPurchase,
    CryptoExchange,
    CryptoTransfer,
    LoanDisbursement,
    /// Reversal of a failed international transfer
    Refund,
}

/// Which side of the account the entry moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// Currency-conversion details attached to cross-currency legs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionMeta {
    pub original_amount: Decimal,
    pub original_currency: String,
    pub exchange_rate: Decimal,
}

/// Ledger log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    /// Always positive; [`Transaction::direction`] carries the sign
    pub amount: Decimal,
    pub tx_type: TransactionType,
    pub direction: Direction,
    pub status: TransactionStatus,
    pub description: String,
    /// Shared by all legs produced by one mutation operation
    pub reference: String,
    /// Counter-party account numbers, when there is one
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    pub conversion: Option<ConversionMeta>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Balance effect of the entry: positive for credits, negative for debits
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::Credit => self.amount,
            Direction::Debit => -self.amount,
        }
    }
}

/// Store-level input for a new transaction row
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub tx_type: TransactionType,
    pub direction: Direction,
    pub status: TransactionStatus,
    pub description: String,
    pub reference: String,
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    pub conversion: Option<ConversionMeta>,
}

impl NewTransaction {
    /// Completed credit leg
    pub fn credit(
        account_id: AccountId,
        amount: Decimal,
        tx_type: TransactionType,
        description: &str,
        reference: &str,
    ) -> Self {
        NewTransaction {
            account_id,
            amount,
            tx_type,
            direction: Direction::Credit,
            status: TransactionStatus::Completed,
            description: description.to_string(),
            reference: reference.to_string(),
            from_account: None,
            to_account: None,
            conversion: None,
        }
    }

    /// Completed debit leg
    pub fn debit(
        account_id: AccountId,
        amount: Decimal,
        tx_type: TransactionType,
        description: &str,
        reference: &str,
    ) -> Self {
        NewTransaction {
            direction: Direction::Debit,
            ..NewTransaction::credit(account_id, amount, tx_type, description, reference)
        }
    }

    pub fn from_account(mut self, account_number: &str) -> Self {
        self.from_account = Some(account_number.to_string());
        self
    }

    pub fn to_account(mut self, account_number: &str) -> Self {
        self.to_account = Some(account_number.to_string());
        self
    }

    pub fn with_conversion(mut self, conversion: ConversionMeta) -> Self {
        self.conversion = Some(conversion);
        self
    }
}

/// Post-hoc categorization of a transaction
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CategoryUpdate {
    pub category: String,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

/// Result of a category suggestion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySuggestion {
    pub category: String,
    pub subcategory: String,
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_amount_follows_direction() {
        let credit =
            NewTransaction::credit(1, Decimal::new(4000, 2), TransactionType::Deposit, "in", "REF");
        let debit = NewTransaction::debit(
            1,
            Decimal::new(4000, 2),
            TransactionType::Withdrawal,
            "out",
            "REF",
        );
        assert_eq!(credit.direction, Direction::Credit);
        assert_eq!(debit.direction, Direction::Debit);
        assert_eq!(debit.reference, credit.reference);

        let tx = Transaction {
            id: 1,
            account_id: 1,
            amount: debit.amount,
            tx_type: debit.tx_type,
            direction: debit.direction,
            status: debit.status,
            description: debit.description,
            reference: debit.reference,
            from_account: None,
            to_account: None,
            conversion: None,
            category: None,
            subcategory: None,
            tags: Vec::new(),
            notes: None,
            created_at: Utc::now(),
        };
        assert_eq!(tx.signed_amount(), Decimal::new(-4000, 2));
    }

    #[test]
    fn test_transaction_type_serializes_snake_case() {
        let json = serde_json::to_string(&TransactionType::CryptoPurchase).unwrap();
        assert_eq!(json, "\"crypto_purchase\"");
    }
}
