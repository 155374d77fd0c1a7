//! Account-related types for the bank ledger
//!
//! This module defines the Account structure and the input used to open one.

use super::ids::{AccountId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of decimal places kept on fiat balances
pub const FIAT_SCALE: u32 = 2;

/// Number of decimal places kept on crypto balances
pub const CRYPTO_SCALE: u32 = 8;

/// Kind of account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Checking,
    Savings,
    Crypto,
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::Crypto => "crypto",
        };
        f.write_str(name)
    }
}

/// Ledger account
///
/// Belongs to exactly one user. The balance is only ever changed by the engine's
/// mutation operations and is never allowed to go negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Store-assigned identifier
    pub id: AccountId,

    /// Owner of the account
    pub user_id: UserId,

    /// Public account number used by transfers (unique across the ledger)
    pub account_number: String,

    pub account_type: AccountType,

    /// Current balance, kept at [`Account::scale`] decimal places
    pub balance: Decimal,

    /// ISO currency code for fiat accounts, asset symbol for crypto accounts
    pub currency: String,

    /// Whether this account holds a cryptocurrency
    pub is_crypto: bool,

    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Decimal places kept on this account's balance
    pub fn scale(&self) -> u32 {
        if self.is_crypto {
            CRYPTO_SCALE
        } else {
            FIAT_SCALE
        }
    }
}

/// Input for opening a fiat account
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenAccount {
    pub account_type: AccountType,
    pub currency: String,
    /// Opening balance, recorded as a deposit when positive
    pub initial_deposit: Decimal,
    /// Explicit account number; generated when absent
    pub account_number: Option<String>,
}

impl OpenAccount {
    pub fn checking(currency: &str, initial_deposit: Decimal) -> Self {
        OpenAccount {
            account_type: AccountType::Checking,
            currency: currency.to_string(),
            initial_deposit,
            account_number: None,
        }
    }

    pub fn with_number(mut self, account_number: &str) -> Self {
        self.account_number = Some(account_number.to_string());
        self
    }
}

/// Store-level input for a new account row
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub user_id: UserId,
    pub account_number: Option<String>,
    pub account_type: AccountType,
    pub currency: String,
    pub is_crypto: bool,
}
