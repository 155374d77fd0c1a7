//! CSV format handling for script records and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - ScriptRecord structure for deserialization
//! - Conversion from script records to [`Command`]s
//! - Account output serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Script columns
//!
//! Every row has the columns `op,user,from,to,amount,detail`. What `from`, `to`
//! and `detail` mean depends on the operation:
//!
//! | op | from | to | amount | detail |
//! |----|------|----|--------|--------|
//! | register, register-admin | | | | password |
//! | open, open-savings | | account number (optional) | initial deposit | currency (default USD) |
//! | deposit | | account number | amount | description |
//! | transfer, request-transfer | source number | destination number | amount | description |
//! | bill | | payee account number | amount | payee name |
//! | pay-bill | account number | bill id | amount (optional) | |
//! | external | | external account number | | currency |
//! | international | account number | external account id | amount | purpose |
//! | fail-international | | transfer id | | reason |
//! | buy-crypto | account number | symbol | amount | |
//! | exchange-crypto | source symbol | target symbol | amount | |
//! | approve-*, reject-* | | request id | | note |
//! | apply-loan | deposit account number | loan product id | amount | term months |
//! | disburse-loan | | application id | | |
//! | request-crypto-transfer | symbol | account number or `@user` | amount | note |
//! | categorize | | transaction id | | `category[/subcategory]` |

use crate::types::{Account, AccountType, Command, LedgerError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// One row of a replay script
///
/// Missing trailing columns deserialize as empty strings.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ScriptRecord {
    pub op: String,
    pub user: String,
    pub from: String,
    pub to: String,
    pub amount: String,
    pub detail: String,
}

impl ScriptRecord {
    pub fn new(op: &str, user: &str, from: &str, to: &str, amount: &str, detail: &str) -> Self {
        ScriptRecord {
            op: op.to_string(),
            user: user.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            amount: amount.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// Convert a ScriptRecord to a Command
///
/// Only the shape of the row is checked here: required columns present, ids
/// and whole-number fields numeric. Amount strings that the engine validates
/// itself are passed through untouched so the rejection is reported by the
/// operation that owns the rule.
///
/// # Returns
///
/// * `Ok(Command)` - Successfully converted record
/// * `Err(LedgerError::Validation)` - Unknown operation or malformed column
pub fn convert_script_record(record: ScriptRecord) -> Result<Command, LedgerError> {
    let op = record.op.trim().to_ascii_lowercase();
    if op == "settle" {
        return Ok(Command::Settle);
    }

    let username = required("user", &record.user)?;
    let note = optional(&record.detail);

    let command = match op.as_str() {
        "register" | "register-admin" => Command::Register {
            username,
            password: required("detail", &record.detail)?,
            admin: op == "register-admin",
        },

        "open" | "open-savings" => Command::OpenAccount {
            username,
            account_number: optional(&record.to),
            account_type: if op == "open" {
                AccountType::Checking
            } else {
                AccountType::Savings
            },
            currency: optional(&record.detail).unwrap_or_else(|| "USD".to_string()),
            initial_deposit: decimal_or_zero("amount", &record.amount)?,
        },

        "deposit" => Command::Deposit {
            username,
            account_number: required("to", &record.to)?,
            amount: record.amount,
            description: record.detail,
        },

        "transfer" => Command::Transfer {
            username,
            from: required("from", &record.from)?,
            to: required("to", &record.to)?,
            amount: record.amount,
            description: record.detail,
        },

        "request-transfer" => Command::RequestTransfer {
            username,
            from: required("from", &record.from)?,
            to: required("to", &record.to)?,
            amount: record.amount,
            description: record.detail,
        },

        "bill" => Command::CreateBill {
            username,
            payee_account_number: required("to", &record.to)?,
            payee_name: required("detail", &record.detail)?,
            amount: decimal_or_zero("amount", &record.amount)?,
        },

        "pay-bill" => Command::PayBill {
            username,
            account_number: required("from", &record.from)?,
            bill_id: id("to", &record.to)?,
            amount: record.amount,
        },

        "external" => Command::AddExternalAccount {
            username,
            account_number: required("to", &record.to)?,
            currency: required("detail", &record.detail)?,
        },

        "international" => Command::SendInternational {
            username,
            account_number: required("from", &record.from)?,
            external_account_id: id("to", &record.to)?,
            amount: record.amount,
            purpose: record.detail,
        },

        "fail-international" => Command::FailInternational {
            username,
            transfer_id: id("to", &record.to)?,
            reason: record.detail,
        },

        "buy-crypto" => Command::BuyCrypto {
            username,
            account_number: required("from", &record.from)?,
            symbol: required("to", &record.to)?,
            amount: record.amount,
        },

        "exchange-crypto" => Command::ExchangeCrypto {
            username,
            source_symbol: required("from", &record.from)?,
            target_symbol: required("to", &record.to)?,
            amount: record.amount,
        },

        "approve-transfer" | "reject-transfer" => Command::ReviewTransfer {
            username,
            request_id: id("to", &record.to)?,
            approve: op.starts_with("approve"),
            note,
        },

        "apply-loan" => Command::ApplyLoan {
            username,
            account_number: required("from", &record.from)?,
            loan_id: id("to", &record.to)?,
            amount: record.amount,
            term_months: id("detail", &record.detail)?,
        },

        "approve-loan" | "reject-loan" => Command::ReviewLoan {
            username,
            application_id: id("to", &record.to)?,
            approve: op.starts_with("approve"),
            note,
        },

        "disburse-loan" => Command::DisburseLoan {
            username,
            application_id: id("to", &record.to)?,
        },

        "request-crypto-transfer" => Command::RequestCryptoTransfer {
            username,
            source_symbol: required("from", &record.from)?,
            to: required("to", &record.to)?,
            amount: record.amount,
            note: record.detail,
        },

        "approve-crypto-transfer" | "reject-crypto-transfer" => Command::ReviewCryptoTransfer {
            username,
            request_id: id("to", &record.to)?,
            approve: op.starts_with("approve"),
            note,
        },

        "categorize" => {
            let detail = required("detail", &record.detail)?;
            let (category, subcategory) = match detail.split_once('/') {
                Some((category, sub)) => (category.trim().to_string(), optional(sub)),
                None => (detail, None),
            };
            Command::Categorize {
                username,
                transaction_id: id("to", &record.to)?,
                category,
                subcategory,
            }
        }

        _ => {
            return Err(LedgerError::validation(
                "op",
                format!("unknown operation '{}'", record.op),
            ))
        }
    };

    Ok(command)
}

fn required(field: &str, value: &str) -> Result<String, LedgerError> {
    optional(value).ok_or_else(|| LedgerError::validation(field, "is required"))
}

fn optional(value: &str) -> Option<String> {
    match value.trim() {
        "" => None,
        trimmed => Some(trimmed.to_string()),
    }
}

fn id(field: &str, value: &str) -> Result<u32, LedgerError> {
    let value = required(field, value)?;
    value
        .parse::<u32>()
        .map_err(|_| LedgerError::validation(field, format!("'{}' is not a valid id", value)))
}

fn decimal_or_zero(field: &str, value: &str) -> Result<Decimal, LedgerError> {
    match value.trim() {
        "" => Ok(Decimal::ZERO),
        trimmed => Decimal::from_str(trimmed)
            .map_err(|_| LedgerError::validation(field, format!("'{}' is not a number", trimmed))),
    }
}

/// Write account states to CSV format
///
/// Writes accounts in CSV format with columns: account, owner, type, currency, balance.
/// Accounts are sorted by id for deterministic output and balances are printed at
/// the account's scale (2 places for fiat, 8 for crypto).
///
/// # Arguments
///
/// * `accounts` - Slice of account states to write
/// * `output` - Mutable reference to a writer for outputting CSV
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["account", "owner", "type", "currency", "balance"])?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer.write_record(&[
            account.account_number.clone(),
            account.user_id.to_string(),
            account.account_type.to_string(),
            account.currency.clone(),
            format!("{:.*}", account.scale() as usize, account.balance),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
