//! Statement generation
//!
//! A statement is derived entirely from an account's current balance and its
//! transaction log: walking backwards from the balance gives the closing
//! balance of the period, and walking back over the period gives the opening
//! balance. Failed transactions have no balance effect and are left out.

use crate::core::money::round_to;
use crate::types::{Account, AccountId, Direction, LedgerError, Transaction, TransactionStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub account_id: AccountId,
    pub account_number: String,
    pub currency: String,
    pub period_start: DateTime<Utc>,
    /// Exclusive
    pub period_end: DateTime<Utc>,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    pub total_credits: Decimal,
    pub total_debits: Decimal,
    /// Oldest first
    pub transactions: Vec<Transaction>,
}

/// Build the statement of `account` for `[start, end)`
///
/// # Arguments
///
/// * `account` - Account with its current balance
/// * `transactions` - The account's transaction log, in any order
/// * `start` - Inclusive period start
/// * `end` - Exclusive period end
///
/// # Errors
///
/// Returns `Validation` if `start` is after `end`.
pub fn build_statement(
    account: &Account,
    transactions: &[Transaction],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Statement, LedgerError> {
    if start > end {
        return Err(LedgerError::validation("from", "must not be after the end of the period"));
    }

    let effective = transactions
        .iter()
        .filter(|t| t.account_id == account.id && t.status != TransactionStatus::Failed);

    let mut after_period = Decimal::ZERO;
    let mut total_credits = Decimal::ZERO;
    let mut total_debits = Decimal::ZERO;
    let mut in_period: Vec<Transaction> = Vec::new();

    let overflow = || LedgerError::arithmetic_overflow("statement", account.id);
    for tx in effective {
        if tx.created_at >= end {
            after_period = after_period.checked_add(tx.signed_amount()).ok_or_else(overflow)?;
        } else if tx.created_at >= start {
            let total = match tx.direction {
                Direction::Credit => &mut total_credits,
                Direction::Debit => &mut total_debits,
            };
            *total = total.checked_add(tx.amount).ok_or_else(overflow)?;
            in_period.push(tx.clone());
        }
    }
    in_period.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

    let scale = account.scale();
    let closing = account.balance.checked_sub(after_period).ok_or_else(overflow)?;
    let net = total_credits.checked_sub(total_debits).ok_or_else(overflow)?;
    let opening = closing.checked_sub(net).ok_or_else(overflow)?;

    Ok(Statement {
        account_id: account.id,
        account_number: account.account_number.clone(),
        currency: account.currency.clone(),
        period_start: start,
        period_end: end,
        opening_balance: round_to(opening, scale),
        closing_balance: round_to(closing, scale),
        total_credits: round_to(total_credits, scale),
        total_debits: round_to(total_debits, scale),
        transactions: in_period,
    })
}

#[derive(Serialize)]
struct StatementRow<'a> {
    date: String,
    reference: &'a str,
    description: &'a str,
    #[serde(rename = "type")]
    tx_type: String,
    credit: String,
    debit: String,
    balance: String,
}

/// Write a statement as CSV: one row per transaction with a running balance
pub fn write_statement_csv<W: Write>(statement: &Statement, writer: W) -> Result<(), LedgerError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut running = statement.opening_balance;

    for tx in &statement.transactions {
        running += tx.signed_amount();
        let (credit, debit) = match tx.direction {
            Direction::Credit => (tx.amount.to_string(), String::new()),
            Direction::Debit => (String::new(), tx.amount.to_string()),
        };
        csv_writer.serialize(StatementRow {
            date: tx.created_at.to_rfc3339(),
            reference: &tx.reference,
            description: &tx.description,
            tx_type: serde_json::to_value(tx.tx_type)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            credit,
            debit,
            balance: running.to_string(),
        })?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountType, TransactionType};
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    fn account(balance: Decimal) -> Account {
        Account {
            id: 1,
            user_id: 1,
            account_number: "1000000001".to_string(),
            account_type: AccountType::Checking,
            balance,
            currency: "USD".to_string(),
            is_crypto: false,
            created_at: at(1),
        }
    }

    fn tx(
        id: u32,
        day: u32,
        cents: i64,
        direction: Direction,
        status: TransactionStatus,
    ) -> Transaction {
        Transaction {
            id,
            account_id: 1,
            amount: Decimal::new(cents, 2),
            tx_type: match direction {
                Direction::Credit => TransactionType::Deposit,
                Direction::Debit => TransactionType::Withdrawal,
            },
            direction,
            status,
            description: format!("tx {}", id),
            reference: format!("REF-{}", id),
            from_account: None,
            to_account: None,
            conversion: None,
            category: None,
            subcategory: None,
            tags: Vec::new(),
            notes: None,
            created_at: at(day),
        }
    }

    fn log() -> Vec<Transaction> {
        use Direction::*;
        use TransactionStatus::*;
        vec![
            tx(1, 2, 10000, Credit, Completed), // before
            tx(2, 10, 2500, Debit, Completed),  // in period
            tx(3, 12, 5000, Credit, Completed), // in period
            tx(4, 14, 9999, Debit, Failed),     // in period, no effect
            tx(5, 25, 1000, Debit, Completed),  // after
        ]
    }

    #[test]
    fn test_opening_and_closing_balances() {
        // 100.00 - 25.00 + 50.00 - 10.00
        let statement =
            build_statement(&account(Decimal::new(11500, 2)), &log(), at(5), at(20)).unwrap();

        assert_eq!(statement.closing_balance, Decimal::new(12500, 2));
        assert_eq!(statement.opening_balance, Decimal::new(10000, 2));
        assert_eq!(statement.total_credits, Decimal::new(5000, 2));
        assert_eq!(statement.total_debits, Decimal::new(2500, 2));
        let ids: Vec<u32> = statement.transactions.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_empty_period() {
        let statement =
            build_statement(&account(Decimal::new(11500, 2)), &log(), at(26), at(28)).unwrap();
        assert_eq!(statement.opening_balance, statement.closing_balance);
        assert!(statement.transactions.is_empty());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let result = build_statement(&account(Decimal::ZERO), &[], at(20), at(5));
        assert!(matches!(result, Err(LedgerError::Validation { .. })));
    }

    #[test]
    fn test_csv_export_has_running_balance() {
        let statement =
            build_statement(&account(Decimal::new(11500, 2)), &log(), at(5), at(20)).unwrap();
        let mut out = Vec::new();
        write_statement_csv(&statement, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "date,reference,description,type,credit,debit,balance");
        assert!(lines[1].ends_with(",withdrawal,,25.00,75.00"));
        assert!(lines[2].ends_with(",deposit,50.00,,125.00"));
    }
}
