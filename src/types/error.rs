//! Error types for the bank ledger
//!
//! This module defines every error a ledger operation can return. Errors are
//! descriptive so that the replay CLI can log them verbatim, and each one maps
//! onto a coarse [`ErrorKind`] that a request boundary can turn into a response.
//!
//! # Error Categories
//!
//! - **Validation**: malformed or missing fields, non-positive amounts
//! - **Not found**: unknown users, accounts, bills, requests
//! - **Authorization**: acting on another user's resource, non-admin approvals
//! - **Business rule**: insufficient funds, illegal status transitions
//! - **Internal**: I/O, CSV parsing, caught panics

use rust_decimal::Decimal;
use thiserror::Error;

/// Coarse classification of a [`LedgerError`]
///
/// Every rejection is local: no variant implies a retry or a compensating action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authorization,
    BusinessRule,
    Internal,
}

/// Main error type for the ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// A field failed validation before any mutation was attempted
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Name of the offending field
        field: String,
        /// What is wrong with it
        message: String,
    },

    /// Amount is not a positive number
    #[error("Invalid amount '{amount}'")]
    InvalidAmount {
        /// The amount as supplied
        amount: String,
    },

    /// Referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity name (account, bill, ...)
        entity: String,
        /// Identifier as supplied (numeric id or account number)
        id: String,
    },

    /// Actor does not own the referenced record
    #[error("User {user} may not access {entity} {id}")]
    Forbidden {
        /// Acting user
        user: u32,
        /// Entity name
        entity: String,
        /// Identifier of the record
        id: String,
    },

    /// Actor is not an administrator
    #[error("User {user} is not an administrator")]
    AdminRequired {
        /// Acting user
        user: u32,
    },

    /// Username or password did not match
    #[error("Invalid username or password")]
    AuthenticationFailed,

    /// Debit would take the balance below zero
    #[error("Insufficient funds in account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Account number
        account: String,
        /// Balance at the time of the check
        available: Decimal,
        /// Amount the operation needed
        requested: Decimal,
    },

    /// Record is not in a status that allows the operation
    #[error("Cannot {operation} {entity} {id} in status {status}")]
    InvalidState {
        /// Entity name
        entity: String,
        /// Record identifier
        id: u32,
        /// Current status
        status: String,
        /// Attempted operation
        operation: String,
    },

    /// Unique key already taken
    #[error("{entity} '{key}' already exists")]
    Duplicate {
        /// Entity name
        entity: String,
        /// The clashing key
        key: String,
    },

    /// Currency or crypto symbol missing from the rate tables
    #[error("Unsupported currency '{code}'")]
    UnknownCurrency {
        /// The code as supplied
        code: String,
    },

    /// Arithmetic overflow would occur
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account id
        account: u32,
    },

    /// I/O error while reading a script or writing output
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// Script parsing error
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// Unexpected failure caught at the request boundary
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::Parse {
            line,
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Classify the error for the request boundary
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation { .. }
            | LedgerError::InvalidAmount { .. }
            | LedgerError::UnknownCurrency { .. }
            | LedgerError::Duplicate { .. }
            | LedgerError::Parse { .. } => ErrorKind::Validation,
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::Forbidden { .. }
            | LedgerError::AdminRequired { .. }
            | LedgerError::AuthenticationFailed => ErrorKind::Authorization,
            LedgerError::InsufficientFunds { .. }
            | LedgerError::InvalidState { .. }
            | LedgerError::ArithmeticOverflow { .. } => ErrorKind::BusinessRule,
            LedgerError::Io { .. } | LedgerError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_amount(amount: impl ToString) -> Self {
        LedgerError::InvalidAmount {
            amount: amount.to_string(),
        }
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn forbidden(user: u32, entity: &str, id: impl ToString) -> Self {
        LedgerError::Forbidden {
            user,
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn admin_required(user: u32) -> Self {
        LedgerError::AdminRequired { user }
    }

    pub fn insufficient_funds(account: &str, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            account: account.to_string(),
            available,
            requested,
        }
    }

    pub fn invalid_state(entity: &str, id: u32, status: impl ToString, operation: &str) -> Self {
        LedgerError::InvalidState {
            entity: entity.to_string(),
            id,
            status: status.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn duplicate(entity: &str, key: impl ToString) -> Self {
        LedgerError::Duplicate {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }

    pub fn unknown_currency(code: &str) -> Self {
        LedgerError::UnknownCurrency {
            code: code.to_string(),
        }
    }

    pub fn arithmetic_overflow(operation: &str, account: u32) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        LedgerError::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::validation(
        LedgerError::validation("username", "must be at least 3 characters"),
        "Invalid username: must be at least 3 characters"
    )]
    #[case::invalid_amount(LedgerError::invalid_amount("-5"), "Invalid amount '-5'")]
    #[case::not_found(LedgerError::not_found("bill", 42), "bill 42 not found")]
    #[case::forbidden(LedgerError::forbidden(7, "account", 3), "User 7 may not access account 3")]
    #[case::admin_required(LedgerError::admin_required(2), "User 2 is not an administrator")]
    #[case::insufficient_funds(
        LedgerError::insufficient_funds(
            "1000000001",
            Decimal::new(5000, 2),
            Decimal::new(10000, 2),
        ),
        "Insufficient funds in account 1000000001: available 50.00, requested 100.00"
    )]
    #[case::invalid_state(
        LedgerError::invalid_state("crypto transfer request", 4, "completed", "approve"),
        "Cannot approve crypto transfer request 4 in status completed"
    )]
    #[case::parse_with_line(
        LedgerError::Parse { line: Some(3), message: "bad op".to_string() },
        "CSV parse error at line 3: bad op"
    )]
    #[case::parse_without_line(
        LedgerError::Parse { line: None, message: "bad op".to_string() },
        "CSV parse error: bad op"
    )]
    fn test_error_display(#[case] error: LedgerError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case(LedgerError::invalid_amount("abc"), ErrorKind::Validation)]
    #[case(LedgerError::unknown_currency("XYZ"), ErrorKind::Validation)]
    #[case(LedgerError::not_found("account", 1), ErrorKind::NotFound)]
    #[case(LedgerError::forbidden(1, "bill", 2), ErrorKind::Authorization)]
    #[case(LedgerError::AuthenticationFailed, ErrorKind::Authorization)]
    #[case(
        LedgerError::insufficient_funds("1", Decimal::ZERO, Decimal::ONE),
        ErrorKind::BusinessRule
    )]
    #[case(
        LedgerError::invalid_state("loan application", 1, "rejected", "approve"),
        ErrorKind::BusinessRule
    )]
    #[case(LedgerError::internal("boom"), ErrorKind::Internal)]
    fn test_error_kind(#[case] error: LedgerError, #[case] expected: ErrorKind) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing script");
        let error: LedgerError = io_error.into();
        assert!(matches!(error, LedgerError::Io { .. }));
        assert_eq!(error.to_string(), "I/O error: missing script");
    }
}
