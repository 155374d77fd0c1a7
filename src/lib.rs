//! Bank Ledger Library
//!
//! # Overview
//!
//! An in-memory retail bank ledger: users and accounts, intra-bank and
//! international transfers, bills, crypto holdings, admin approval workflows,
//! statements and transaction categorization. Every balance-changing operation
//! is atomic: its postings, balance updates and workflow state change either
//! all happen or none do.
//!
//! # Architecture
//!
//! - [`types`] - Domain records, inputs, script commands and [`types::LedgerError`]
//! - [`config`] - Engine policy ([`config::LedgerConfig`])
//! - [`core`] - Business logic:
//!   - [`core::store`] - In-memory tables with secondary indexes
//!   - [`core::engine`] - Mutation operations, approval workflows, script dispatch
//!   - [`core::notify`] - Best-effort notification fan-out
//!   - [`core::statement`] - Account statements
//!   - [`core::categorize`] - Category suggestions and updates
//!   - [`core::settlement`] - Background settlement of international transfers
//! - [`io`] - Script parsing and account CSV output
//! - [`strategy`] - Sync and async replay pipelines
//! - [`cli`] - CLI arguments parsing
//!
//! # Example
//!
//! ```
//! use bank_ledger::config::LedgerConfig;
//! use bank_ledger::core::LedgerEngine;
//! use bank_ledger::types::{FundTransfer, NewUser, OpenAccount};
//! use rust_decimal::Decimal;
//!
//! let engine = LedgerEngine::new(LedgerConfig::default());
//! let alice = engine.register(NewUser::with_credentials("alice", "secret-pass")).unwrap();
//! let bob = engine.register(NewUser::with_credentials("bob", "secret-pass")).unwrap();
//! engine
//!     .open_account(
//!         alice.id,
//!         OpenAccount::checking("USD", Decimal::new(10000, 2)).with_number("A1"),
//!     )
//!     .unwrap();
//! engine
//!     .open_account(bob.id, OpenAccount::checking("USD", Decimal::new(1000, 2)).with_number("B1"))
//!     .unwrap();
//!
//! let receipt = engine
//!     .transfer(alice.id, FundTransfer::new("A1", "B1", "40.00", "rent"))
//!     .unwrap();
//! assert_eq!(receipt.debit.reference, receipt.credit.reference);
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use config::LedgerConfig;
pub use core::{LedgerEngine, LedgerStore, NotificationHub};
pub use io::write_accounts_csv;
pub use types::{Account, Command, LedgerError, Transaction, TransactionType};
