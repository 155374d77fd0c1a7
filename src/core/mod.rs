//! Core business logic module
//!
//! This module contains the ledger components:
//! - `traits` - Record abstractions shared by the store and the engine
//! - `table` - Thread-safe in-memory table
//! - `store` - Ledger store: every entity plus its secondary indexes
//! - `locks` - Per-account serialization of mutation operations
//! - `money`, `currency` - Amount parsing and the static rate tables
//! - `engine` - Mutation operations and script dispatch
//! - `notify` - Notification fan-out
//! - `statement` - Statement generation
//! - `categorize` - Transaction categorization
//! - `settlement` - Background settlement of international transfers

pub mod categorize;
pub mod currency;
pub mod engine;
pub mod locks;
pub mod money;
pub mod notify;
pub mod settlement;
pub mod statement;
pub mod store;
pub mod table;
pub mod traits;

pub use engine::LedgerEngine;
pub use notify::{Notification, NotificationHub};
pub use settlement::SettlementWorker;
pub use statement::{write_statement_csv, Statement};
pub use store::LedgerStore;
