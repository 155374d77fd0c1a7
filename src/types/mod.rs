//! Types module
//!
//! Contains the ledger's data model. Submodules group records by concern:
//! - `ids`: identifier aliases
//! - `user`, `account`, `transaction`: core ledger records
//! - `bill`, `external`, `loan`, `crypto`: product-specific records
//! - `approval`: lifecycle shared by the approval workflows
//! - `transfer`: intra-bank movement inputs and receipts
//! - `command`: script operations replayed by the CLI
//! - `error`: error types for the ledger

pub mod account;
pub mod approval;
pub mod bill;
pub mod command;
pub mod crypto;
pub mod error;
pub mod external;
pub mod ids;
pub mod loan;
pub mod transaction;
pub mod transfer;
pub mod user;

pub use account::{Account, AccountType, NewAccount, OpenAccount, CRYPTO_SCALE, FIAT_SCALE};
pub use approval::ApprovalStatus;
pub use bill::{Bill, BillPayment, BillStatus, NewBill};
pub use command::Command;
pub use crypto::{
    CryptoExchange, CryptoPurchase, CryptoReceipt, CryptoTransferRequest, Cryptocurrency,
    NewCryptoTransferRequest, NewTransferRequest, TransferRequest,
};
pub use error::{ErrorKind, LedgerError};
pub use external::{
    ExternalAccountDetails, ExternalBankAccount, InternationalRequest, InternationalTransfer,
    InternationalTransferStatus,
};
pub use ids::*;
pub use loan::{LoanApplication, LoanProduct, LoanRequest};
pub use transaction::{
    CategorySuggestion, CategoryUpdate, ConversionMeta, Direction, NewTransaction, Transaction,
    TransactionStatus, TransactionType,
};
pub use transfer::{BillPaymentReceipt, FundTransfer, TransferReceipt};
pub use user::{NewUser, Role, User};
