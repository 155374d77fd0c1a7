//! Identifier aliases
//!
//! Every ledger record is keyed by a `u32` assigned by its store table.
//! Aliases keep signatures readable without introducing newtype friction.

pub type UserId = u32;
pub type AccountId = u32;
pub type TransactionId = u32;
pub type BillId = u32;
pub type BillPaymentId = u32;
pub type ExternalAccountId = u32;
pub type InternationalTransferId = u32;
pub type LoanId = u32;
pub type LoanApplicationId = u32;
pub type CryptoTransferRequestId = u32;
pub type TransferRequestId = u32;
