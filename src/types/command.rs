//! Script operations replayed by the CLI
//!
//! Each variant is one user-facing banking action addressed the way a script
//! author knows things: users by username, accounts by account number, and
//! workflow records by the id the ledger assigned them.

use super::account::AccountType;
use super::ids::*;
use rust_decimal::Decimal;

/// One replayable banking operation
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Register {
        username: String,
        password: String,
        admin: bool,
    },
    OpenAccount {
        username: String,
        account_number: Option<String>,
        account_type: AccountType,
        currency: String,
        initial_deposit: Decimal,
    },
    Deposit {
        username: String,
        account_number: String,
        amount: String,
        description: String,
    },
    Transfer {
        username: String,
        from: String,
        to: String,
        amount: String,
        description: String,
    },
    CreateBill {
        username: String,
        payee_account_number: String,
        payee_name: String,
        amount: Decimal,
    },
    PayBill {
        username: String,
        account_number: String,
        bill_id: BillId,
        amount: String,
    },
    AddExternalAccount {
        username: String,
        account_number: String,
        currency: String,
    },
    SendInternational {
        username: String,
        account_number: String,
        external_account_id: ExternalAccountId,
        amount: String,
        purpose: String,
    },
    /// Run the settlement pass for international transfers
    Settle,
    FailInternational {
        username: String,
        transfer_id: InternationalTransferId,
        reason: String,
    },
    BuyCrypto {
        username: String,
        account_number: String,
        symbol: String,
        amount: String,
    },
    /// Sell `amount` of the user's `source_symbol` holding for `target_symbol`
    ExchangeCrypto {
        username: String,
        source_symbol: String,
        target_symbol: String,
        amount: String,
    },
    RequestTransfer {
        username: String,
        from: String,
        to: String,
        amount: String,
        description: String,
    },
    ReviewTransfer {
        username: String,
        request_id: TransferRequestId,
        approve: bool,
        note: Option<String>,
    },
    ApplyLoan {
        username: String,
        account_number: String,
        loan_id: LoanId,
        amount: String,
        term_months: u32,
    },
    ReviewLoan {
        username: String,
        application_id: LoanApplicationId,
        approve: bool,
        note: Option<String>,
    },
    DisburseLoan {
        username: String,
        application_id: LoanApplicationId,
    },
    /// `to` is an account number, or `@username` for that user's holding
    /// account of the same asset
    RequestCryptoTransfer {
        username: String,
        source_symbol: String,
        to: String,
        amount: String,
        note: String,
    },
    ReviewCryptoTransfer {
        username: String,
        request_id: CryptoTransferRequestId,
        approve: bool,
        note: Option<String>,
    },
    Categorize {
        username: String,
        transaction_id: TransactionId,
        category: String,
        subcategory: Option<String>,
    },
}

impl Command {
    /// Short operation name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Register { admin: false, .. } => "register",
            Command::Register { admin: true, .. } => "register-admin",
            Command::OpenAccount { .. } => "open",
            Command::Deposit { .. } => "deposit",
            Command::Transfer { .. } => "transfer",
            Command::CreateBill { .. } => "bill",
            Command::PayBill { .. } => "pay-bill",
            Command::AddExternalAccount { .. } => "external",
            Command::SendInternational { .. } => "international",
            Command::Settle => "settle",
            Command::FailInternational { .. } => "fail-international",
            Command::BuyCrypto { .. } => "buy-crypto",
            Command::ExchangeCrypto { .. } => "exchange-crypto",
            Command::RequestTransfer { .. } => "request-transfer",
            Command::ReviewTransfer { approve: true, .. } => "approve-transfer",
            Command::ReviewTransfer { approve: false, .. } => "reject-transfer",
            Command::ApplyLoan { .. } => "apply-loan",
            Command::ReviewLoan { approve: true, .. } => "approve-loan",
            Command::ReviewLoan { approve: false, .. } => "reject-loan",
            Command::DisburseLoan { .. } => "disburse-loan",
            Command::RequestCryptoTransfer { .. } => "request-crypto-transfer",
            Command::ReviewCryptoTransfer { approve: true, .. } => "approve-crypto-transfer",
            Command::ReviewCryptoTransfer { approve: false, .. } => "reject-crypto-transfer",
            Command::Categorize { .. } => "categorize",
        }
    }
}
