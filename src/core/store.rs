//! Ledger store
//!
//! The [`LedgerStore`] holds every ledger entity in memory and exposes the
//! create/read/list/update contract the engine is written against. It is the
//! only component that touches the tables, so swapping it for a durable store
//! leaves the engine unchanged.
//!
//! # Architecture
//!
//! ```text
//! LedgerStore
//!     ├── Table<User>            + username index
//!     ├── Table<Account>         + account-number index, (user, symbol) crypto index
//!     ├── Table<Transaction>
//!     ├── Table<Bill>, Table<BillPayment>
//!     ├── Table<ExternalBankAccount>, Table<InternationalTransfer>
//!     ├── Table<LoanProduct>, Table<LoanApplication>
//!     ├── DashMap<symbol, Cryptocurrency>
//!     └── Table<CryptoTransferRequest>, Table<TransferRequest>
//! ```
//!
//! # Ordering
//!
//! - transactions and international transfers: newest first (id breaks ties)
//! - bills: due date ascending, bills without a due date last
//! - everything else: id ascending

use crate::core::currency::default_cryptocurrencies;
use crate::core::money::round_to;
use crate::core::table::Table;
use crate::types::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};

/// First generated account number
const ACCOUNT_NUMBER_BASE: u64 = 4_000_000_001;

/// In-memory ledger store
#[derive(Debug)]
pub struct LedgerStore {
    users: Table<User>,
    usernames: DashMap<String, UserId>,
    accounts: Table<Account>,
    account_numbers: DashMap<String, AccountId>,
    crypto_holdings: DashMap<(UserId, String), AccountId>,
    next_account_number: AtomicU64,
    transactions: Table<Transaction>,
    bills: Table<Bill>,
    bill_payments: Table<BillPayment>,
    external_accounts: Table<ExternalBankAccount>,
    international_transfers: Table<InternationalTransfer>,
    loan_products: Table<LoanProduct>,
    loan_applications: Table<LoanApplication>,
    cryptocurrencies: DashMap<String, Cryptocurrency>,
    crypto_transfer_requests: Table<CryptoTransferRequest>,
    transfer_requests: Table<TransferRequest>,
}

impl LedgerStore {
    /// Create a store holding only the static reference data
    /// (loan catalog and crypto catalog)
    pub fn new() -> Self {
        let store = Self {
            users: Table::new(),
            usernames: DashMap::new(),
            accounts: Table::new(),
            account_numbers: DashMap::new(),
            crypto_holdings: DashMap::new(),
            next_account_number: AtomicU64::new(ACCOUNT_NUMBER_BASE),
            transactions: Table::new(),
            bills: Table::new(),
            bill_payments: Table::new(),
            external_accounts: Table::new(),
            international_transfers: Table::new(),
            loan_products: Table::new(),
            loan_applications: Table::new(),
            cryptocurrencies: DashMap::new(),
            crypto_transfer_requests: Table::new(),
            transfer_requests: Table::new(),
        };

        for product in default_loan_products() {
            store.loan_products.put(product);
        }
        for asset in default_cryptocurrencies() {
            store.upsert_cryptocurrency(asset);
        }

        store
    }

    // ---------------------------------------------------------------- users

    /// Store a new user, rejecting a username that is already taken
    /// (case-insensitive)
    pub fn create_user<F>(&self, username: &str, build: F) -> Result<User, LedgerError>
    where
        F: FnOnce(UserId) -> User,
    {
        let mut created = None;
        self.usernames
            .entry(username.to_ascii_lowercase())
            .or_insert_with(|| {
                let user = self.users.insert_with(build);
                let id = user.id;
                created = Some(user);
                id
            });
        created.ok_or_else(|| LedgerError::duplicate("user", username))
    }

    pub fn user(&self, id: UserId) -> Result<User, LedgerError> {
        self.users.require(id)
    }

    pub fn user_by_username(&self, username: &str) -> Result<User, LedgerError> {
        let id = self
            .usernames
            .get(&username.to_ascii_lowercase())
            .map(|entry| *entry.value())
            .ok_or_else(|| LedgerError::not_found("user", username))?;
        self.users.require(id)
    }

    pub fn update_user<F>(&self, id: UserId, f: F) -> Result<User, LedgerError>
    where
        F: FnOnce(&mut User) -> Result<(), LedgerError>,
    {
        self.users.update(id, f)
    }

    pub fn list_users(&self) -> Vec<User> {
        self.users.all()
    }

    // ------------------------------------------------------------- accounts

    /// Store a new account
    ///
    /// An explicit account number must be unused; otherwise the next free
    /// 10-digit number is generated.
    pub fn create_account(&self, new: NewAccount) -> Result<Account, LedgerError> {
        match new.account_number.as_deref() {
            Some(number) => {
                let number = number.trim();
                if number.is_empty() {
                    return Err(LedgerError::validation("account_number", "must not be empty"));
                }
                self.claim_account_number(number, &new)
                    .ok_or_else(|| LedgerError::duplicate("account", number))
            }
            None => Ok(self.create_generated_account(&new)),
        }
    }

    fn create_generated_account(&self, new: &NewAccount) -> Account {
        loop {
            let candidate = format!(
                "{:010}",
                self.next_account_number.fetch_add(1, Ordering::SeqCst)
            );
            // explicit numbers may already occupy a generated slot
            if let Some(account) = self.claim_account_number(&candidate, new) {
                return account;
            }
        }
    }

    fn claim_account_number(&self, number: &str, new: &NewAccount) -> Option<Account> {
        let mut created = None;
        self.account_numbers
            .entry(number.to_string())
            .or_insert_with(|| {
                let account = self.accounts.insert_with(|id| Account {
                    id,
                    user_id: new.user_id,
                    account_number: number.to_string(),
                    account_type: new.account_type,
                    balance: round_to(Decimal::ZERO, scale_for(new.is_crypto)),
                    currency: new.currency.clone(),
                    is_crypto: new.is_crypto,
                    created_at: Utc::now(),
                });
                let id = account.id;
                created = Some(account);
                id
            });
        created
    }

    pub fn account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.accounts.require(id)
    }

    pub fn account_by_number(&self, number: &str) -> Result<Account, LedgerError> {
        let id = self
            .account_numbers
            .get(number.trim())
            .map(|entry| *entry.value())
            .ok_or_else(|| LedgerError::not_found("account", number))?;
        self.accounts.require(id)
    }

    pub fn list_accounts_by_user(&self, user_id: UserId) -> Vec<Account> {
        self.accounts.filter(|a| a.user_id == user_id)
    }

    /// Every account, ordered by id
    pub fn all_accounts(&self) -> Vec<Account> {
        self.accounts.all()
    }

    /// Add `delta` (possibly negative) to the balance
    ///
    /// The result is rounded to the account's scale. A result below zero is
    /// rejected with `InsufficientFunds` and the balance is left unchanged.
    pub fn update_account_balance(
        &self,
        id: AccountId,
        delta: Decimal,
    ) -> Result<Account, LedgerError> {
        self.accounts.update(id, |account| {
            let next = account
                .balance
                .checked_add(delta)
                .ok_or_else(|| LedgerError::arithmetic_overflow("balance update", id))?;
            if next < Decimal::ZERO {
                return Err(LedgerError::insufficient_funds(
                    &account.account_number,
                    account.balance,
                    -delta,
                ));
            }
            account.balance = round_to(next, account.scale());
            Ok(())
        })
    }

    /// The user's holding account for a crypto asset, if one exists
    pub fn find_crypto_account(&self, user_id: UserId, symbol: &str) -> Option<Account> {
        self.crypto_holdings
            .get(&(user_id, symbol.to_ascii_uppercase()))
            .and_then(|entry| self.accounts.get(*entry.value()))
    }

    /// The user's holding account for a crypto asset, created on first use
    ///
    /// Concurrent callers for the same user and symbol get the same account.
    pub fn crypto_account_for(
        &self,
        user_id: UserId,
        symbol: &str,
    ) -> Result<Account, LedgerError> {
        let symbol = symbol.to_ascii_uppercase();
        let id = *self
            .crypto_holdings
            .entry((user_id, symbol.clone()))
            .or_insert_with(|| {
                self.create_generated_account(&NewAccount {
                    user_id,
                    account_number: None,
                    account_type: AccountType::Crypto,
                    currency: symbol.clone(),
                    is_crypto: true,
                })
                .id
            });
        self.accounts.require(id)
    }

    // --------------------------------------------------------- transactions

    pub fn create_transaction(&self, new: NewTransaction) -> Transaction {
        self.transactions.insert_with(|id| Transaction {
            id,
            account_id: new.account_id,
            amount: new.amount,
            tx_type: new.tx_type,
            direction: new.direction,
            status: new.status,
            description: new.description,
            reference: new.reference,
            from_account: new.from_account,
            to_account: new.to_account,
            conversion: new.conversion,
            category: None,
            subcategory: None,
            tags: Vec::new(),
            notes: None,
            created_at: Utc::now(),
        })
    }

    pub fn transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.transactions.require(id)
    }

    /// Transactions of one account, newest first
    pub fn list_transactions_by_account(&self, account_id: AccountId) -> Vec<Transaction> {
        let mut rows = self.transactions.filter(|t| t.account_id == account_id);
        rows.sort_by(newest_first(|t: &Transaction| (t.created_at, t.id)));
        rows
    }

    /// Transactions across all of a user's accounts, newest first
    pub fn list_transactions_by_user(&self, user_id: UserId) -> Vec<Transaction> {
        let owned: Vec<AccountId> = self
            .list_accounts_by_user(user_id)
            .iter()
            .map(|a| a.id)
            .collect();
        let mut rows = self.transactions.filter(|t| owned.contains(&t.account_id));
        rows.sort_by(newest_first(|t: &Transaction| (t.created_at, t.id)));
        rows
    }

    pub fn list_transactions_by_reference(&self, reference: &str) -> Vec<Transaction> {
        self.transactions.filter(|t| t.reference == reference)
    }

    pub fn update_transaction<F>(&self, id: TransactionId, f: F) -> Result<Transaction, LedgerError>
    where
        F: FnOnce(&mut Transaction) -> Result<(), LedgerError>,
    {
        self.transactions.update(id, f)
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    // ---------------------------------------------------------------- bills

    pub fn create_bill(&self, user_id: UserId, new: NewBill) -> Bill {
        self.bills.insert_with(|id| Bill {
            id,
            user_id,
            payee_name: new.payee_name,
            payee_account_number: new.payee_account_number,
            amount: new.amount,
            due_date: new.due_date,
            status: BillStatus::Pending,
            created_at: Utc::now(),
        })
    }

    pub fn bill(&self, id: BillId) -> Result<Bill, LedgerError> {
        self.bills.require(id)
    }

    /// A user's bills by due date, undated bills last
    pub fn list_bills_by_user(&self, user_id: UserId) -> Vec<Bill> {
        let mut rows = self.bills.filter(|b| b.user_id == user_id);
        rows.sort_by(|a, b| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y).then(a.id.cmp(&b.id)),
            (Some(_), None) => CmpOrdering::Less,
            (None, Some(_)) => CmpOrdering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        rows
    }

    /// Replace the bill status with what `next` derives from the current one
    pub fn update_bill_status<F>(&self, id: BillId, next: F) -> Result<Bill, LedgerError>
    where
        F: FnOnce(BillStatus) -> Result<BillStatus, LedgerError>,
    {
        self.bills.update(id, |bill| {
            bill.status = next(bill.status)?;
            Ok(())
        })
    }

    pub fn create_bill_payment(
        &self,
        bill: &Bill,
        account_id: AccountId,
        amount: Decimal,
        reference: &str,
    ) -> BillPayment {
        self.bill_payments.insert_with(|id| BillPayment {
            id,
            bill_id: bill.id,
            account_id,
            user_id: bill.user_id,
            amount,
            reference: reference.to_string(),
            paid_at: Utc::now(),
        })
    }

    pub fn list_bill_payments_by_user(&self, user_id: UserId) -> Vec<BillPayment> {
        self.bill_payments.filter(|p| p.user_id == user_id)
    }

    // ---------------------------------------------------- external accounts

    pub fn create_external_account(
        &self,
        user_id: UserId,
        details: ExternalAccountDetails,
    ) -> ExternalBankAccount {
        self.external_accounts.insert_with(|id| ExternalBankAccount {
            id,
            user_id,
            bank_name: details.bank_name,
            account_holder: details.account_holder,
            account_number: details.account_number,
            swift_code: details.swift_code,
            country: details.country,
            currency: details.currency,
            created_at: Utc::now(),
        })
    }

    pub fn external_account(
        &self,
        id: ExternalAccountId,
    ) -> Result<ExternalBankAccount, LedgerError> {
        self.external_accounts.require(id)
    }

    pub fn list_external_accounts_by_user(&self, user_id: UserId) -> Vec<ExternalBankAccount> {
        self.external_accounts.filter(|e| e.user_id == user_id)
    }

    pub fn update_external_account(
        &self,
        id: ExternalAccountId,
        details: ExternalAccountDetails,
    ) -> Result<ExternalBankAccount, LedgerError> {
        self.external_accounts.update(id, |account| {
            account.bank_name = details.bank_name;
            account.account_holder = details.account_holder;
            account.account_number = details.account_number;
            account.swift_code = details.swift_code;
            account.country = details.country;
            account.currency = details.currency;
            Ok(())
        })
    }

    pub fn delete_external_account(
        &self,
        id: ExternalAccountId,
    ) -> Result<ExternalBankAccount, LedgerError> {
        self.external_accounts
            .remove(id)
            .ok_or_else(|| LedgerError::not_found("external account", id))
    }

    // ---------------------------------------------- international transfers

    pub fn create_international_transfer<F>(&self, build: F) -> InternationalTransfer
    where
        F: FnOnce(InternationalTransferId) -> InternationalTransfer,
    {
        self.international_transfers.insert_with(build)
    }

    pub fn international_transfer(
        &self,
        id: InternationalTransferId,
    ) -> Result<InternationalTransfer, LedgerError> {
        self.international_transfers.require(id)
    }

    /// A user's international transfers, newest first
    pub fn list_international_transfers_by_user(
        &self,
        user_id: UserId,
    ) -> Vec<InternationalTransfer> {
        let mut rows = self.international_transfers.filter(|t| t.user_id == user_id);
        rows.sort_by(newest_first(|t: &InternationalTransfer| (t.created_at, t.id)));
        rows
    }

    /// Transfers not yet completed or failed
    pub fn pending_international_transfers(&self) -> Vec<InternationalTransfer> {
        self.international_transfers.filter(|t| {
            matches!(
                t.status,
                InternationalTransferStatus::Pending | InternationalTransferStatus::Processing
            )
        })
    }

    /// Pending transfers whose settlement time is at or before `now`
    pub fn due_international_transfers(&self, now: DateTime<Utc>) -> Vec<InternationalTransfer> {
        self.international_transfers.filter(|t| {
            t.status == InternationalTransferStatus::Pending && t.settle_after <= now
        })
    }

    pub fn update_international_transfer<F>(
        &self,
        id: InternationalTransferId,
        f: F,
    ) -> Result<InternationalTransfer, LedgerError>
    where
        F: FnOnce(&mut InternationalTransfer) -> Result<(), LedgerError>,
    {
        self.international_transfers.update(id, f)
    }

    // ---------------------------------------------------------------- loans

    pub fn loan_product(&self, id: LoanId) -> Result<LoanProduct, LedgerError> {
        self.loan_products.require(id)
    }

    pub fn list_loan_products(&self) -> Vec<LoanProduct> {
        self.loan_products.all()
    }

    pub fn create_loan_application<F>(&self, build: F) -> LoanApplication
    where
        F: FnOnce(LoanApplicationId) -> LoanApplication,
    {
        self.loan_applications.insert_with(build)
    }

    pub fn loan_application(&self, id: LoanApplicationId) -> Result<LoanApplication, LedgerError> {
        self.loan_applications.require(id)
    }

    pub fn list_loan_applications_by_user(&self, user_id: UserId) -> Vec<LoanApplication> {
        self.loan_applications.filter(|a| a.user_id == user_id)
    }

    pub fn list_loan_applications_by_status(&self, status: ApprovalStatus) -> Vec<LoanApplication> {
        self.loan_applications.filter(|a| a.status == status)
    }

    pub fn update_loan_application<F>(
        &self,
        id: LoanApplicationId,
        f: F,
    ) -> Result<LoanApplication, LedgerError>
    where
        F: FnOnce(&mut LoanApplication) -> Result<(), LedgerError>,
    {
        self.loan_applications.update(id, f)
    }

    // --------------------------------------------------------------- crypto

    pub fn cryptocurrency(&self, symbol: &str) -> Result<Cryptocurrency, LedgerError> {
        self.cryptocurrencies
            .get(&symbol.trim().to_ascii_uppercase())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::unknown_currency(symbol))
    }

    /// Catalog ordered by symbol
    pub fn list_cryptocurrencies(&self) -> Vec<Cryptocurrency> {
        let mut assets: Vec<Cryptocurrency> = self
            .cryptocurrencies
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        assets.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        assets
    }

    /// Insert or replace reference data for one asset
    pub fn upsert_cryptocurrency(&self, mut asset: Cryptocurrency) {
        asset.symbol = asset.symbol.to_ascii_uppercase();
        self.cryptocurrencies.insert(asset.symbol.clone(), asset);
    }

    pub fn create_crypto_transfer_request<F>(&self, build: F) -> CryptoTransferRequest
    where
        F: FnOnce(CryptoTransferRequestId) -> CryptoTransferRequest,
    {
        self.crypto_transfer_requests.insert_with(build)
    }

    pub fn crypto_transfer_request(
        &self,
        id: CryptoTransferRequestId,
    ) -> Result<CryptoTransferRequest, LedgerError> {
        self.crypto_transfer_requests.require(id)
    }

    pub fn list_crypto_transfer_requests_by_user(
        &self,
        user_id: UserId,
    ) -> Vec<CryptoTransferRequest> {
        self.crypto_transfer_requests.filter(|r| r.user_id == user_id)
    }

    pub fn list_crypto_transfer_requests_by_status(
        &self,
        status: ApprovalStatus,
    ) -> Vec<CryptoTransferRequest> {
        self.crypto_transfer_requests.filter(|r| r.status == status)
    }

    pub fn update_crypto_transfer_request<F>(
        &self,
        id: CryptoTransferRequestId,
        f: F,
    ) -> Result<CryptoTransferRequest, LedgerError>
    where
        F: FnOnce(&mut CryptoTransferRequest) -> Result<(), LedgerError>,
    {
        self.crypto_transfer_requests.update(id, f)
    }

    // ---------------------------------------------------- transfer requests

    pub fn create_transfer_request<F>(&self, build: F) -> TransferRequest
    where
        F: FnOnce(TransferRequestId) -> TransferRequest,
    {
        self.transfer_requests.insert_with(build)
    }

    pub fn transfer_request(&self, id: TransferRequestId) -> Result<TransferRequest, LedgerError> {
        self.transfer_requests.require(id)
    }

    pub fn list_transfer_requests_by_user(&self, user_id: UserId) -> Vec<TransferRequest> {
        self.transfer_requests.filter(|r| r.user_id == user_id)
    }

    pub fn list_transfer_requests_by_status(&self, status: ApprovalStatus) -> Vec<TransferRequest> {
        self.transfer_requests.filter(|r| r.status == status)
    }

    pub fn update_transfer_request<F>(
        &self,
        id: TransferRequestId,
        f: F,
    ) -> Result<TransferRequest, LedgerError>
    where
        F: FnOnce(&mut TransferRequest) -> Result<(), LedgerError>,
    {
        self.transfer_requests.update(id, f)
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

fn scale_for(is_crypto: bool) -> u32 {
    if is_crypto {
        CRYPTO_SCALE
    } else {
        FIAT_SCALE
    }
}

fn newest_first<T, F>(key: F) -> impl Fn(&T, &T) -> CmpOrdering
where
    F: Fn(&T) -> (DateTime<Utc>, u32),
{
    move |a, b| key(b).cmp(&key(a))
}

fn default_loan_products() -> Vec<LoanProduct> {
    let product = |id: LoanId,
                   name: &str,
                   loan_type: &str,
                   rate: Decimal,
                   min: i64,
                   max: i64,
                   terms: (u32, u32)| LoanProduct {
        id,
        name: name.to_string(),
        loan_type: loan_type.to_string(),
        interest_rate: rate,
        min_amount: Decimal::new(min, 0),
        max_amount: Decimal::new(max, 0),
        min_term_months: terms.0,
        max_term_months: terms.1,
    };

    vec![
        product(1, "Personal Loan", "personal", Decimal::new(899, 2), 1_000, 50_000, (12, 60)),
        product(2, "Auto Loan", "auto", Decimal::new(549, 2), 5_000, 75_000, (24, 72)),
        product(
            3,
            "Home Mortgage",
            "mortgage",
            Decimal::new(675, 2),
            50_000,
            1_000_000,
            (120, 360),
        ),
        product(4, "Student Loan", "student", Decimal::new(499, 2), 1_000, 100_000, (12, 120)),
    ]
}
