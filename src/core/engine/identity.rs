//! Users, accounts, deposits and read-side queries

use super::{ensure_owner, new_reference, LedgerEngine};
use crate::core::categorize;
use crate::core::currency;
use crate::core::money::{parse_amount, round_to};
use crate::core::statement::{build_statement, Statement};
use crate::types::*;
use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use uuid::Uuid;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 6;

impl LedgerEngine {
    /// Register a customer
    ///
    /// # Errors
    ///
    /// - `Validation` if the username is not 3-32 characters of
    ///   `[A-Za-z0-9_.-]`, the password is shorter than 6 characters or the
    ///   email has no `@`
    /// - `Duplicate` if the username is taken (case-insensitive)
    pub fn register(&self, new: NewUser) -> Result<User, LedgerError> {
        self.create_user(new, Role::Customer)
    }

    /// Register an administrator (bootstrap path for seeds and scripts)
    pub fn register_admin(&self, new: NewUser) -> Result<User, LedgerError> {
        self.create_user(new, Role::Admin)
    }

    fn create_user(&self, new: NewUser, role: Role) -> Result<User, LedgerError> {
        let username = new.username.trim().to_string();
        validate_username(&username)?;
        if new.password.chars().count() < PASSWORD_MIN {
            return Err(LedgerError::validation(
                "password",
                format!("must be at least {} characters", PASSWORD_MIN),
            ));
        }
        if !new.email.contains('@') {
            return Err(LedgerError::validation("email", "must contain '@'"));
        }

        let salt = Uuid::new_v4().simple().to_string();
        let password_hash = hash_password(&salt, &new.password);
        let full_name = match new.full_name.trim() {
            "" => username.clone(),
            name => name.to_string(),
        };

        let user = self.store.create_user(&username, |id| User {
            id,
            username: username.clone(),
            password_hash,
            salt,
            full_name,
            email: new.email.trim().to_string(),
            is_verified: false,
            is_approved: false,
            role,
            created_at: Utc::now(),
        })?;

        tracing::info!(user = user.id, username = %user.username, role = ?role, "user registered");
        Ok(user)
    }

    /// Check a username/password pair
    ///
    /// Fails with `AuthenticationFailed` whether the user is unknown or the
    /// password is wrong.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User, LedgerError> {
        let user = self
            .store
            .user_by_username(username.trim())
            .map_err(|_| LedgerError::AuthenticationFailed)?;
        if hash_password(&user.salt, password) != user.password_hash {
            tracing::warn!(username = %username, "authentication failed");
            return Err(LedgerError::AuthenticationFailed);
        }
        Ok(user)
    }

    pub fn profile(&self, actor: UserId) -> Result<User, LedgerError> {
        self.store.user(actor)
    }

    pub fn set_user_role(
        &self,
        admin: UserId,
        user_id: UserId,
        role: Role,
    ) -> Result<User, LedgerError> {
        self.require_admin(admin)?;
        let user = self.store.update_user(user_id, |user| {
            user.role = role;
            Ok(())
        })?;
        tracing::info!(admin, user = user_id, role = ?role, "user role changed");
        Ok(user)
    }

    pub fn approve_user(&self, admin: UserId, user_id: UserId) -> Result<User, LedgerError> {
        self.require_admin(admin)?;
        self.store.update_user(user_id, |user| {
            user.is_approved = true;
            Ok(())
        })
    }

    pub fn verify_user(&self, admin: UserId, user_id: UserId) -> Result<User, LedgerError> {
        self.require_admin(admin)?;
        self.store.update_user(user_id, |user| {
            user.is_verified = true;
            Ok(())
        })
    }

    /// Open a fiat account for `actor`
    ///
    /// A positive initial deposit is recorded as a deposit transaction.
    ///
    /// # Errors
    ///
    /// - `UnknownCurrency` if the currency is not in the currency table
    /// - `Validation` for crypto account types (those are opened by purchase)
    ///   or a negative initial deposit
    /// - `Duplicate` if an explicit account number is taken
    pub fn open_account(
        &self,
        actor: UserId,
        request: OpenAccount,
    ) -> Result<Account, LedgerError> {
        self.store.user(actor)?;
        if request.account_type == AccountType::Crypto {
            return Err(LedgerError::validation(
                "account_type",
                "crypto accounts are opened by purchasing crypto",
            ));
        }
        let currency = currency::normalize(&request.currency)?;
        let initial = round_to(request.initial_deposit, FIAT_SCALE);
        if initial < Decimal::ZERO {
            return Err(LedgerError::invalid_amount(request.initial_deposit));
        }

        let account = self.store.create_account(NewAccount {
            user_id: actor,
            account_number: request.account_number,
            account_type: request.account_type,
            currency: currency.to_string(),
            is_crypto: false,
        })?;

        tracing::info!(
            user = actor,
            account = account.id,
            number = %account.account_number,
            currency = %account.currency,
            "account opened"
        );

        if initial > Decimal::ZERO {
            let reference = new_reference("DEP");
            self.post_single(
                NewTransaction::credit(
                    account.id,
                    initial,
                    TransactionType::Deposit,
                    "Initial deposit",
                    &reference,
                ),
                || Ok(()),
            )?;
            return self.store.account(account.id);
        }
        Ok(account)
    }

    /// Credit `amount` to one of the actor's accounts
    pub fn deposit(
        &self,
        actor: UserId,
        account_id: AccountId,
        amount: &str,
        description: &str,
    ) -> Result<Transaction, LedgerError> {
        let account = self.owned_account(actor, account_id)?;
        let amount = parse_amount(amount, account.scale())?;
        let description = match description.trim() {
            "" => "Deposit",
            text => text,
        };
        let reference = new_reference("DEP");

        let (transaction, ()) = self.post_single(
            NewTransaction::credit(
                account.id,
                amount,
                TransactionType::Deposit,
                description,
                &reference,
            ),
            || Ok(()),
        )?;

        tracing::info!(
            account = account.id,
            amount = %amount,
            reference = %reference,
            "deposit posted"
        );
        self.notify("deposit", &reference, actor, amount, &account.currency);
        Ok(transaction)
    }

    pub fn accounts(&self, actor: UserId) -> Vec<Account> {
        self.store.list_accounts_by_user(actor)
    }

    pub fn account(&self, actor: UserId, id: AccountId) -> Result<Account, LedgerError> {
        self.owned_account(actor, id)
    }

    pub fn crypto_accounts(&self, actor: UserId) -> Vec<Account> {
        self.accounts(actor).into_iter().filter(|a| a.is_crypto).collect()
    }

    /// Transactions of one account, or of all the actor's accounts, newest first
    pub fn transactions(
        &self,
        actor: UserId,
        account_id: Option<AccountId>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        match account_id {
            Some(id) => {
                self.owned_account(actor, id)?;
                Ok(self.store.list_transactions_by_account(id))
            }
            None => Ok(self.store.list_transactions_by_user(actor)),
        }
    }

    fn owned_transaction(
        &self,
        actor: UserId,
        id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        let transaction = self.store.transaction(id)?;
        let account = self.store.account(transaction.account_id)?;
        ensure_owner(actor, &account)
            .map_err(|_| LedgerError::forbidden(actor, "transaction", id))?;
        Ok(transaction)
    }

    /// Suggest a category for one of the actor's transactions
    ///
    /// Never fails because of the suggestion service; only an unknown or
    /// foreign transaction is an error.
    pub fn suggest_category(
        &self,
        actor: UserId,
        transaction_id: TransactionId,
    ) -> Result<CategorySuggestion, LedgerError> {
        let transaction = self.owned_transaction(actor, transaction_id)?;
        Ok(categorize::suggest(self.suggester.as_ref(), &transaction))
    }

    /// Set category metadata on a transaction; balances are never touched
    pub fn categorize_transaction(
        &self,
        actor: UserId,
        transaction_id: TransactionId,
        update: CategoryUpdate,
    ) -> Result<Transaction, LedgerError> {
        self.owned_transaction(actor, transaction_id)?;
        let update = categorize::normalize_update(update)?;

        let transaction = self.store.update_transaction(transaction_id, |tx| {
            tx.category = Some(update.category);
            tx.subcategory = update.subcategory;
            tx.tags = update.tags;
            tx.notes = update.notes;
            Ok(())
        })?;
        tracing::debug!(
            transaction = transaction_id,
            category = ?transaction.category,
            "transaction categorized"
        );
        Ok(transaction)
    }

    /// Statement of one account for the inclusive date range `from..=to`
    pub fn statement(
        &self,
        actor: UserId,
        account_id: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Statement, LedgerError> {
        let account = self.owned_account(actor, account_id)?;
        let transactions = self.store.list_transactions_by_account(account.id);
        build_statement(&account, &transactions, day_start(from), day_end(to)?)
    }

    /// Statements of every fiat account of the actor
    pub fn statements_for_user(
        &self,
        actor: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Statement>, LedgerError> {
        self.accounts(actor)
            .into_iter()
            .filter(|account| !account.is_crypto)
            .map(|account| self.statement(actor, account.id, from, to))
            .collect()
    }
}

fn validate_username(username: &str) -> Result<(), LedgerError> {
    let length = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&length) {
        return Err(LedgerError::validation(
            "username",
            format!("must be {}-{} characters", USERNAME_MIN, USERNAME_MAX),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(LedgerError::validation(
            "username",
            "may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    Ok(())
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn day_start(date: NaiveDate) -> chrono::DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Exclusive end of the day
fn day_end(date: NaiveDate) -> Result<chrono::DateTime<Utc>, LedgerError> {
    date.succ_opt()
        .map(day_start)
        .ok_or_else(|| LedgerError::validation("to", "date out of range"))
}
