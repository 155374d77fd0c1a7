//! Ledger engine
//!
//! The [`LedgerEngine`] enacts every user-facing banking action (mutation
//! operation) on top of the [`LedgerStore`]. Operations are grouped by concern:
//! - `identity`: registration, authentication, accounts, deposits, statements
//! - `transfers`: intra-bank transfers, bills, external accounts
//! - `international`: international transfers and their settlement
//! - `crypto`: crypto purchase and exchange
//! - `approvals`: loan, crypto transfer and transfer request workflows
//! - `commands`: script command dispatch
//!
//! # Atomicity
//!
//! Every balance movement goes through [`LedgerEngine::post_single`] or
//! [`LedgerEngine::post_pair`]. Both run under the account locks of every
//! account involved and follow the same order:
//!
//! 1. re-read the balances and check every posting (funds, overflow)
//! 2. run the operation's `commit` step (status flips, side records), which
//!    may still fail
//! 3. write the balances and the transaction legs, which cannot fail
//!
//! An error therefore always leaves the ledger exactly as it was.

mod approvals;
mod commands;
mod crypto;
mod identity;
mod international;
mod transfers;

use crate::config::LedgerConfig;
use crate::core::categorize::{CategorySuggester, KeywordSuggester};
use crate::core::locks::AccountLocks;
use crate::core::notify::{Notification, NotificationHub};
use crate::core::store::LedgerStore;
use crate::core::traits::Owned;
use crate::types::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Mutation operations over a shared ledger store
///
/// # Thread Safety
///
/// All operations take `&self` and may be called from any number of threads
/// or tasks at once; share the engine through an `Arc`.
pub struct LedgerEngine {
    store: Arc<LedgerStore>,
    locks: AccountLocks,
    notifier: Arc<NotificationHub>,
    config: LedgerConfig,
    suggester: Arc<dyn CategorySuggester>,
}

/// Two-leg movement: one debit, one credit, one shared reference
pub(crate) struct Movement<'a> {
    pub source: &'a Account,
    pub debit_amount: Decimal,
    pub debit_type: TransactionType,
    pub destination: &'a Account,
    pub credit_amount: Decimal,
    pub credit_type: TransactionType,
    pub description: &'a str,
    pub reference: &'a str,
    pub conversion: Option<ConversionMeta>,
}

impl LedgerEngine {
    /// Create an engine over a fresh store with the built-in keyword suggester
    pub fn new(config: LedgerConfig) -> Self {
        let notifier = Arc::new(NotificationHub::new(config.notification_buffer));
        Self::with_parts(
            Arc::new(LedgerStore::new()),
            notifier,
            config,
            Arc::new(KeywordSuggester),
        )
    }

    /// Create an engine from explicit collaborators
    ///
    /// # Arguments
    ///
    /// * `store` - Ledger store the engine reads and writes
    /// * `notifier` - Hub receiving a notification per successful movement
    /// * `config` - Business policy settings
    /// * `suggester` - Category suggestion service
    pub fn with_parts(
        store: Arc<LedgerStore>,
        notifier: Arc<NotificationHub>,
        config: LedgerConfig,
        suggester: Arc<dyn CategorySuggester>,
    ) -> Self {
        LedgerEngine {
            store,
            locks: AccountLocks::new(),
            notifier,
            config,
            suggester,
        }
    }

    pub fn store(&self) -> &Arc<LedgerStore> {
        &self.store
    }

    pub fn notifier(&self) -> &Arc<NotificationHub> {
        &self.notifier
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Snapshot of every account, ordered by id
    pub fn accounts_snapshot(&self) -> Vec<Account> {
        self.store.all_accounts()
    }

    // ------------------------------------------------------------- helpers

    fn require_admin(&self, actor: UserId) -> Result<User, LedgerError> {
        let user = self.store.user(actor)?;
        if !user.is_admin() {
            return Err(LedgerError::admin_required(actor));
        }
        Ok(user)
    }

    /// Account `id`, failing with `Forbidden` unless `actor` owns it
    fn owned_account(&self, actor: UserId, id: AccountId) -> Result<Account, LedgerError> {
        let account = self.store.account(id)?;
        ensure_owner(actor, &account)?;
        Ok(account)
    }

    fn owned_fiat_account(&self, actor: UserId, id: AccountId) -> Result<Account, LedgerError> {
        let account = self.owned_account(actor, id)?;
        if account.is_crypto {
            return Err(LedgerError::validation(
                "account",
                format!("{} is a crypto account", account.account_number),
            ));
        }
        Ok(account)
    }

    /// Check that every posting can be applied to the current balances
    fn check_postings(&self, postings: &[(AccountId, Decimal)]) -> Result<(), LedgerError> {
        for (id, delta) in postings {
            let account = self.store.account(*id)?;
            let next = account
                .balance
                .checked_add(*delta)
                .ok_or_else(|| LedgerError::arithmetic_overflow("posting", *id))?;
            if next < Decimal::ZERO {
                return Err(LedgerError::insufficient_funds(
                    &account.account_number,
                    account.balance,
                    -*delta,
                ));
            }
        }
        Ok(())
    }

    fn apply_postings(&self, postings: &[(AccountId, Decimal)]) -> Result<(), LedgerError> {
        for (id, delta) in postings {
            self.store.update_account_balance(*id, *delta)?;
        }
        Ok(())
    }

    /// Post a single transaction leg atomically
    ///
    /// `commit` runs after the balance check and before any write; its error
    /// aborts the whole operation.
    ///
    /// # Returns
    ///
    /// The stored transaction and whatever `commit` produced
    pub(crate) fn post_single<C, F>(
        &self,
        leg: NewTransaction,
        commit: F,
    ) -> Result<(Transaction, C), LedgerError>
    where
        F: FnOnce() -> Result<C, LedgerError>,
    {
        let delta = match leg.direction {
            Direction::Credit => leg.amount,
            Direction::Debit => -leg.amount,
        };
        let postings = [(leg.account_id, delta)];

        self.locks.with_locked(&[leg.account_id], || {
            self.check_postings(&postings)?;
            let committed = commit()?;
            self.apply_postings(&postings)?;
            Ok((self.store.create_transaction(leg), committed))
        })
    }

    /// Post a paired debit and credit atomically
    ///
    /// Same contract as [`LedgerEngine::post_single`], holding the locks of
    /// both accounts.
    ///
    /// # Returns
    ///
    /// The debit leg, the credit leg and whatever `commit` produced
    pub(crate) fn post_pair<C, F>(
        &self,
        movement: Movement<'_>,
        commit: F,
    ) -> Result<(Transaction, Transaction, C), LedgerError>
    where
        F: FnOnce() -> Result<C, LedgerError>,
    {
        let source = movement.source;
        let destination = movement.destination;
        if source.id == destination.id {
            return Err(LedgerError::validation(
                "destination",
                "source and destination accounts must differ",
            ));
        }

        let postings = [
            (source.id, -movement.debit_amount),
            (destination.id, movement.credit_amount),
        ];

        self.locks.with_locked(&[source.id, destination.id], || {
            self.check_postings(&postings)?;
            let committed = commit()?;
            self.apply_postings(&postings)?;

            let mut debit = NewTransaction::debit(
                source.id,
                movement.debit_amount,
                movement.debit_type,
                movement.description,
                movement.reference,
            )
            .to_account(&destination.account_number);
            let mut credit = NewTransaction::credit(
                destination.id,
                movement.credit_amount,
                movement.credit_type,
                movement.description,
                movement.reference,
            )
            .from_account(&source.account_number);
            if let Some(conversion) = movement.conversion {
                debit = debit.with_conversion(conversion.clone());
                credit = credit.with_conversion(conversion);
            }

            let debit = self.store.create_transaction(debit);
            let credit = self.store.create_transaction(credit);
            Ok((debit, credit, committed))
        })
    }

    fn notify(&self, event: &str, reference: &str, user: UserId, amount: Decimal, currency: &str) {
        self.notifier
            .broadcast(&Notification::new(event, reference, user, amount, currency));
    }
}

/// Fail with `Forbidden` unless `actor` owns `record`
pub(crate) fn ensure_owner<T: Owned>(actor: UserId, record: &T) -> Result<(), LedgerError> {
    if record.owner() != actor {
        return Err(LedgerError::forbidden(actor, T::ENTITY, record.id()));
    }
    Ok(())
}

/// Reference string shared by the legs of one operation, e.g. `TRF-3F9A12C07B44`
pub(crate) fn new_reference(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    format!("{}-{}", prefix, &id[..12])
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_reference_format() {
        let reference = new_reference("TRF");
        assert!(reference.starts_with("TRF-"));
        assert_eq!(reference.len(), 16);
        assert_ne!(reference, new_reference("TRF"));
    }

    #[test]
    fn test_failed_commit_leaves_balances_untouched() {
        let engine = engine();
        let alice = customer(&engine, "alice");
        let a = funded(&engine, &alice, "1000000001", 10000);
        let b = funded(&engine, &alice, "1000000002", 1000);
        let before = engine.store().transaction_count();

        let result: Result<(Transaction, Transaction, ()), LedgerError> = engine.post_pair(
            Movement {
                source: &a,
                debit_amount: Decimal::new(4000, 2),
                debit_type: TransactionType::Withdrawal,
                destination: &b,
                credit_amount: Decimal::new(4000, 2),
                credit_type: TransactionType::Deposit,
                description: "aborted",
                reference: "REF",
                conversion: None,
            },
            || Err(LedgerError::internal("abort")),
        );

        assert!(result.is_err());
        assert_eq!(balance(&engine, a.id), Decimal::new(10000, 2));
        assert_eq!(balance(&engine, b.id), Decimal::new(1000, 2));
        assert_eq!(engine.store().transaction_count(), before);
    }

    #[test]
    fn test_ensure_owner() {
        let engine = engine();
        let alice = customer(&engine, "alice");
        let bob = customer(&engine, "bob");
        let account = funded(&engine, &alice, "1000000001", 0);

        assert!(ensure_owner(alice.id, &account).is_ok());
        assert_eq!(
            ensure_owner(bob.id, &account),
            Err(LedgerError::forbidden(bob.id, "account", account.id))
        );
    }
}
