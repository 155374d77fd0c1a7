//! Intra-bank transfers, bills and external bank accounts

use super::{ensure_owner, new_reference, LedgerEngine, Movement};
use crate::core::currency;
use crate::core::money::{parse_amount, round_to};
use crate::types::*;
use chrono::NaiveDate;
use rust_decimal::Decimal;

impl LedgerEngine {
    /// Move money between two accounts of the same currency
    ///
    /// The destination may belong to any user. Creates a withdrawal on the
    /// source and a deposit on the destination sharing one reference.
    ///
    /// # Arguments
    ///
    /// * `actor` - Acting user, must own the source account
    /// * `request` - Source and destination account numbers, amount, description
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the amount is not a positive number
    /// - `NotFound` if either account does not exist
    /// - `Forbidden` if the actor does not own the source
    /// - `Validation` for same-account or cross-currency transfers
    /// - `InsufficientFunds` if the source balance is below the amount
    pub fn transfer(
        &self,
        actor: UserId,
        request: FundTransfer,
    ) -> Result<TransferReceipt, LedgerError> {
        let source = self.store.account_by_number(&request.from_account_number)?;
        ensure_owner(actor, &source)?;
        let amount = parse_amount(&request.amount, source.scale())?;
        let destination = self.store.account_by_number(&request.to_account_number)?;
        if source.currency != destination.currency {
            return Err(LedgerError::validation(
                "destination",
                format!(
                    "currency {} does not match source currency {}",
                    destination.currency, source.currency
                ),
            ));
        }

        let description = match request.description.trim() {
            "" => format!("Transfer to {}", destination.account_number),
            text => text.to_string(),
        };
        let reference = new_reference("TRF");

        let (debit, credit, ()) = self.post_pair(
            Movement {
                source: &source,
                debit_amount: amount,
                debit_type: TransactionType::Withdrawal,
                destination: &destination,
                credit_amount: amount,
                credit_type: TransactionType::Deposit,
                description: &description,
                reference: &reference,
                conversion: None,
            },
            || Ok(()),
        )?;

        tracing::info!(
            from = %source.account_number,
            to = %destination.account_number,
            amount = %amount,
            reference = %reference,
            "transfer completed"
        );
        self.notify("transfer", &reference, actor, amount, &source.currency);

        Ok(TransferReceipt {
            reference,
            debit,
            credit,
        })
    }

    /// Register a bill to pay later
    pub fn create_bill(&self, actor: UserId, new: NewBill) -> Result<Bill, LedgerError> {
        self.store.user(actor)?;
        let payee_name = new.payee_name.trim();
        let payee_account_number = new.payee_account_number.trim();
        if payee_name.is_empty() {
            return Err(LedgerError::validation("payee_name", "must not be empty"));
        }
        if payee_account_number.is_empty() {
            return Err(LedgerError::validation("payee_account_number", "must not be empty"));
        }
        let amount = round_to(new.amount, FIAT_SCALE);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(new.amount));
        }

        let bill = self.store.create_bill(
            actor,
            NewBill {
                payee_name: payee_name.to_string(),
                payee_account_number: payee_account_number.to_string(),
                amount,
                due_date: new.due_date,
            },
        );
        tracing::info!(user = actor, bill = bill.id, amount = %amount, "bill created");
        Ok(bill)
    }

    pub fn bills(&self, actor: UserId) -> Vec<Bill> {
        self.store.list_bills_by_user(actor)
    }

    pub fn bill_payments(&self, actor: UserId) -> Vec<BillPayment> {
        self.store.list_bill_payments_by_user(actor)
    }

    /// Pay a bill in full from one of the actor's accounts
    ///
    /// `amount` defaults to the bill amount; when given it must equal it, as
    /// partial payments are not supported. The bill flips to `paid` and exactly
    /// one withdrawal is recorded against the payee's account number.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the actor owns neither the bill nor the account
    /// - `InvalidState` if the bill is already paid
    /// - `Validation` if the amount differs from the bill amount
    /// - `InsufficientFunds` if the account balance is below the amount
    pub fn pay_bill(
        &self,
        actor: UserId,
        account_id: AccountId,
        bill_id: BillId,
        amount: Option<&str>,
    ) -> Result<BillPaymentReceipt, LedgerError> {
        let account = self.owned_fiat_account(actor, account_id)?;
        let bill = self.store.bill(bill_id)?;
        ensure_owner(actor, &bill)?;

        let amount = match amount.map(str::trim).filter(|a| !a.is_empty()) {
            Some(raw) => parse_amount(raw, FIAT_SCALE)?,
            None => bill.amount,
        };
        if amount != bill.amount {
            return Err(LedgerError::validation(
                "amount",
                format!("must equal the bill amount {}", bill.amount),
            ));
        }

        let reference = new_reference("BILL");
        let description = format!("Bill payment to {}", bill.payee_name);
        let leg = NewTransaction::debit(
            account.id,
            amount,
            TransactionType::Withdrawal,
            &description,
            &reference,
        )
        .from_account(&account.account_number)
        .to_account(&bill.payee_account_number);

        let (transaction, (bill, payment)) = self.post_single(leg, || {
            let bill = self.store.update_bill_status(bill_id, |status| {
                if status == BillStatus::Paid {
                    Err(LedgerError::invalid_state("bill", bill_id, status, "pay"))
                } else {
                    Ok(BillStatus::Paid)
                }
            })?;
            let payment = self.store.create_bill_payment(&bill, account.id, amount, &reference);
            Ok((bill, payment))
        })?;

        tracing::info!(
            bill = bill.id,
            account = account.id,
            amount = %amount,
            reference = %reference,
            "bill paid"
        );
        self.notify("bill_payment", &reference, actor, amount, &account.currency);

        Ok(BillPaymentReceipt {
            bill,
            payment,
            transaction,
        })
    }

    /// Flip every pending bill due before `today` to `overdue`
    pub fn mark_overdue_bills(&self, today: NaiveDate) -> Vec<BillId> {
        let mut flipped = Vec::new();
        for user in self.store.list_users() {
            for bill in self.store.list_bills_by_user(user.id) {
                let overdue = bill.status == BillStatus::Pending
                    && bill.due_date.is_some_and(|due| due < today);
                if !overdue {
                    continue;
                }
                let updated = self.store.update_bill_status(bill.id, |status| match status {
                    BillStatus::Pending => Ok(BillStatus::Overdue),
                    other => Err(LedgerError::invalid_state(
                        "bill",
                        bill.id,
                        other,
                        "mark overdue",
                    )),
                });
                if updated.is_ok() {
                    flipped.push(bill.id);
                }
            }
        }
        if !flipped.is_empty() {
            tracing::info!(count = flipped.len(), "bills marked overdue");
        }
        flipped
    }

    // --------------------------------------------------- external accounts

    pub fn add_external_account(
        &self,
        actor: UserId,
        details: ExternalAccountDetails,
    ) -> Result<ExternalBankAccount, LedgerError> {
        self.store.user(actor)?;
        let details = validate_external(details)?;
        let account = self.store.create_external_account(actor, details);
        tracing::info!(
            user = actor,
            external = account.id,
            currency = %account.currency,
            "external account added"
        );
        Ok(account)
    }

    pub fn external_accounts(&self, actor: UserId) -> Vec<ExternalBankAccount> {
        self.store.list_external_accounts_by_user(actor)
    }

    pub fn update_external_account(
        &self,
        actor: UserId,
        id: ExternalAccountId,
        details: ExternalAccountDetails,
    ) -> Result<ExternalBankAccount, LedgerError> {
        let existing = self.store.external_account(id)?;
        ensure_owner(actor, &existing)?;
        let details = validate_external(details)?;
        self.store.update_external_account(id, details)
    }

    pub fn remove_external_account(
        &self,
        actor: UserId,
        id: ExternalAccountId,
    ) -> Result<ExternalBankAccount, LedgerError> {
        let existing = self.store.external_account(id)?;
        ensure_owner(actor, &existing)?;
        self.store.delete_external_account(id)
    }
}

fn validate_external(
    details: ExternalAccountDetails,
) -> Result<ExternalAccountDetails, LedgerError> {
    let required = [
        ("bank_name", &details.bank_name),
        ("account_holder", &details.account_holder),
        ("account_number", &details.account_number),
        ("swift_code", &details.swift_code),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(LedgerError::validation(field, "must not be empty"));
        }
    }
    let currency = currency::normalize(&details.currency)?;

    Ok(ExternalAccountDetails {
        bank_name: details.bank_name.trim().to_string(),
        account_holder: details.account_holder.trim().to_string(),
        account_number: details.account_number.trim().to_string(),
        swift_code: details.swift_code.trim().to_ascii_uppercase(),
        country: details.country.trim().to_ascii_uppercase(),
        currency: currency.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;
    use std::thread;

    fn bill(engine: &LedgerEngine, user: &User, cents: i64) -> Bill {
        engine
            .create_bill(
                user.id,
                NewBill {
                    payee_name: "City Power".to_string(),
                    payee_account_number: "9000000001".to_string(),
                    amount: Decimal::new(cents, 2),
                    due_date: None,
                },
            )
            .unwrap()
    }

    #[test]
    fn test_transfer_example_scenario() {
        let engine = engine();
        let alice = customer(&engine, "alice");
        let bob = customer(&engine, "bob");
        let a = funded(&engine, &alice, "1000000001", 10000);
        let b = funded(&engine, &bob, "1000000002", 1000);

        let receipt = engine
            .transfer(alice.id, FundTransfer::new(
                "1000000001",
                "1000000002",
                "40.00",
                "rent share",
            ))
            .unwrap();

        assert_eq!(balance(&engine, a.id), Decimal::new(6000, 2));
        assert_eq!(balance(&engine, b.id), Decimal::new(5000, 2));
        assert_eq!(receipt.debit.reference, receipt.reference);
        assert_eq!(receipt.credit.reference, receipt.reference);
        assert_eq!(receipt.debit.tx_type, TransactionType::Withdrawal);
        assert_eq!(receipt.credit.tx_type, TransactionType::Deposit);
        assert_eq!(engine.store().list_transactions_by_reference(&receipt.reference).len(), 2);
    }

    #[rstest]
    #[case::overdraw("100.01")]
    #[case::zero("0")]
    #[case::negative("-5")]
    #[case::not_a_number("forty")]
    fn test_rejected_transfer_leaves_balances(#[case] amount: &str) {
        let engine = engine();
        let alice = customer(&engine, "alice");
        let a = funded(&engine, &alice, "1000000001", 10000);
        let b = funded(&engine, &alice, "1000000002", 1000);

        let result =
            engine.transfer(alice.id, FundTransfer::new("1000000001", "1000000002", amount, ""));

        assert!(result.is_err());
        assert_eq!(balance(&engine, a.id), Decimal::new(10000, 2));
        assert_eq!(balance(&engine, b.id), Decimal::new(1000, 2));
    }

    #[test]
    fn test_transfer_rule_violations() {
        let engine = engine();
        let alice = customer(&engine, "alice");
        let bob = customer(&engine, "bob");
        funded(&engine, &alice, "1000000001", 10000);
        funded(&engine, &bob, "1000000002", 1000);
        engine
            .open_account(alice.id, OpenAccount::checking("EUR", Decimal::ZERO).with_number("E1"))
            .unwrap();

        let t = |actor: UserId, from: &str, to: &str| {
            engine.transfer(actor, FundTransfer::new(from, to, "1", ""))
        };

        assert!(matches!(
            t(bob.id, "1000000001", "1000000002"),
            Err(LedgerError::Forbidden { .. })
        ));
        assert!(matches!(
            t(alice.id, "1000000001", "1000000001"),
            Err(LedgerError::Validation { .. })
        ));
        assert!(matches!(t(alice.id, "1000000001", "E1"), Err(LedgerError::Validation { .. })));
        assert!(matches!(t(alice.id, "1000000001", "404"), Err(LedgerError::NotFound { .. })));
    }

    #[test]
    fn test_concurrent_transfers_never_overdraw() {
        let engine = Arc::new(engine());
        let alice = customer(&engine, "alice");
        let bob = customer(&engine, "bob");
        let a = funded(&engine, &alice, "1000000001", 10000);
        let b = funded(&engine, &bob, "1000000002", 0);
        let mut handles = vec![];

        for _ in 0..16 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                engine
                    .transfer(alice.id, FundTransfer::new("1000000001", "1000000002", "10.00", ""))
                    .is_ok()
            }));
        }
        let succeeded = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(succeeded, 10);
        assert_eq!(balance(&engine, a.id), Decimal::ZERO);
        assert_eq!(balance(&engine, b.id), Decimal::new(10000, 2));
    }

    #[test]
    fn test_bill_payment_example_scenario() {
        let engine = engine();
        let alice = customer(&engine, "alice");
        let account = funded(&engine, &alice, "1000000001", 10000);
        let bill = bill(&engine, &alice, 8550);
        let before = engine.store().transaction_count();

        let receipt = engine.pay_bill(alice.id, account.id, bill.id, Some("85.50")).unwrap();

        assert_eq!(receipt.bill.status, BillStatus::Paid);
        assert_eq!(engine.store().bill(bill.id).unwrap().status, BillStatus::Paid);
        assert_eq!(engine.store().transaction_count(), before + 1);
        assert_eq!(receipt.transaction.tx_type, TransactionType::Withdrawal);
        assert_eq!(receipt.transaction.amount, Decimal::new(8550, 2));
        assert_eq!(receipt.transaction.to_account.as_deref(), Some("9000000001"));
        assert_eq!(receipt.payment.reference, receipt.transaction.reference);
        assert_eq!(balance(&engine, account.id), Decimal::new(1450, 2));
    }

    #[test]
    fn test_bill_payment_rejections() {
        let engine = engine();
        let alice = customer(&engine, "alice");
        let bob = customer(&engine, "bob");
        let account = funded(&engine, &alice, "1000000001", 10000);
        let bobs_account = funded(&engine, &bob, "1000000002", 10000);
        let bobs_bill = bill(&engine, &bob, 1000);
        let big_bill = bill(&engine, &alice, 20000);
        let small_bill = bill(&engine, &alice, 1000);

        assert!(matches!(
            engine.pay_bill(alice.id, account.id, bobs_bill.id, None),
            Err(LedgerError::Forbidden { .. })
        ));
        assert!(matches!(
            engine.pay_bill(alice.id, account.id, big_bill.id, None),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert!(matches!(
            engine.pay_bill(alice.id, account.id, small_bill.id, Some("5.00")),
            Err(LedgerError::Validation { .. })
        ));
        engine.pay_bill(alice.id, account.id, small_bill.id, None).unwrap();
        assert!(matches!(
            engine.pay_bill(alice.id, account.id, small_bill.id, None),
            Err(LedgerError::InvalidState { .. })
        ));

        assert_eq!(balance(&engine, account.id), Decimal::new(9000, 2));
        assert_eq!(balance(&engine, bobs_account.id), Decimal::new(10000, 2));
        assert_eq!(engine.store().bill(bobs_bill.id).unwrap().status, BillStatus::Pending);
    }

    #[test]
    fn test_mark_overdue_bills() {
        let engine = engine();
        let alice = customer(&engine, "alice");
        let due = |d| NaiveDate::from_ymd_opt(2026, 1, d);
        for day in [Some(5), Some(20), None] {
            engine
                .create_bill(
                    alice.id,
                    NewBill {
                        payee_name: "Water".to_string(),
                        payee_account_number: "9000000002".to_string(),
                        amount: Decimal::ONE,
                        due_date: day.and_then(due),
                    },
                )
                .unwrap();
        }

        let flipped = engine.mark_overdue_bills(NaiveDate::from_ymd_opt(2026, 1, 10).unwrap());
        assert_eq!(flipped, vec![1]);
        assert_eq!(engine.store().bill(1).unwrap().status, BillStatus::Overdue);
    }

    #[test]
    fn test_external_account_crud_is_owner_only() {
        let engine = engine();
        let alice = customer(&engine, "alice");
        let bob = customer(&engine, "bob");
        let details = ExternalAccountDetails {
            bank_name: "Deutsche Bank".to_string(),
            account_holder: "Alice".to_string(),
            account_number: "DE89370400440532013000".to_string(),
            swift_code: "deutdeff".to_string(),
            country: "de".to_string(),
            currency: "eur".to_string(),
        };

        let account = engine.add_external_account(alice.id, details.clone()).unwrap();
        assert_eq!(account.swift_code, "DEUTDEFF");
        assert_eq!(account.currency, "EUR");

        assert!(matches!(
            engine.remove_external_account(bob.id, account.id),
            Err(LedgerError::Forbidden { .. })
        ));
        let renamed = ExternalAccountDetails {
            bank_name: "Commerzbank".to_string(),
            ..details
        };
        assert_eq!(
            engine.update_external_account(alice.id, account.id, renamed).unwrap().bank_name,
            "Commerzbank"
        );
        engine.remove_external_account(alice.id, account.id).unwrap();
        assert!(engine.external_accounts(alice.id).is_empty());
    }
}
