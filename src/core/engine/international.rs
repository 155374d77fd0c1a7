//! International transfers
//!
//! Sending debits the source account right away and records the transfer as
//! `pending` with a `settle_after` time. Settlement is a separate pass over the
//! store ([`LedgerEngine::settle_due`]) rather than an in-process timer, so
//! nothing is lost if the process stops before a transfer settles.

use super::{ensure_owner, new_reference, LedgerEngine};
use crate::core::currency;
use crate::core::money::parse_amount;
use crate::types::*;
use chrono::{DateTime, Duration, Utc};

impl LedgerEngine {
    /// Send money from a fiat account to one of the actor's external accounts
    ///
    /// The fee is charged on top of the amount; the source is debited by
    /// `total_debit = amount + fee` through a single withdrawal carrying the
    /// conversion details.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the actor owns neither the account nor the external account
    /// - `InvalidAmount` if the amount is not a positive number or too large to price
    /// - `UnknownCurrency` if either currency is missing from the rate table
    /// - `InsufficientFunds` if the balance is below `total_debit`
    pub fn send_international(
        &self,
        actor: UserId,
        request: InternationalRequest,
    ) -> Result<InternationalTransfer, LedgerError> {
        let source = self.owned_fiat_account(actor, request.from_account_id)?;
        let external = self.store.external_account(request.external_account_id)?;
        ensure_owner(actor, &external)?;
        let amount = parse_amount(&request.amount, FIAT_SCALE)?;

        let quote = currency::quote_international(
            amount,
            &source.currency,
            &external.currency,
            self.config.international_fee_rate,
        )?;

        let now = Utc::now();
        let settle_after = now + to_chrono(self.config.settlement_delay);
        let estimated_delivery = now + Duration::days(self.config.delivery_window_days);
        let reference = new_reference("INT");
        let purpose = request.purpose.trim().to_string();

        let leg = NewTransaction::debit(
            source.id,
            quote.total_debit,
            TransactionType::Withdrawal,
            &format!("International transfer to {}", external.bank_name),
            &reference,
        )
        .from_account(&source.account_number)
        .to_account(&external.account_number)
        .with_conversion(ConversionMeta {
            original_amount: amount,
            original_currency: source.currency.clone(),
            exchange_rate: quote.exchange_rate,
        });

        let (_, transfer) = self.post_single(leg, || {
            Ok(self.store.create_international_transfer(|id| InternationalTransfer {
                id,
                user_id: actor,
                from_account_id: source.id,
                external_account_id: external.id,
                amount,
                source_currency: source.currency.clone(),
                target_currency: external.currency.clone(),
                exchange_rate: quote.exchange_rate,
                fee: quote.fee,
                converted_amount: quote.converted_amount,
                total_debit: quote.total_debit,
                purpose,
                status: InternationalTransferStatus::Pending,
                reference: reference.clone(),
                estimated_delivery,
                settle_after,
                completed_at: None,
                failure_reason: None,
                created_at: now,
            }))
        })?;

        tracing::info!(
            transfer = transfer.id,
            from = %source.account_number,
            amount = %amount,
            fee = %transfer.fee,
            total_debit = %transfer.total_debit,
            target = %transfer.target_currency,
            reference = %reference,
            "international transfer submitted"
        );
        self.notify(
            "international_transfer",
            &reference,
            actor,
            transfer.total_debit,
            &transfer.source_currency,
        );
        Ok(transfer)
    }

    pub fn international_transfers(&self, actor: UserId) -> Vec<InternationalTransfer> {
        self.store.list_international_transfers_by_user(actor)
    }

    /// Complete every pending transfer whose `settle_after` is at or before `now`
    ///
    /// Idempotent: a transfer that another pass (or a failure) already moved on
    /// is skipped.
    ///
    /// # Returns
    ///
    /// Ids of the transfers this call completed
    pub fn settle_due(&self, now: DateTime<Utc>) -> Vec<InternationalTransferId> {
        let mut settled = Vec::new();

        for due in self.store.due_international_transfers(now) {
            let result = self.store.update_international_transfer(due.id, |transfer| {
                if transfer.status != InternationalTransferStatus::Pending {
                    return Err(LedgerError::invalid_state(
                        "international transfer",
                        transfer.id,
                        transfer.status,
                        "settle",
                    ));
                }
                transfer.status = InternationalTransferStatus::Completed;
                transfer.completed_at = Some(now);
                Ok(())
            });

            match result {
                Ok(transfer) => {
                    tracing::info!(
                        transfer = transfer.id,
                        reference = %transfer.reference,
                        "international transfer settled"
                    );
                    self.notify(
                        "international_settled",
                        &transfer.reference,
                        transfer.user_id,
                        transfer.converted_amount,
                        &transfer.target_currency,
                    );
                    settled.push(transfer.id);
                }
                Err(error) => tracing::debug!(transfer = due.id, %error, "settlement skipped"),
            }
        }

        settled
    }

    /// Settle everything pending as if the settlement delay had elapsed
    pub fn settle_all_pending(&self) -> Vec<InternationalTransferId> {
        self.settle_due(Utc::now() + to_chrono(self.config.settlement_delay))
    }

    /// Mark a transfer failed and refund `total_debit` to its source account
    ///
    /// Admin only. Allowed from `pending` or `processing`.
    pub fn fail_international(
        &self,
        admin: UserId,
        id: InternationalTransferId,
        reason: &str,
    ) -> Result<InternationalTransfer, LedgerError> {
        self.require_admin(admin)?;
        let transfer = self.store.international_transfer(id)?;
        let source = self.store.account(transfer.from_account_id)?;
        let reason = match reason.trim() {
            "" => "Rejected by beneficiary bank".to_string(),
            text => text.to_string(),
        };

        let refund = NewTransaction::credit(
            source.id,
            transfer.total_debit,
            TransactionType::Refund,
            &format!("Refund of international transfer {}", transfer.reference),
            &transfer.reference,
        )
        .to_account(&source.account_number);

        let (_, failed) = self.post_single(refund, || {
            self.store.update_international_transfer(id, |t| match t.status {
                InternationalTransferStatus::Pending | InternationalTransferStatus::Processing => {
                    t.status = InternationalTransferStatus::Failed;
                    t.failure_reason = Some(reason.clone());
                    Ok(())
                }
                other => Err(LedgerError::invalid_state(
                    "international transfer",
                    id,
                    other,
                    "fail",
                )),
            })
        })?;

        tracing::warn!(
            transfer = id,
            reason = %reason,
            refund = %failed.total_debit,
            "international transfer failed"
        );
        self.notify(
            "international_refund",
            &failed.reference,
            failed.user_id,
            failed.total_debit,
            &failed.source_currency,
        );
        Ok(failed)
    }
}

fn to_chrono(delay: std::time::Duration) -> Duration {
    Duration::from_std(delay).unwrap_or_else(|_| Duration::days(3650))
}
