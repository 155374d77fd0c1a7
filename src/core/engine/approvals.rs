//! Approval workflows
//!
//! Loan applications, crypto transfer requests and transfer requests share one
//! lifecycle:
//!
//! ```text
//! pending ──approve──► approved ──disburse──► completed   (loans)
//! pending ──approve──────────────────────────► completed   (transfer requests)
//! pending ──reject───► rejected
//! ```
//!
//! Only administrators move a record out of `pending`. Transfer requests are
//! validated when filed and validated again, under the account locks, when
//! approved: the balance may have changed in between. A failed re-validation
//! leaves the request pending.

use super::{new_reference, LedgerEngine, Movement};
use crate::core::money::parse_amount;
use crate::core::traits::Record;
use crate::types::*;
use chrono::Utc;

/// Records carrying the shared review fields
trait Reviewable: Record {
    fn status(&self) -> ApprovalStatus;
    fn stamp(&mut self, status: ApprovalStatus, reviewer: UserId, note: Option<String>);
}

macro_rules! reviewable {
    ($ty:ty) => {
        impl Reviewable for $ty {
            fn status(&self) -> ApprovalStatus {
                self.status
            }

            fn stamp(&mut self, status: ApprovalStatus, reviewer: UserId, note: Option<String>) {
                self.status = status;
                self.reviewed_by = Some(reviewer);
                self.review_note = note.filter(|n| !n.trim().is_empty());
                self.reviewed_at = Some(Utc::now());
            }
        }
    };
}

reviewable!(LoanApplication);
reviewable!(CryptoTransferRequest);
reviewable!(TransferRequest);

/// Move a pending record to `next`, failing with `InvalidState` otherwise
fn review<T: Reviewable>(
    row: &mut T,
    operation: &str,
    next: ApprovalStatus,
    reviewer: UserId,
    note: Option<String>,
) -> Result<(), LedgerError> {
    row.status().ensure_pending(T::ENTITY, row.id(), operation)?;
    row.stamp(next, reviewer, note);
    Ok(())
}

impl LedgerEngine {
    // ---------------------------------------------------------------- loans

    pub fn loan_products(&self) -> Vec<LoanProduct> {
        self.store.list_loan_products()
    }

    /// File a loan application
    ///
    /// # Errors
    ///
    /// - `NotFound` if the loan product does not exist
    /// - `Validation` if the amount or term is outside the product limits
    /// - `Forbidden` if the deposit account belongs to someone else
    pub fn apply_for_loan(
        &self,
        actor: UserId,
        request: LoanRequest,
    ) -> Result<LoanApplication, LedgerError> {
        let product = self.store.loan_product(request.loan_id)?;
        let deposit = self.owned_fiat_account(actor, request.deposit_account_id)?;
        let amount = parse_amount(&request.amount, FIAT_SCALE)?;

        if amount < product.min_amount || amount > product.max_amount {
            return Err(LedgerError::validation(
                "amount",
                format!(
                    "{} requires between {} and {}",
                    product.name, product.min_amount, product.max_amount
                ),
            ));
        }
        if request.term_months < product.min_term_months
            || request.term_months > product.max_term_months
        {
            return Err(LedgerError::validation(
                "term_months",
                format!(
                    "{} requires {}-{} months",
                    product.name, product.min_term_months, product.max_term_months
                ),
            ));
        }

        let application = self.store.create_loan_application(|id| LoanApplication {
            id,
            user_id: actor,
            loan_id: product.id,
            amount,
            term_months: request.term_months,
            purpose: request.purpose.trim().to_string(),
            deposit_account_id: deposit.id,
            status: ApprovalStatus::Pending,
            reviewed_by: None,
            review_note: None,
            created_at: Utc::now(),
            reviewed_at: None,
        });
        tracing::info!(
            user = actor,
            application = application.id,
            loan = %product.name,
            amount = %amount,
            "loan application filed"
        );
        Ok(application)
    }

    pub fn loan_applications(&self, actor: UserId) -> Vec<LoanApplication> {
        self.store.list_loan_applications_by_user(actor)
    }

    pub fn pending_loan_applications(
        &self,
        admin: UserId,
    ) -> Result<Vec<LoanApplication>, LedgerError> {
        self.require_admin(admin)?;
        Ok(self.store.list_loan_applications_by_status(ApprovalStatus::Pending))
    }

    pub fn approve_loan(
        &self,
        admin: UserId,
        id: LoanApplicationId,
        note: Option<String>,
    ) -> Result<LoanApplication, LedgerError> {
        self.require_admin(admin)?;
        let application = self
            .store
            .update_loan_application(id, |a| {
                review(a, "approve", ApprovalStatus::Approved, admin, note)
            })?;
        tracing::info!(admin, application = id, "loan application approved");
        Ok(application)
    }

    pub fn reject_loan(
        &self,
        admin: UserId,
        id: LoanApplicationId,
        note: Option<String>,
    ) -> Result<LoanApplication, LedgerError> {
        self.require_admin(admin)?;
        let application = self
            .store
            .update_loan_application(id, |a| {
                review(a, "reject", ApprovalStatus::Rejected, admin, note)
            })?;
        tracing::info!(admin, application = id, "loan application rejected");
        Ok(application)
    }

    /// Pay out an approved loan into its deposit account
    pub fn disburse_loan(
        &self,
        admin: UserId,
        id: LoanApplicationId,
    ) -> Result<LoanApplication, LedgerError> {
        self.require_admin(admin)?;
        let application = self.store.loan_application(id)?;
        let product = self.store.loan_product(application.loan_id)?;
        let deposit = self.store.account(application.deposit_account_id)?;
        let reference = new_reference("LOAN");

        let leg = NewTransaction::credit(
            deposit.id,
            application.amount,
            TransactionType::LoanDisbursement,
            &format!("{} disbursement", product.name),
            &reference,
        )
        .to_account(&deposit.account_number);

        let (_, disbursed) = self.post_single(leg, || {
            self.store.update_loan_application(id, |a| {
                if a.status != ApprovalStatus::Approved {
                    return Err(LedgerError::invalid_state(
                        LoanApplication::ENTITY,
                        id,
                        a.status,
                        "disburse",
                    ));
                }
                a.status = ApprovalStatus::Completed;
                Ok(())
            })
        })?;

        tracing::info!(
            admin,
            application = id,
            amount = %disbursed.amount,
            reference = %reference,
            "loan disbursed"
        );
        self.notify(
            "loan_disbursement",
            &reference,
            disbursed.user_id,
            disbursed.amount,
            &deposit.currency,
        );
        Ok(disbursed)
    }

    // ------------------------------------------------ crypto transfer requests

    /// File a request to send crypto to another holding account
    ///
    /// The destination must hold the same asset. The balance is checked now
    /// and again at approval.
    pub fn request_crypto_transfer(
        &self,
        actor: UserId,
        request: NewCryptoTransferRequest,
    ) -> Result<CryptoTransferRequest, LedgerError> {
        let source = self.owned_account(actor, request.from_account_id)?;
        if !source.is_crypto {
            return Err(LedgerError::validation(
                "from_account_id",
                format!("{} is not a crypto account", source.account_number),
            ));
        }
        let destination = self.store.account_by_number(&request.to_account_number)?;
        if !destination.is_crypto || destination.currency != source.currency {
            return Err(LedgerError::validation(
                "to_account_number",
                format!("{} does not hold {}", destination.account_number, source.currency),
            ));
        }
        if destination.id == source.id {
            return Err(LedgerError::validation(
                "to_account_number",
                "source and destination accounts must differ",
            ));
        }
        let amount = parse_amount(&request.amount, CRYPTO_SCALE)?;
        if source.balance < amount {
            return Err(LedgerError::insufficient_funds(
                &source.account_number,
                source.balance,
                amount,
            ));
        }

        let created = self.store.create_crypto_transfer_request(|id| CryptoTransferRequest {
            id,
            user_id: actor,
            from_account_id: source.id,
            to_account_number: destination.account_number.clone(),
            symbol: source.currency.clone(),
            amount,
            note: request.note.trim().to_string(),
            status: ApprovalStatus::Pending,
            reviewed_by: None,
            review_note: None,
            reference: None,
            created_at: Utc::now(),
            reviewed_at: None,
        });
        tracing::info!(
            user = actor,
            request = created.id,
            symbol = %created.symbol,
            amount = %amount,
            "crypto transfer requested"
        );
        Ok(created)
    }

    pub fn crypto_transfer_requests(&self, actor: UserId) -> Vec<CryptoTransferRequest> {
        self.store.list_crypto_transfer_requests_by_user(actor)
    }

    pub fn pending_crypto_transfer_requests(
        &self,
        admin: UserId,
    ) -> Result<Vec<CryptoTransferRequest>, LedgerError> {
        self.require_admin(admin)?;
        Ok(self.store.list_crypto_transfer_requests_by_status(ApprovalStatus::Pending))
    }

    /// Approve a crypto transfer request and move the funds
    ///
    /// # Errors
    ///
    /// - `AdminRequired` if the actor is not an administrator
    /// - `InvalidState` if the request is no longer pending (double approval)
    /// - `InsufficientFunds` if the balance no longer covers the amount; the
    ///   request stays pending
    pub fn approve_crypto_transfer(
        &self,
        admin: UserId,
        id: CryptoTransferRequestId,
        note: Option<String>,
    ) -> Result<CryptoTransferRequest, LedgerError> {
        self.require_admin(admin)?;
        let request = self.store.crypto_transfer_request(id)?;
        request.status.ensure_pending(CryptoTransferRequest::ENTITY, id, "approve")?;
        let source = self.store.account(request.from_account_id)?;
        let destination = self.store.account_by_number(&request.to_account_number)?;
        let reference = new_reference("CTR");
        let description = format!("Crypto transfer of {} {}", request.amount, request.symbol);

        let (_, _, approved) = self.post_pair(
            Movement {
                source: &source,
                debit_amount: request.amount,
                debit_type: TransactionType::CryptoTransfer,
                destination: &destination,
                credit_amount: request.amount,
                credit_type: TransactionType::CryptoTransfer,
                description: &description,
                reference: &reference,
                conversion: None,
            },
            || {
                self.store.update_crypto_transfer_request(id, |r| {
                    review(r, "approve", ApprovalStatus::Completed, admin, note)?;
                    r.reference = Some(reference.clone());
                    Ok(())
                })
            },
        )?;

        tracing::info!(admin, request = id, reference = %reference, "crypto transfer approved");
        self.notify(
            "crypto_transfer",
            &reference,
            approved.user_id,
            approved.amount,
            &approved.symbol,
        );
        Ok(approved)
    }

    pub fn reject_crypto_transfer(
        &self,
        admin: UserId,
        id: CryptoTransferRequestId,
        note: Option<String>,
    ) -> Result<CryptoTransferRequest, LedgerError> {
        self.require_admin(admin)?;
        let rejected = self
            .store
            .update_crypto_transfer_request(id, |r| {
                review(r, "reject", ApprovalStatus::Rejected, admin, note)
            })?;
        tracing::info!(admin, request = id, "crypto transfer rejected");
        Ok(rejected)
    }

    // ---------------------------------------------------- transfer requests

    /// File a fiat transfer that needs administrator approval
    pub fn request_transfer(
        &self,
        actor: UserId,
        request: NewTransferRequest,
    ) -> Result<TransferRequest, LedgerError> {
        let source = self.owned_fiat_account(actor, request.from_account_id)?;
        let destination = self.store.account_by_number(&request.to_account_number)?;
        if destination.id == source.id {
            return Err(LedgerError::validation(
                "to_account_number",
                "source and destination accounts must differ",
            ));
        }
        if destination.currency != source.currency {
            return Err(LedgerError::validation(
                "to_account_number",
                format!("{} does not hold {}", destination.account_number, source.currency),
            ));
        }
        let amount = parse_amount(&request.amount, FIAT_SCALE)?;
        if source.balance < amount {
            return Err(LedgerError::insufficient_funds(
                &source.account_number,
                source.balance,
                amount,
            ));
        }

        let created = self.store.create_transfer_request(|id| TransferRequest {
            id,
            user_id: actor,
            from_account_id: source.id,
            to_account_number: destination.account_number.clone(),
            amount,
            description: request.description.trim().to_string(),
            status: ApprovalStatus::Pending,
            reviewed_by: None,
            review_note: None,
            reference: None,
            created_at: Utc::now(),
            reviewed_at: None,
        });
        tracing::info!(user = actor, request = created.id, amount = %amount, "transfer requested");
        Ok(created)
    }

    pub fn transfer_requests(&self, actor: UserId) -> Vec<TransferRequest> {
        self.store.list_transfer_requests_by_user(actor)
    }

    pub fn pending_transfer_requests(
        &self,
        admin: UserId,
    ) -> Result<Vec<TransferRequest>, LedgerError> {
        self.require_admin(admin)?;
        Ok(self.store.list_transfer_requests_by_status(ApprovalStatus::Pending))
    }

    pub fn approve_transfer(
        &self,
        admin: UserId,
        id: TransferRequestId,
        note: Option<String>,
    ) -> Result<TransferRequest, LedgerError> {
        self.require_admin(admin)?;
        let request = self.store.transfer_request(id)?;
        request.status.ensure_pending(TransferRequest::ENTITY, id, "approve")?;
        let source = self.store.account(request.from_account_id)?;
        let destination = self.store.account_by_number(&request.to_account_number)?;
        let reference = new_reference("TRQ");
        let description = match request.description.as_str() {
            "" => format!("Transfer to {}", destination.account_number),
            text => text.to_string(),
        };

        let (_, _, approved) = self.post_pair(
            Movement {
                source: &source,
                debit_amount: request.amount,
                debit_type: TransactionType::Withdrawal,
                destination: &destination,
                credit_amount: request.amount,
                credit_type: TransactionType::Deposit,
                description: &description,
                reference: &reference,
                conversion: None,
            },
            || {
                self.store.update_transfer_request(id, |r| {
                    review(r, "approve", ApprovalStatus::Completed, admin, note)?;
                    r.reference = Some(reference.clone());
                    Ok(())
                })
            },
        )?;

        tracing::info!(admin, request = id, reference = %reference, "transfer request approved");
        self.notify("transfer", &reference, approved.user_id, approved.amount, &source.currency);
        Ok(approved)
    }

    pub fn reject_transfer(
        &self,
        admin: UserId,
        id: TransferRequestId,
        note: Option<String>,
    ) -> Result<TransferRequest, LedgerError> {
        self.require_admin(admin)?;
        let rejected = self
            .store
            .update_transfer_request(id, |r| {
                review(r, "reject", ApprovalStatus::Rejected, admin, note)
            })?;
        tracing::info!(admin, request = id, "transfer request rejected");
        Ok(rejected)
    }
}
