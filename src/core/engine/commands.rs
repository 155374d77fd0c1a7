//! Script command dispatch
//!
//! Resolves the names a script uses (usernames, account numbers, symbols) into
//! ids and calls the matching engine operation.

use super::LedgerEngine;
use crate::types::*;

impl LedgerEngine {
    /// Execute one script command
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - short summary of what happened, for logging
    /// * `Err(LedgerError)` - the operation was rejected and had no effect
    pub fn execute(&self, command: &Command) -> Result<String, LedgerError> {
        match command {
            Command::Register {
                username,
                password,
                admin,
            } => {
                let new = NewUser::with_credentials(username, password);
                let user = if *admin {
                    self.register_admin(new)?
                } else {
                    self.register(new)?
                };
                Ok(format!("user {} registered as {}", user.username, user.id))
            }

            Command::OpenAccount {
                username,
                account_number,
                account_type,
                currency,
                initial_deposit,
            } => {
                let actor = self.actor(username)?;
                let account = self.open_account(
                    actor,
                    OpenAccount {
                        account_type: *account_type,
                        currency: currency.clone(),
                        initial_deposit: *initial_deposit,
                        account_number: account_number.clone(),
                    },
                )?;
                Ok(format!("account {} opened", account.account_number))
            }

            Command::Deposit {
                username,
                account_number,
                amount,
                description,
            } => {
                let actor = self.actor(username)?;
                let account = self.store.account_by_number(account_number)?;
                let tx = self.deposit(actor, account.id, amount, description)?;
                Ok(format!("deposit {}", tx.reference))
            }

            Command::Transfer {
                username,
                from,
                to,
                amount,
                description,
            } => {
                let actor = self.actor(username)?;
                let receipt =
                    self.transfer(actor, FundTransfer::new(from, to, amount, description))?;
                Ok(format!("transfer {}", receipt.reference))
            }

            Command::CreateBill {
                username,
                payee_account_number,
                payee_name,
                amount,
            } => {
                let actor = self.actor(username)?;
                let bill = self.create_bill(
                    actor,
                    NewBill {
                        payee_name: payee_name.clone(),
                        payee_account_number: payee_account_number.clone(),
                        amount: *amount,
                        due_date: None,
                    },
                )?;
                Ok(format!("bill {} created", bill.id))
            }

            Command::PayBill {
                username,
                account_number,
                bill_id,
                amount,
            } => {
                let actor = self.actor(username)?;
                let account = self.store.account_by_number(account_number)?;
                let receipt = self.pay_bill(actor, account.id, *bill_id, Some(amount.as_str()))?;
                Ok(format!("bill {} paid {}", receipt.bill.id, receipt.payment.reference))
            }

            Command::AddExternalAccount {
                username,
                account_number,
                currency,
            } => {
                let actor = self.actor(username)?;
                let external = self.add_external_account(
                    actor,
                    ExternalAccountDetails {
                        bank_name: "Correspondent Bank".to_string(),
                        account_holder: username.clone(),
                        account_number: account_number.clone(),
                        swift_code: "CORRXXXX".to_string(),
                        country: currency.chars().take(2).collect(),
                        currency: currency.clone(),
                    },
                )?;
                Ok(format!("external account {} added", external.id))
            }

            Command::SendInternational {
                username,
                account_number,
                external_account_id,
                amount,
                purpose,
            } => {
                let actor = self.actor(username)?;
                let account = self.store.account_by_number(account_number)?;
                let transfer = self.send_international(
                    actor,
                    InternationalRequest {
                        from_account_id: account.id,
                        external_account_id: *external_account_id,
                        amount: amount.clone(),
                        purpose: purpose.clone(),
                    },
                )?;
                Ok(format!("international transfer {} pending", transfer.id))
            }

            Command::Settle => {
                let settled = self.settle_all_pending();
                Ok(format!("{} international transfers settled", settled.len()))
            }

            Command::FailInternational {
                username,
                transfer_id,
                reason,
            } => {
                let admin = self.actor(username)?;
                let transfer = self.fail_international(admin, *transfer_id, reason)?;
                Ok(format!("international transfer {} failed", transfer.id))
            }

            Command::BuyCrypto {
                username,
                account_number,
                symbol,
                amount,
            } => {
                let actor = self.actor(username)?;
                let account = self.store.account_by_number(account_number)?;
                let receipt = self.buy_crypto(
                    actor,
                    CryptoPurchase {
                        from_account_id: account.id,
                        symbol: symbol.clone(),
                        amount: amount.clone(),
                    },
                )?;
                Ok(format!("bought {} {}", receipt.credited_amount, symbol.to_ascii_uppercase()))
            }

            Command::ExchangeCrypto {
                username,
                source_symbol,
                target_symbol,
                amount,
            } => {
                let actor = self.actor(username)?;
                let holding = self.holding(actor, source_symbol)?;
                let receipt = self.exchange_crypto(
                    actor,
                    CryptoExchange {
                        from_account_id: holding.id,
                        target_symbol: target_symbol.clone(),
                        amount: amount.clone(),
                    },
                )?;
                Ok(format!(
                    "exchanged into {} {}",
                    receipt.credited_amount,
                    target_symbol.to_ascii_uppercase()
                ))
            }

            Command::RequestTransfer {
                username,
                from,
                to,
                amount,
                description,
            } => {
                let actor = self.actor(username)?;
                let source = self.store.account_by_number(from)?;
                let request = self.request_transfer(
                    actor,
                    NewTransferRequest {
                        from_account_id: source.id,
                        to_account_number: to.clone(),
                        amount: amount.clone(),
                        description: description.clone(),
                    },
                )?;
                Ok(format!("transfer request {} filed", request.id))
            }

            Command::ReviewTransfer {
                username,
                request_id,
                approve,
                note,
            } => {
                let admin = self.actor(username)?;
                let request = if *approve {
                    self.approve_transfer(admin, *request_id, note.clone())?
                } else {
                    self.reject_transfer(admin, *request_id, note.clone())?
                };
                Ok(format!("transfer request {} {}", request.id, request.status))
            }

            Command::ApplyLoan {
                username,
                account_number,
                loan_id,
                amount,
                term_months,
            } => {
                let actor = self.actor(username)?;
                let account = self.store.account_by_number(account_number)?;
                let application = self.apply_for_loan(
                    actor,
                    LoanRequest {
                        loan_id: *loan_id,
                        amount: amount.clone(),
                        term_months: *term_months,
                        purpose: String::new(),
                        deposit_account_id: account.id,
                    },
                )?;
                Ok(format!("loan application {} filed", application.id))
            }

            Command::ReviewLoan {
                username,
                application_id,
                approve,
                note,
            } => {
                let admin = self.actor(username)?;
                let application = if *approve {
                    self.approve_loan(admin, *application_id, note.clone())?
                } else {
                    self.reject_loan(admin, *application_id, note.clone())?
                };
                Ok(format!("loan application {} {}", application.id, application.status))
            }

            Command::DisburseLoan {
                username,
                application_id,
            } => {
                let admin = self.actor(username)?;
                let application = self.disburse_loan(admin, *application_id)?;
                Ok(format!("loan application {} disbursed", application.id))
            }

            Command::RequestCryptoTransfer {
                username,
                source_symbol,
                to,
                amount,
                note,
            } => {
                let actor = self.actor(username)?;
                let holding = self.holding(actor, source_symbol)?;
                let to_account_number = match to.strip_prefix('@') {
                    Some(recipient) => {
                        let recipient = self.actor(recipient)?;
                        self.store
                            .crypto_account_for(recipient, &holding.currency)?
                            .account_number
                    }
                    None => to.clone(),
                };
                let request = self.request_crypto_transfer(
                    actor,
                    NewCryptoTransferRequest {
                        from_account_id: holding.id,
                        to_account_number,
                        amount: amount.clone(),
                        note: note.clone(),
                    },
                )?;
                Ok(format!("crypto transfer request {} filed", request.id))
            }

            Command::ReviewCryptoTransfer {
                username,
                request_id,
                approve,
                note,
            } => {
                let admin = self.actor(username)?;
                let request = if *approve {
                    self.approve_crypto_transfer(admin, *request_id, note.clone())?
                } else {
                    self.reject_crypto_transfer(admin, *request_id, note.clone())?
                };
                Ok(format!("crypto transfer request {} {}", request.id, request.status))
            }

            Command::Categorize {
                username,
                transaction_id,
                category,
                subcategory,
            } => {
                let actor = self.actor(username)?;
                let tx = self.categorize_transaction(
                    actor,
                    *transaction_id,
                    CategoryUpdate {
                        category: category.clone(),
                        subcategory: subcategory.clone(),
                        ..Default::default()
                    },
                )?;
                Ok(format!("transaction {} categorized", tx.id))
            }
        }
    }

    fn actor(&self, username: &str) -> Result<UserId, LedgerError> {
        self.store.user_by_username(username).map(|user| user.id)
    }

    fn holding(&self, actor: UserId, symbol: &str) -> Result<Account, LedgerError> {
        self.store
            .find_crypto_account(actor, symbol.trim())
            .ok_or_else(|| LedgerError::not_found("crypto account", symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use rust_decimal::Decimal;

    fn register(engine: &LedgerEngine, username: &str, admin: bool) {
        engine
            .execute(&Command::Register {
                username: username.to_string(),
                password: "secret-pass".to_string(),
                admin,
            })
            .unwrap();
    }

    fn open(engine: &LedgerEngine, username: &str, number: &str, cents: i64) {
        engine
            .execute(&Command::OpenAccount {
                username: username.to_string(),
                account_number: Some(number.to_string()),
                account_type: AccountType::Checking,
                currency: "USD".to_string(),
                initial_deposit: Decimal::new(cents, 2),
            })
            .unwrap();
    }

    #[test]
    fn test_execute_transfer_by_account_numbers() {
        let engine = engine();
        register(&engine, "alice", false);
        register(&engine, "bob", false);
        open(&engine, "alice", "A1", 10000);
        open(&engine, "bob", "B1", 1000);

        let summary = engine
            .execute(&Command::Transfer {
                username: "alice".to_string(),
                from: "A1".to_string(),
                to: "B1".to_string(),
                amount: "40.00".to_string(),
                description: String::new(),
            })
            .unwrap();

        assert!(summary.starts_with("transfer TRF-"));
        let a = engine.store().account_by_number("A1").unwrap();
        let b = engine.store().account_by_number("B1").unwrap();
        assert_eq!(a.balance, Decimal::new(6000, 2));
        assert_eq!(b.balance, Decimal::new(5000, 2));
    }

    #[test]
    fn test_execute_unknown_user() {
        let engine = engine();
        let result = engine.execute(&Command::Deposit {
            username: "ghost".to_string(),
            account_number: "A1".to_string(),
            amount: "1".to_string(),
            description: String::new(),
        });
        assert_eq!(result, Err(LedgerError::not_found("user", "ghost")));
    }

    #[test]
    fn test_execute_crypto_transfer_to_username() {
        let engine = engine();
        register(&engine, "root", true);
        register(&engine, "alice", false);
        register(&engine, "bob", false);
        open(&engine, "alice", "A1", 100_000);

        let step = |command: Command| engine.execute(&command).unwrap();
        step(Command::BuyCrypto {
            username: "alice".to_string(),
            account_number: "A1".to_string(),
            symbol: "eth".to_string(),
            amount: "456.10".to_string(),
        });
        step(Command::RequestCryptoTransfer {
            username: "alice".to_string(),
            source_symbol: "ETH".to_string(),
            to: "@bob".to_string(),
            amount: "0.1".to_string(),
            note: String::new(),
        });
        step(Command::ReviewCryptoTransfer {
            username: "root".to_string(),
            request_id: 1,
            approve: true,
            note: None,
        });

        let bob = engine.store().user_by_username("bob").unwrap();
        let holding = engine.store().find_crypto_account(bob.id, "ETH").unwrap();
        assert_eq!(holding.balance, Decimal::new(10_000_000, 8));
    }
}
