//! Crypto purchase and exchange
//!
//! Both operations pivot through USD value:
//!
//! ```text
//! purchase:  usd = amount / fiat_rate(source currency)
//!            units = round8(usd / usd_rate(symbol))
//! exchange:  usd = amount * usd_rate(source symbol)
//!            target = round8(usd / usd_rate(target symbol))
//! ```
//!
//! The holding account for a symbol is created on first purchase.

use super::{new_reference, LedgerEngine, Movement};
use crate::core::currency;
use crate::core::money::{parse_amount, round_to};
use crate::types::*;
use rust_decimal::Decimal;

impl LedgerEngine {
    pub fn cryptocurrencies(&self) -> Vec<Cryptocurrency> {
        self.store.list_cryptocurrencies()
    }

    /// Buy crypto with money from a fiat account
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the actor does not own the source account
    /// - `Validation` if the source is a crypto account, or the purchase is
    ///   below the asset minimum while minimums are enforced
    /// - `UnknownCurrency` if the symbol is not in the catalog
    /// - `InvalidAmount` if the amount is not positive or buys zero units
    /// - `ArithmeticOverflow` if the amount is too large to price
    /// - `InsufficientFunds` if the source balance is below the amount
    pub fn buy_crypto(
        &self,
        actor: UserId,
        purchase: CryptoPurchase,
    ) -> Result<CryptoReceipt, LedgerError> {
        let source = self.owned_fiat_account(actor, purchase.from_account_id)?;
        let amount = parse_amount(&purchase.amount, FIAT_SCALE)?;
        let asset = self.store.cryptocurrency(&purchase.symbol)?;

        let usd_value = currency::to_usd(amount, &source.currency)?;
        let units = usd_value
            .checked_div(asset.usd_rate)
            .ok_or_else(|| LedgerError::arithmetic_overflow("crypto purchase", source.id))?;
        let units = round_to(units, CRYPTO_SCALE);
        if units <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(&purchase.amount));
        }
        if self.config.enforce_crypto_minimums && units < asset.min_purchase {
            return Err(LedgerError::validation(
                "amount",
                format!("minimum purchase is {} {}", asset.min_purchase, asset.symbol),
            ));
        }
        // Checked again under the lock; fail early before creating a holding account
        if source.balance < amount {
            return Err(LedgerError::insufficient_funds(
                &source.account_number,
                source.balance,
                amount,
            ));
        }

        let holding = self.store.crypto_account_for(actor, &asset.symbol)?;
        let reference = new_reference("CRP");
        let description = format!("Purchase of {} {}", units, asset.symbol);

        self.post_pair(
            Movement {
                source: &source,
                debit_amount: amount,
                debit_type: TransactionType::CryptoPurchase,
                destination: &holding,
                credit_amount: units,
                credit_type: TransactionType::CryptoPurchase,
                description: &description,
                reference: &reference,
                conversion: Some(ConversionMeta {
                    original_amount: amount,
                    original_currency: source.currency.clone(),
                    exchange_rate: asset.usd_rate,
                }),
            },
            || Ok(()),
        )?;

        tracing::info!(
            user = actor,
            symbol = %asset.symbol,
            amount = %amount,
            units = %units,
            reference = %reference,
            "crypto purchased"
        );
        self.notify("crypto_purchase", &reference, actor, units, &asset.symbol);

        Ok(CryptoReceipt {
            reference,
            debited_account_id: source.id,
            debited_amount: amount,
            credited_account_id: holding.id,
            credited_amount: units,
            usd_value: round_to(usd_value, FIAT_SCALE),
        })
    }

    /// Exchange one crypto holding for another at USD parity
    pub fn exchange_crypto(
        &self,
        actor: UserId,
        exchange: CryptoExchange,
    ) -> Result<CryptoReceipt, LedgerError> {
        let source = self.owned_account(actor, exchange.from_account_id)?;
        if !source.is_crypto {
            return Err(LedgerError::validation(
                "account",
                format!("{} is not a crypto account", source.account_number),
            ));
        }
        let amount = parse_amount(&exchange.amount, CRYPTO_SCALE)?;
        let from_asset = self.store.cryptocurrency(&source.currency)?;
        let to_asset = self.store.cryptocurrency(&exchange.target_symbol)?;
        if from_asset.symbol == to_asset.symbol {
            return Err(LedgerError::validation(
                "target_symbol",
                "source and target assets must differ",
            ));
        }

        let overflow = || LedgerError::arithmetic_overflow("crypto exchange", source.id);
        let usd_value = amount.checked_mul(from_asset.usd_rate).ok_or_else(overflow)?;
        let target_amount = usd_value.checked_div(to_asset.usd_rate).ok_or_else(overflow)?;
        let target_amount = round_to(target_amount, CRYPTO_SCALE);
        let rate = from_asset.usd_rate.checked_div(to_asset.usd_rate).ok_or_else(overflow)?;
        if target_amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(&exchange.amount));
        }
        if source.balance < amount {
            return Err(LedgerError::insufficient_funds(
                &source.account_number,
                source.balance,
                amount,
            ));
        }

        let target = self.store.crypto_account_for(actor, &to_asset.symbol)?;
        let reference = new_reference("CEX");
        let description = format!(
            "Exchange {} {} to {} {}",
            amount, from_asset.symbol, target_amount, to_asset.symbol
        );

        self.post_pair(
            Movement {
                source: &source,
                debit_amount: amount,
                debit_type: TransactionType::CryptoExchange,
                destination: &target,
                credit_amount: target_amount,
                credit_type: TransactionType::CryptoExchange,
                description: &description,
                reference: &reference,
                conversion: Some(ConversionMeta {
                    original_amount: amount,
                    original_currency: from_asset.symbol.clone(),
                    exchange_rate: round_to(rate, CRYPTO_SCALE),
                }),
            },
            || Ok(()),
        )?;

        tracing::info!(
            user = actor,
            from = %from_asset.symbol,
            to = %to_asset.symbol,
            amount = %amount,
            received = %target_amount,
            reference = %reference,
            "crypto exchanged"
        );
        self.notify("crypto_exchange", &reference, actor, target_amount, &to_asset.symbol);

        Ok(CryptoReceipt {
            reference,
            debited_account_id: source.id,
            debited_amount: amount,
            credited_account_id: target.id,
            credited_amount: target_amount,
            usd_value: round_to(usd_value, FIAT_SCALE),
        })
    }
}
