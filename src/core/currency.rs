//! Currency table and conversion
//!
//! Static reference data: fiat codes with their rate against USD (units of the
//! currency per one USD) and display symbol, plus the default crypto catalog.
//! Everything here is a pure lookup; nothing mutates.

use crate::core::money::round_to;
use crate::types::{Cryptocurrency, LedgerError, FIAT_SCALE};
use rust_decimal::Decimal;
use serde::Serialize;

/// Decimal places kept on stored exchange rates
pub const RATE_SCALE: u32 = 6;

struct FiatCurrency {
    code: &'static str,
    symbol: &'static str,
    /// Units per USD as (mantissa, scale)
    per_usd: (i64, u32),
}

const FIAT_TABLE: &[FiatCurrency] = &[
    FiatCurrency { code: "USD", symbol: "$", per_usd: (1, 0) },
    FiatCurrency { code: "EUR", symbol: "€", per_usd: (92, 2) },
    FiatCurrency { code: "GBP", symbol: "£", per_usd: (79, 2) },
    FiatCurrency { code: "JPY", symbol: "¥", per_usd: (14950, 2) },
    FiatCurrency { code: "CAD", symbol: "C$", per_usd: (136, 2) },
    FiatCurrency { code: "AUD", symbol: "A$", per_usd: (153, 2) },
    FiatCurrency { code: "CHF", symbol: "Fr", per_usd: (88, 2) },
    FiatCurrency { code: "CNY", symbol: "¥", per_usd: (724, 2) },
    FiatCurrency { code: "INR", symbol: "₹", per_usd: (8312, 2) },
    FiatCurrency { code: "MXN", symbol: "$", per_usd: (1705, 2) },
    FiatCurrency { code: "SGD", symbol: "S$", per_usd: (134, 2) },
];

fn lookup(code: &str) -> Result<&'static FiatCurrency, LedgerError> {
    FIAT_TABLE
        .iter()
        .find(|c| c.code.eq_ignore_ascii_case(code.trim()))
        .ok_or_else(|| LedgerError::unknown_currency(code))
}

/// Normalized (upper-case) code, if the currency is supported
pub fn normalize(code: &str) -> Result<&'static str, LedgerError> {
    lookup(code).map(|c| c.code)
}

pub fn is_supported(code: &str) -> bool {
    lookup(code).is_ok()
}

/// Units of `code` per one USD
pub fn rate(code: &str) -> Result<Decimal, LedgerError> {
    let (mantissa, scale) = lookup(code)?.per_usd;
    Ok(Decimal::new(mantissa, scale))
}

pub fn symbol(code: &str) -> Result<&'static str, LedgerError> {
    lookup(code).map(|c| c.symbol)
}

/// Rate converting one unit of `from` into `to`: `rate(to) / rate(from)`
pub fn exchange_rate(from: &str, to: &str) -> Result<Decimal, LedgerError> {
    let from_rate = rate(from)?;
    let to_rate = rate(to)?;
    Ok(round_to(to_rate / from_rate, RATE_SCALE))
}

/// `InvalidAmount` for results that do not fit in a `Decimal`
fn priced(value: Option<Decimal>, amount: Decimal) -> Result<Decimal, LedgerError> {
    value.ok_or_else(|| LedgerError::invalid_amount(amount))
}

/// Convert `amount` of `from` into `to`, rounded to cents
pub fn convert(amount: Decimal, from: &str, to: &str) -> Result<Decimal, LedgerError> {
    let converted = priced(amount.checked_mul(exchange_rate(from, to)?), amount)?;
    Ok(round_to(converted, FIAT_SCALE))
}

/// USD value of a fiat amount
pub fn to_usd(amount: Decimal, from: &str) -> Result<Decimal, LedgerError> {
    priced(amount.checked_div(rate(from)?), amount)
}

/// Priced international transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferQuote {
    pub exchange_rate: Decimal,
    pub fee: Decimal,
    /// What the beneficiary receives, in the target currency
    pub converted_amount: Decimal,
    /// What leaves the source account: amount + fee
    pub total_debit: Decimal,
}

/// Price an international transfer of `amount` from `from` to `to`
///
/// `fee = amount * fee_rate`, `total_debit = amount + fee`, both in the source
/// currency and rounded to cents. An amount too large to price is rejected as
/// `InvalidAmount`.
pub fn quote_international(
    amount: Decimal,
    from: &str,
    to: &str,
    fee_rate: Decimal,
) -> Result<TransferQuote, LedgerError> {
    let exchange_rate = exchange_rate(from, to)?;
    let fee = round_to(priced(amount.checked_mul(fee_rate), amount)?, FIAT_SCALE);
    let converted_amount = round_to(priced(amount.checked_mul(exchange_rate), amount)?, FIAT_SCALE);
    let total_debit = round_to(priced(amount.checked_add(fee), amount)?, FIAT_SCALE);

    Ok(TransferQuote {
        exchange_rate,
        fee,
        converted_amount,
        total_debit,
    })
}

/// Default crypto catalog seeded into a fresh store
pub fn default_cryptocurrencies() -> Vec<Cryptocurrency> {
    let asset =
        |symbol: &str, name: &str, usd: Decimal, eur: Decimal, min: Decimal| Cryptocurrency {
        symbol: symbol.to_string(),
        name: name.to_string(),
        usd_rate: usd,
        eur_rate: eur,
        min_purchase: min,
    };

    vec![
        asset(
            "BTC",
            "Bitcoin",
            Decimal::new(4_325_000, 2),
            Decimal::new(3_979_000, 2),
            Decimal::new(1, 4),
        ),
        asset(
            "ETH",
            "Ethereum",
            Decimal::new(228_050, 2),
            Decimal::new(209_806, 2),
            Decimal::new(1, 3),
        ),
        asset("SOL", "Solana", Decimal::new(9_840, 2), Decimal::new(9_053, 2), Decimal::new(1, 2)),
        asset("ADA", "Cardano", Decimal::new(52, 2), Decimal::new(48, 2), Decimal::ONE),
        asset("DOGE", "Dogecoin", Decimal::new(85, 3), Decimal::new(78, 3), Decimal::TEN),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("USD", "1")]
    #[case("eur", "0.92")]
    #[case(" JPY ", "149.50")]
    fn test_rate_lookup(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(rate(code).unwrap().to_string(), expected);
    }

    #[test]
    fn test_unknown_currency() {
        assert_eq!(rate("XYZ"), Err(LedgerError::unknown_currency("XYZ")));
        assert!(!is_supported("XYZ"));
        assert_eq!(symbol("GBP").unwrap(), "£");
    }

    #[test]
    fn test_exchange_rate_is_target_over_source() {
        assert_eq!(exchange_rate("USD", "EUR").unwrap(), Decimal::new(920_000, 6));
        assert_eq!(exchange_rate("EUR", "EUR").unwrap(), Decimal::new(1_000_000, 6));
        // 0.79 / 0.92 = 0.858695652...
        assert_eq!(exchange_rate("EUR", "GBP").unwrap(), Decimal::new(858_696, 6));
    }

    #[test]
    fn test_convert_rounds_to_cents() {
        assert_eq!(
            convert(Decimal::new(10000, 2), "USD", "JPY").unwrap(),
            Decimal::new(1_495_000, 2)
        );
    }

    #[test]
    fn test_quote_international() {
        let quote = quote_international(
            Decimal::new(100_000, 2),
            "USD",
            "EUR",
            Decimal::new(1, 2),
        ).unwrap();
        assert_eq!(quote.fee, Decimal::new(1000, 2));
        assert_eq!(quote.total_debit, Decimal::new(101_000, 2));
        assert_eq!(quote.converted_amount, Decimal::new(92_000, 2));
        assert_eq!(quote.exchange_rate, Decimal::new(920_000, 6));
    }

    #[test]
    fn test_unpriceable_amount_is_rejected() {
        assert!(matches!(
            quote_international(Decimal::MAX, "USD", "JPY", Decimal::new(1, 2)),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(matches!(
            to_usd(Decimal::MAX, "EUR"),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(matches!(
            convert(Decimal::MAX, "USD", "INR"),
            Err(LedgerError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_default_catalog_has_positive_prices() {
        let catalog = default_cryptocurrencies();
        assert_eq!(catalog.len(), 5);
        assert!(catalog
            .iter()
            .all(|c| c.usd_rate > Decimal::ZERO && c.min_purchase > Decimal::ZERO));
    }
}
