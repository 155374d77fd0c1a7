//! Amount parsing and rounding
//!
//! Amounts arrive as user-entered strings. They must parse as a decimal and be
//! strictly positive once rounded to the scale of the account they move.

use crate::types::LedgerError;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Round half away from zero to `scale` decimal places
pub fn round_to(amount: Decimal, scale: u32) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

/// Parse a user-entered amount into a positive decimal at `scale` places
///
/// # Errors
///
/// `InvalidAmount` when the text is not a number, or when the value is zero or
/// negative after rounding.
pub fn parse_amount(raw: &str, scale: u32) -> Result<Decimal, LedgerError> {
    let trimmed = raw.trim();
    let value = Decimal::from_str(trimmed).map_err(|_| LedgerError::invalid_amount(raw))?;
    let value = round_to(value, scale);
    if value <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount(raw));
    }
    Ok(value)
}
