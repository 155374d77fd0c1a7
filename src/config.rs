//! Ledger configuration
//!
//! [`LedgerConfig`] carries the business-policy knobs of the engine. Values come
//! from CLI flags; anything invalid is reported with a warning and replaced by
//! its default rather than aborting the run.

use rust_decimal::Decimal;
use std::time::Duration;

/// Policy settings shared by every engine operation
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerConfig {
    /// Fraction of the amount charged on international transfers (0.01 = 1%)
    pub international_fee_rate: Decimal,

    /// Delay before the settlement pass may complete an international transfer
    pub settlement_delay: Duration,

    /// Days added to the creation time for the advertised delivery estimate
    pub delivery_window_days: i64,

    /// Reject crypto purchases below the asset's declared minimum
    pub enforce_crypto_minimums: bool,

    /// Per-connection queue size of the notification hub
    pub notification_buffer: usize,

    /// How often the settlement worker wakes up
    pub settlement_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            international_fee_rate: Decimal::new(1, 2),
            settlement_delay: Duration::from_secs(5),
            delivery_window_days: 2,
            enforce_crypto_minimums: false,
            notification_buffer: 64,
            settlement_interval: Duration::from_secs(1),
        }
    }
}

impl LedgerConfig {
    /// Replace the international fee rate, keeping the default if out of range
    pub fn with_fee_rate(mut self, rate: Decimal) -> Self {
        if rate < Decimal::ZERO || rate >= Decimal::ONE {
            tracing::warn!(
                rate = %rate,
                default = %self.international_fee_rate,
                "invalid international fee rate, using default"
            );
        } else {
            self.international_fee_rate = rate;
        }
        self
    }

    pub fn with_settlement_delay(mut self, delay: Duration) -> Self {
        self.settlement_delay = delay;
        self
    }

    pub fn with_crypto_minimums(mut self, enforce: bool) -> Self {
        self.enforce_crypto_minimums = enforce;
        self
    }

    /// Replace the notification queue size, keeping the default if zero
    pub fn with_notification_buffer(mut self, buffer: usize) -> Self {
        if buffer == 0 {
            tracing::warn!(
                default = self.notification_buffer,
                "invalid notification buffer (0), using default"
            );
        } else {
            self.notification_buffer = buffer;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.international_fee_rate, Decimal::new(1, 2));
        assert_eq!(config.delivery_window_days, 2);
        assert!(!config.enforce_crypto_minimums);
    }

    #[rstest]
    #[case::valid(Decimal::new(25, 3), Decimal::new(25, 3))]
    #[case::zero_is_allowed(Decimal::ZERO, Decimal::ZERO)]
    #[case::negative_falls_back(Decimal::new(-1, 2), Decimal::new(1, 2))]
    #[case::hundred_percent_falls_back(Decimal::ONE, Decimal::new(1, 2))]
    fn test_fee_rate_fallback(#[case] rate: Decimal, #[case] expected: Decimal) {
        let config = LedgerConfig::default().with_fee_rate(rate);
        assert_eq!(config.international_fee_rate, expected);
    }

    #[test]
    fn test_zero_notification_buffer_falls_back() {
        let config = LedgerConfig::default().with_notification_buffer(0);
        assert_eq!(config.notification_buffer, 64);
    }
}
