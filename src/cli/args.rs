use crate::config::LedgerConfig;
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

/// Replay a CSV script of banking operations against a fresh ledger
#[derive(Parser, Debug)]
#[command(name = "bank-ledger")]
#[command(
    about = "Replay a CSV script of banking operations and print the resulting accounts",
    long_about = None
)]
pub struct CliArgs {
    /// Script CSV with columns op,user,from,to,amount,detail
    #[arg(value_name = "SCRIPT", help = "Path to the script CSV file")]
    pub script: PathBuf,

    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Replay strategy: 'sync' for synchronous or 'async' for asynchronous"
    )]
    pub strategy: StrategyType,

    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of script rows per batch (async mode only, default: 1000)"
    )]
    pub batch_size: Option<usize>,

    #[arg(
        long = "worker-threads",
        value_name = "COUNT",
        help = "Runtime worker threads (async mode only, default: CPU cores)"
    )]
    pub worker_threads: Option<usize>,

    #[arg(
        long = "fee-rate",
        value_name = "RATE",
        help = "International transfer fee as a fraction of the amount (default: 0.01)"
    )]
    pub fee_rate: Option<Decimal>,

    #[arg(
        long = "settlement-delay-secs",
        value_name = "SECONDS",
        help = "Seconds before an international transfer may settle (default: 5)"
    )]
    pub settlement_delay_secs: Option<u64>,

    #[arg(
        long = "enforce-crypto-minimums",
        help = "Reject crypto purchases below the asset's minimum purchase amount"
    )]
    pub enforce_crypto_minimums: bool,

    #[arg(
        long = "log-format",
        value_name = "FORMAT",
        default_value = "text",
        help = "Log output format on stderr"
    )]
    pub log_format: LogFormat,
}

/// Available replay strategies
#[derive(Clone, Debug, PartialEq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl CliArgs {
    /// Build the engine policy from the flags, defaults for anything omitted
    pub fn to_ledger_config(&self) -> LedgerConfig {
        let mut config = LedgerConfig::default().with_crypto_minimums(self.enforce_crypto_minimums);
        if let Some(rate) = self.fee_rate {
            config = config.with_fee_rate(rate);
        }
        if let Some(secs) = self.settlement_delay_secs {
            config = config.with_settlement_delay(Duration::from_secs(secs));
        }
        config
    }

    /// Create a BatchConfig from CLI arguments
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_none() && self.worker_threads.is_none() {
            return BatchConfig::default();
        }
        let default = BatchConfig::default();
        BatchConfig::new(
            self.batch_size.unwrap_or(default.batch_size),
            self.worker_threads.unwrap_or(default.worker_threads),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(&["program", "script.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "script.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "script.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[rstest]
    #[case::all_defaults(&["program", "script.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(
        &["program", "--batch-size", "2000", "script.csv"],
        2000,
        num_cpus::get()
    )]
    #[case::custom_threads(&["program", "--worker-threads", "8", "script.csv"], 1000, 8)]
    #[case::zero_batch_falls_back(
        &["program", "--batch-size", "0", "script.csv"],
        1000,
        num_cpus::get()
    )]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_threads: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_batch_config();
        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.worker_threads, expected_threads);
    }

    #[test]
    fn test_ledger_config_defaults() {
        let parsed = CliArgs::try_parse_from(["program", "script.csv"]).unwrap();
        assert_eq!(parsed.to_ledger_config(), LedgerConfig::default());
        assert_eq!(parsed.log_format, LogFormat::Text);
    }

    #[test]
    fn test_ledger_config_overrides() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--fee-rate",
            "0.025",
            "--settlement-delay-secs",
            "0",
            "--enforce-crypto-minimums",
            "--log-format",
            "json",
            "script.csv",
        ])
        .unwrap();

        let config = parsed.to_ledger_config();
        assert_eq!(config.international_fee_rate, Decimal::new(25, 3));
        assert_eq!(config.settlement_delay, Duration::ZERO);
        assert!(config.enforce_crypto_minimums);
        assert_eq!(parsed.log_format, LogFormat::Json);
    }

    #[test]
    fn test_out_of_range_fee_rate_falls_back() {
        let parsed =
            CliArgs::try_parse_from(["program", "--fee-rate", "1.5", "script.csv"]).unwrap();
        assert_eq!(parsed.to_ledger_config().international_fee_rate, Decimal::new(1, 2));
    }

    #[rstest]
    #[case::missing_script(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "script.csv"])]
    #[case::invalid_fee_rate(&["program", "--fee-rate", "lots", "script.csv"])]
    #[case::invalid_log_format(&["program", "--log-format", "xml", "script.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
