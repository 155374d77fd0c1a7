//! Bank ledger CLI
//!
//! Replays a CSV script of banking operations against a fresh in-memory ledger
//! and prints the resulting accounts as CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- script.csv > accounts.csv
//! cargo run -- --strategy sync script.csv > accounts.csv
//! cargo run -- --strategy async --batch-size 500 --worker-threads 4 script.csv > accounts.csv
//! RUST_LOG=debug cargo run -- --log-format json script.csv > accounts.csv
//! ```
//!
//! Logs go to stderr so stdout stays clean CSV.
//!
//! # Exit Codes
//!
//! - 0: Success (rejected commands are logged, not fatal)
//! - 1: Fatal error (missing script, unreadable file, output failure)

use anyhow::Context;
use bank_ledger::cli::{self, LogFormat, StrategyType};
use bank_ledger::strategy;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> anyhow::Result<()> {
    let args = cli::parse_args();
    init_tracing(args.log_format);

    let batch = matches!(args.strategy, StrategyType::Async).then(|| args.to_batch_config());
    let strategy = strategy::create_strategy(args.strategy.clone(), args.to_ledger_config(), batch);

    let mut output = std::io::stdout().lock();
    let summary = strategy
        .process(&args.script, &mut output)
        .with_context(|| format!("failed to replay '{}'", args.script.display()))?;

    tracing::debug!(?summary, "done");
    Ok(())
}
