//! Processing strategy module for script replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing both script parsing and engine execution. This allows different
//! implementations (synchronous, asynchronous batch) to be selected at runtime.

use crate::cli::StrategyType;
use crate::config::LedgerConfig;
use crate::core::LedgerEngine;
use crate::types::{Command, LedgerError};
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Outcome counts of one replay
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Commands the engine accepted
    pub applied: usize,
    /// Commands the engine rejected (including caught panics)
    pub rejected: usize,
    /// Rows that never became a command because they failed to parse
    pub skipped: usize,
}

/// Processing strategy trait for complete replay pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the script at `input_path` against a fresh ledger and write the
    /// final accounts to `output`
    ///
    /// Rejected commands and malformed rows are logged and counted but never
    /// stop the replay.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened
    /// - A fatal I/O error occurs during reading or writing
    /// - The async runtime cannot be built
    fn process(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ReplaySummary, LedgerError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `ledger` - Engine policy shared by both strategies
/// * `batch` - Optional configuration for async batch processing (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    ledger: LedgerConfig,
    batch: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(ledger)),
        StrategyType::Async => {
            Box::new(AsyncProcessingStrategy::new(ledger, batch.unwrap_or_default()))
        }
    }
}

/// Run one command at the replay boundary
///
/// A panic inside the operation is caught and reported as
/// `LedgerError::Internal` so the rest of the script still runs.
pub(crate) fn apply_command(
    engine: &LedgerEngine,
    command: &Command,
    summary: &mut ReplaySummary,
) -> Result<String, LedgerError> {
    let outcome = catch_unwind(AssertUnwindSafe(|| engine.execute(command)));
    let result = outcome.unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "operation panicked".to_string());
        tracing::error!(op = command.name(), %message, "panic caught at replay boundary");
        Err(LedgerError::internal(message))
    });

    match &result {
        Ok(outcome) => {
            summary.applied += 1;
            tracing::info!(op = command.name(), %outcome, "command applied");
        }
        Err(error) => {
            summary.rejected += 1;
            tracing::warn!(op = command.name(), kind = ?error.kind(), %error, "command rejected");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_command_counts_outcomes() {
        let engine = LedgerEngine::new(LedgerConfig::default());
        let mut summary = ReplaySummary::default();

        let register = Command::Register {
            username: "alice".to_string(),
            password: "secret-pass".to_string(),
            admin: false,
        };
        assert!(apply_command(&engine, &register, &mut summary).is_ok());
        assert!(matches!(
            apply_command(&engine, &register, &mut summary),
            Err(LedgerError::Duplicate { .. })
        ));

        assert_eq!(
            summary,
            ReplaySummary {
                applied: 1,
                rejected: 1,
                skipped: 0,
            }
        );
    }

    #[test]
    fn test_create_strategy_returns_both_kinds() {
        let sync = create_strategy(StrategyType::Sync, LedgerConfig::default(), None);
        let async_strategy = create_strategy(
            StrategyType::Async,
            LedgerConfig::default(),
            Some(BatchConfig::new(10, 2)),
        );

        let mut out = Vec::new();
        assert!(sync.process(Path::new("missing.csv"), &mut out).is_err());
        assert!(async_strategy.process(Path::new("missing.csv"), &mut out).is_err());
    }
}
