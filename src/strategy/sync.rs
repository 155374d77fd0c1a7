//! Synchronous processing strategy
//!
//! Single-threaded replay: the `SyncReader` streams commands one row at a time
//! and each is executed before the next is read. International transfers only
//! settle when the script asks for it with a `settle` row.

use crate::config::LedgerConfig;
use crate::core::LedgerEngine;
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{apply_command, ProcessingStrategy, ReplaySummary};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use bank_ledger::config::LedgerConfig;
/// use bank_ledger::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
///
/// let strategy = SyncProcessingStrategy::new(LedgerConfig::default());
/// let mut output = std::io::stdout();
/// strategy.process(Path::new("script.csv"), &mut output).expect("replay failed");
/// ```
#[derive(Debug, Clone)]
pub struct SyncProcessingStrategy {
    config: LedgerConfig,
}

impl SyncProcessingStrategy {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ReplaySummary, LedgerError> {
        let engine = LedgerEngine::new(self.config.clone());
        let reader = SyncReader::new(input_path)?;
        let mut summary = ReplaySummary::default();

        for result in reader {
            match result {
                Ok(command) => {
                    // Rejections are logged and counted by apply_command
                    let _ = apply_command(&engine, &command, &mut summary);
                }
                Err(error) => {
                    summary.skipped += 1;
                    tracing::warn!(%error, "skipping script row");
                }
            }
        }

        write_accounts_csv(&engine.accounts_snapshot(), output)?;
        tracing::info!(
            applied = summary.applied,
            rejected = summary.rejected,
            skipped = summary.skipped,
            "sync replay finished"
        );
        Ok(summary)
    }
}
