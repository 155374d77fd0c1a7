//! Asynchronous batch processing strategy
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, worker_threads)
//!     ├── AsyncReader (batch script reading)
//!     ├── LedgerEngine (shared behind Arc, per-account locking)
//!     ├── SettlementWorker (settles due international transfers)
//!     └── notification subscriber (logs every broadcast)
//! ```
//!
//! Script rows depend on each other (a transfer needs both accounts opened),
//! so commands are executed in file order. The runtime's other workers run the
//! settlement pass and the notification subscriber alongside the replay.

use crate::config::LedgerConfig;
use crate::core::{LedgerEngine, SettlementWorker};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_accounts_csv;
use crate::strategy::{apply_command, ProcessingStrategy, ReplaySummary};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Number of script rows read per batch
    pub batch_size: usize,
    /// Worker threads of the tokio runtime
    pub worker_threads: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            worker_threads: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, replacing zero values with the defaults
    pub fn new(batch_size: usize, worker_threads: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(default = default.batch_size, "invalid batch_size (0), using default");
            default.batch_size
        } else {
            batch_size
        };

        let worker_threads = if worker_threads == 0 {
            tracing::warn!(
                default = default.worker_threads,
                "invalid worker_threads (0), using default"
            );
            default.worker_threads
        } else {
            worker_threads
        };

        Self {
            batch_size,
            worker_threads,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    ledger: LedgerConfig,
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(ledger: LedgerConfig, config: BatchConfig) -> Self {
        Self { ledger, config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay the script on a multi-threaded tokio runtime
    ///
    /// 1. Starts the settlement worker and a notification subscriber
    /// 2. Reads the script in batches and executes each command in order
    /// 3. Stops the background tasks and waits for them
    /// 4. Writes the final accounts
    fn process(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ReplaySummary, LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_threads)
            .enable_all()
            .build()
            .map_err(|e| LedgerError::internal(format!("Failed to create tokio runtime: {}", e)))?;

        runtime.block_on(async {
            let file = tokio::fs::File::open(input_path).await.map_err(|e| LedgerError::Io {
                message: format!("Failed to open file '{}': {}", input_path.display(), e),
            })?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let engine = Arc::new(LedgerEngine::new(self.ledger.clone()));
            let shutdown = CancellationToken::new();
            let settlement = SettlementWorker::spawn(
                Arc::clone(&engine),
                self.ledger.settlement_interval,
                shutdown.clone(),
            );

            let connection = engine.notifier().connect();
            let connection_id = connection.id;
            let mut receiver = connection.receiver;
            let subscriber = tokio::spawn(async move {
                let mut received = 0usize;
                while let Some(message) = receiver.recv().await {
                    received += 1;
                    tracing::debug!(%message, "notification");
                }
                received
            });

            let mut summary = ReplaySummary::default();
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }
                for command in &batch {
                    // Rejections are logged and counted by apply_command
                    let _ = apply_command(&engine, command, &mut summary);
                }
                tokio::task::yield_now().await;
            }
            summary.skipped = reader.skipped();

            shutdown.cancel();
            let settled = settlement
                .await
                .map_err(|e| LedgerError::internal(format!("settlement worker failed: {}", e)))?;
            engine.notifier().disconnect(connection_id);
            let notifications = subscriber
                .await
                .map_err(|e| {
                    LedgerError::internal(format!("notification subscriber failed: {}", e))
                })?;

            write_accounts_csv(&engine.accounts_snapshot(), output)?;
            tracing::info!(
                applied = summary.applied,
                rejected = summary.rejected,
                skipped = summary.skipped,
                settled,
                notifications,
                "async replay finished"
            );
            Ok(summary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[rstest]
    #[case::valid(2000, 8, 2000, 8)]
    #[case::zero_batch(0, 8, 1000, 8)]
    #[case::zero_threads(10, 0, 10, num_cpus::get())]
    fn test_batch_config_fallback(
        #[case] batch_size: usize,
        #[case] threads: usize,
        #[case] expected_batch: usize,
        #[case] expected_threads: usize,
    ) {
        let config = BatchConfig::new(batch_size, threads);
        assert_eq!(config.batch_size, expected_batch);
        assert_eq!(config.worker_threads, expected_threads);
    }

    #[test]
    fn test_async_strategy_keeps_order_across_batches() {
        let file = create_temp_csv(
            "op,user,from,to,amount,detail\n\
             register,alice,,,,secret-pass\n\
             register,bob,,,,secret-pass\n\
             open,alice,,A1,100.00,USD\n\
             open,bob,,B1,10.00,USD\n\
             transfer,alice,A1,B1,30.00,\n\
             transfer,bob,B1,A1,5.00,\n\
             transfer,alice,A1,B1,15.00,\n",
        );

        let strategy =
            AsyncProcessingStrategy::new(LedgerConfig::default(), BatchConfig::new(2, 2));
        let mut output = Vec::new();
        let summary = strategy.process(file.path(), &mut output).unwrap();

        assert_eq!(summary.applied, 7);
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("A1,1,checking,USD,60.00"), "got: {}", output);
        assert!(output.contains("B1,2,checking,USD,50.00"), "got: {}", output);
    }

    #[test]
    fn test_async_strategy_counts_skipped_rows() {
        let file = create_temp_csv(
            "op,user,from,to,amount,detail\n\
             register,alice,,,,secret-pass\n\
             pay-bill,alice,A1,x,,\n",
        );

        let strategy =
            AsyncProcessingStrategy::new(LedgerConfig::default(), BatchConfig::default());
        let mut output = Vec::new();
        let summary = strategy.process(file.path(), &mut output).unwrap();

        assert_eq!(summary.applied, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(String::from_utf8(output).unwrap(), "account,owner,type,currency,balance\n");
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let strategy =
            AsyncProcessingStrategy::new(LedgerConfig::default(), BatchConfig::default());
        let mut output = Vec::new();
        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);
        assert!(matches!(result, Err(LedgerError::Io { .. })));
    }
}
