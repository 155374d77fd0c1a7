//! Settlement worker
//!
//! Periodically completes international transfers whose settlement time has
//! passed. The state lives in the store, so a worker started after a restart
//! picks up exactly where the previous one stopped.

use crate::core::engine::LedgerEngine;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct SettlementWorker;

impl SettlementWorker {
    /// Spawn the worker on the current tokio runtime
    ///
    /// # Arguments
    ///
    /// * `engine` - Shared ledger engine
    /// * `interval` - Time between settlement passes
    /// * `shutdown` - Stops the worker when cancelled
    ///
    /// # Returns
    ///
    /// Handle resolving to the total number of transfers settled
    pub fn spawn(
        engine: Arc<LedgerEngine>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<usize> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut total = 0;

            tracing::debug!(interval_ms = interval.as_millis() as u64, "settlement worker started");
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let settled = engine.settle_due(Utc::now());
                        if !settled.is_empty() {
                            tracing::info!(count = settled.len(), "settlement pass completed");
                        }
                        total += settled.len();
                    }
                }
            }
            tracing::debug!(total, "settlement worker stopped");
            total
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::types::*;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_worker_settles_due_transfers_and_stops() {
        let config = LedgerConfig::default().with_settlement_delay(Duration::ZERO);
        let engine = Arc::new(LedgerEngine::new(config));
        let alice = engine
            .register(NewUser::with_credentials("alice", "secret-pass"))
            .unwrap();
        let account = engine
            .open_account(alice.id, OpenAccount::checking("USD", Decimal::new(100_000, 2)))
            .unwrap();
        let external = engine
            .add_external_account(
                alice.id,
                ExternalAccountDetails {
                    bank_name: "BNP Paribas".to_string(),
                    account_holder: "Alice".to_string(),
                    account_number: "FR7630006000011234567890189".to_string(),
                    swift_code: "BNPAFRPP".to_string(),
                    country: "FR".to_string(),
                    currency: "EUR".to_string(),
                },
            )
            .unwrap();
        let transfer = engine
            .send_international(
                alice.id,
                InternationalRequest {
                    from_account_id: account.id,
                    external_account_id: external.id,
                    amount: "50".to_string(),
                    purpose: "tuition".to_string(),
                },
            )
            .unwrap();

        let shutdown = CancellationToken::new();
        let handle = SettlementWorker::spawn(
            Arc::clone(&engine),
            Duration::from_millis(10),
            shutdown.clone(),
        );

        for _ in 0..100 {
            let current = engine.store().international_transfer(transfer.id).unwrap();
            if current.status == InternationalTransferStatus::Completed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown.cancel();

        assert_eq!(handle.await.unwrap(), 1);
        assert_eq!(
            engine.store().international_transfer(transfer.id).unwrap().status,
            InternationalTransferStatus::Completed
        );
    }
}
