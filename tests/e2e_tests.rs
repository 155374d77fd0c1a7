//! End-to-end integration tests
//!
//! These tests validate the complete replay pipeline using CSV fixtures. Each
//! fixture directory under tests/fixtures/ holds a script (input.csv) and the
//! accounts CSV the replay must print (expected.csv). Fixtures cover:
//! - The intra-bank transfer scenario
//! - Bill payment, including foreign and repeated payments
//! - International transfers with settlement and refunds
//! - Crypto purchase, exchange and admin-approved crypto transfers
//! - Transfer request and loan approval workflows
//! - Malformed rows and rejected operations
//!
//! Each fixture is replayed twice: once with the sync strategy and once with the async one.

#[cfg(test)]
mod tests {
    use bank_ledger::cli::StrategyType;
    use bank_ledger::config::LedgerConfig;
    use bank_ledger::strategy::{create_strategy, BatchConfig, ReplaySummary};
    use rstest::rstest;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    fn replay(
        input: &Path,
        strategy_type: StrategyType,
        batch: Option<BatchConfig>) -> (ReplaySummary,
        String,
    ) {
        let strategy = create_strategy(strategy_type, LedgerConfig::default(), batch);
        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");

        let summary = strategy
            .process(input, &mut temp_output)
            .unwrap_or_else(|e| panic!("Failed to replay script: {}", e));
        temp_output.flush().expect("Failed to flush temp file");

        let output = fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e));
        (summary, output)
    }

    /// Replay tests/fixtures/{fixture_name}/input.csv and compare with expected.csv
    fn run_test_fixture(fixture_name: &str, strategy_type: StrategyType) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);

        assert!(Path::new(&input_path).exists(), "Input file not found: {}", input_path);
        assert!(Path::new(&expected_path).exists(), "Expected file not found: {}", expected_path);

        let (_, actual_output) = replay(Path::new(&input_path), strategy_type.clone(), None);
        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, strategy_type, actual_output, expected_output
        );
    }

    #[rstest]
    #[case("happy_path")]
    #[case("bill_payment")]
    #[case("international_settlement")]
    #[case("crypto_flow")]
    #[case("approval_workflows")]
    #[case("malformed_data")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        run_test_fixture(fixture, strategy);
    }

    #[rstest]
    fn test_malformed_rows_are_counted(
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        let (summary, _) =
            replay(Path::new("tests/fixtures/malformed_data/input.csv"), strategy, None);

        assert_eq!(
            summary,
            ReplaySummary {
                applied: 5,
                rejected: 9,
                skipped: 3,
            }
        );
    }

    #[test]
    fn test_strategies_agree_with_small_batches() {
        let input = Path::new("tests/fixtures/approval_workflows/input.csv");

        let (sync_summary, sync_output) = replay(input, StrategyType::Sync, None);
        let (async_summary, async_output) =
            replay(input, StrategyType::Async, Some(BatchConfig::new(1, 2)));

        assert_eq!(sync_summary, async_summary);
        assert_eq!(sync_output, async_output);
    }

    #[test]
    fn test_missing_script_is_fatal() {
        for strategy_type in [StrategyType::Sync, StrategyType::Async] {
            let strategy = create_strategy(strategy_type, LedgerConfig::default(), None);
            let mut output = Vec::new();
            assert!(strategy.process(Path::new("tests/fixtures/nope.csv"), &mut output).is_err());
        }
    }
}
