//! Synchronous script reader with iterator interface
//!
//! Provides a streaming iterator over script commands from a CSV file.
//! Row layout and command conversion live in `csv_format`.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding `Result<Command, LedgerError>`
//! for each CSV row:
//!
//! ```no_run
//! use bank_ledger::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("script.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(command) => println!("Replaying: {}", command.name()),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row errors are yielded as `LedgerError::Parse` carrying the line number
//!
//! The reader never loads the whole script: rows are deserialized one at a time.

use crate::io::csv_format::{convert_script_record, ScriptRecord};
use crate::types::{Command, LedgerError};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous script reader
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    /// Open a script file for streaming replay
    ///
    /// Reader settings:
    /// - Whitespace trimmed around every field
    /// - Allow flexible field counts (trailing columns may be omitted)
    /// - 8KB read buffer
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if file opened successfully
    /// * `Err(LedgerError::Io)` if file could not be opened
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| LedgerError::Io {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<Command, LedgerError>;

    /// Get the next command from the script
    ///
    /// # Returns
    ///
    /// * `Some(Ok(Command))` - Successfully parsed row
    /// * `Some(Err(LedgerError::Parse))` - Parse or conversion error with line number
    /// * `None` - End of file reached
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<ScriptRecord>();
        let next = deserializer.next()?;
        self.line_num += 1;

        let line = self.line_num;
        Some(match next {
            Ok(record) => convert_script_record(record).map_err(|e| LedgerError::Parse {
                line: Some(line),
                message: e.to_string(),
            }),
            Err(e) => Err(LedgerError::from(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "op,user,from,to,amount,detail\n";

    /// Write `content` to a temp file and keep it alive for the test
    fn create_temp_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(HEADER.as_bytes()).expect("Failed to write header");
        file.write_all(rows.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_sync_reader_fails_on_missing_file() {
        let result = SyncReader::new(Path::new("nonexistent.csv"));
        match result {
            Err(LedgerError::Io { message }) => assert!(message.contains("Failed to open file")),
            other => panic!("expected I/O error, got {:?}", other),
        }
    }

    #[test]
    fn test_sync_reader_iterates_commands_in_order() {
        let file = create_temp_csv(
            "register,alice,,,,secret-pass\n\
             open,alice,,A1,100.00,USD\n\
             settle,,,,,\n",
        );

        let commands: Vec<_> = SyncReader::new(file.path())
            .unwrap()
            .map(|result| result.unwrap().name())
            .collect();

        assert_eq!(commands, vec!["register", "open", "settle"]);
    }

    #[test]
    fn test_sync_reader_accepts_short_rows_and_whitespace() {
        let file = create_temp_csv("  deposit , alice ,, A1 , 5 \nsettle\n");

        let commands: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[0].as_ref().unwrap(),
            &Command::Deposit {
                username: "alice".to_string(),
                account_number: "A1".to_string(),
                amount: "5".to_string(),
                description: String::new(),
            }
        );
        assert_eq!(commands[1].as_ref().unwrap(), &Command::Settle);
    }

    #[test]
    fn test_sync_reader_reports_line_and_continues() {
        let file = create_temp_csv(
            "register,alice,,,,secret-pass\n\
             teleport,alice,,,,\n\
             register,bob,,,,secret-pass\n",
        );

        let records: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        assert!(records[2].is_ok());
        match &records[1] {
            Err(LedgerError::Parse { line, message }) => {
                assert_eq!(*line, Some(3));
                assert!(message.contains("teleport"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_sync_reader_handles_empty_file_after_header() {
        let file = create_temp_csv("");
        assert_eq!(SyncReader::new(file.path()).unwrap().count(), 0);
    }
}
