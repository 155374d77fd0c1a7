//! Asynchronous script reader with batch interface
//!
//! # Architecture
//!
//! ```text
//! tokio File → compat → csv-async → AsyncReader → batches of Commands
//!                                        ↓
//!                                 csv_format module
//!                       (ScriptRecord, convert_script_record)
//! ```

use crate::io::csv_format::{convert_script_record, ScriptRecord};
use crate::types::{Command, LedgerError};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous script reader
///
/// Malformed rows are logged with their line number and skipped; the batch
/// only ever contains commands that parsed.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: u64,
    skipped: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
            skipped: 0,
        }
    }

    /// Read up to `batch_size` commands
    ///
    /// Returns an empty vector once the end of the script is reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<Command> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<ScriptRecord>();

        while batch.len() < batch_size {
            let Some(next) = records.next().await else {
                break;
            };
            self.line_num += 1;

            match next.map_err(|e| e.to_string()).and_then(|record| {
                convert_script_record(record).map_err(|e| e.to_string())
            }) {
                Ok(command) => batch.push(command),
                Err(message) => {
                    self.skipped += 1;
                    let error = LedgerError::Parse {
                        line: Some(self.line_num),
                        message,
                    };
                    tracing::warn!(%error, "skipping script row");
                }
            }
        }

        batch
    }

    /// Number of rows skipped so far because they failed to parse
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;

    #[tokio::test]
    async fn test_async_reader_multiple_batches() {
        let script = "op,user,from,to,amount,detail\n\
            register,alice,,,,secret-pass\n\
            open,alice,,A1,100,USD\n\
            deposit,alice,,A1,5,\n\
            settle,,,,,\n\
            deposit,alice,,A1,7,\n";
        let mut reader = AsyncReader::new(Cursor::new(script.as_bytes()));

        let first = reader.read_batch(2).await;
        assert_eq!(first.iter().map(Command::name).collect::<Vec<_>>(), vec!["register", "open"]);

        let second = reader.read_batch(2).await;
        assert_eq!(second.iter().map(Command::name).collect::<Vec<_>>(), vec!["deposit", "settle"]);

        assert_eq!(reader.read_batch(2).await.len(), 1);
        assert!(reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_malformed_rows() {
        let script = "op,user,from,to,amount,detail\n\
            register,,,,,secret-pass\n\
            pay-bill,alice,A1,not-an-id,,\n\
            register,bob,,,,secret-pass\n";
        let mut reader = AsyncReader::new(Cursor::new(script.as_bytes()));

        let batch = reader.read_batch(10).await;

        assert_eq!(batch.len(), 1);
        assert_eq!(reader.skipped(), 2);
        assert!(matches!(&batch[0], Command::Register { username, .. } if username == "bob"));
    }

    #[tokio::test]
    async fn test_async_reader_empty_script() {
        let mut reader =
            AsyncReader::new(Cursor::new("op,user,from,to,amount,detail\n".as_bytes()));
        assert!(reader.read_batch(10).await.is_empty());
        assert_eq!(reader.skipped(), 0);
    }
}
