//! Ledger and filesystem output

use crate::LicensingRecord;

pub mod csv;
pub mod path;
pub mod rename;

pub use self::csv::{write_ledger, CsvLedgerWriter, LEDGER_COLUMNS};
pub use path::SpeciesLayout;
pub use rename::normalize_filenames;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer trait
pub trait OutputWriter {
    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Trait for writing licensing records
pub trait LedgerWriter: OutputWriter {
    /// Write a single record
    fn write_record(&mut self, record: &LicensingRecord) -> OutputResult<()>;

    /// Write multiple records at once, in order
    fn write_records(&mut self, records: &[LicensingRecord]) -> OutputResult<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }
}
