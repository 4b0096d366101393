//! CSV attribution ledger
//!
//! Column order is fixed by [`LEDGER_COLUMNS`]. The header row is written on
//! open, so a run that discovers no photos still produces a valid ledger.

use crate::LicensingRecord;
use csv::{Writer, WriterBuilder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::{LedgerWriter, OutputError, OutputResult, OutputWriter};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Ledger columns, in file order
pub const LEDGER_COLUMNS: [&str; 7] = [
    "observation_id",
    "species",
    "photo_url",
    "medium_url",
    "license_code",
    "filename",
    "attribution",
];

/// CSV writer for licensing records
pub struct CsvLedgerWriter {
    writer: Writer<BufWriter<File>>,
    records_written: u64,
}

impl CsvLedgerWriter {
    /// Create the ledger file (overwriting any previous one) and write the header
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating ledger: path={}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));
        writer
            .write_record(LEDGER_COLUMNS)
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {}", e)))?;

        Ok(Self {
            writer,
            records_written: 0,
        })
    }

    /// Number of records written so far
    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}

impl LedgerWriter for CsvLedgerWriter {
    fn write_record(&mut self, record: &LicensingRecord) -> OutputResult<()> {
        self.writer
            .serialize(record)
            .map_err(|e| OutputError::CsvError(format!("Failed to write record: {}", e)))?;
        self.records_written += 1;
        Ok(())
    }
}

impl OutputWriter for CsvLedgerWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    fn close(mut self) -> OutputResult<()> {
        self.flush()?;

        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {}", e)))?;
        let file = buf_writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get file handle: {}", e)))?;
        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        debug!("Ledger closed: {} records written", self.records_written);
        Ok(())
    }
}

/// Write `records` to a fresh ledger at `path`
pub fn write_ledger<P: AsRef<Path>>(path: P, records: &[LicensingRecord]) -> OutputResult<u64> {
    let mut writer = CsvLedgerWriter::new(path)?;
    writer.write_records(records)?;
    let written = writer.records_written();
    writer.close()?;
    Ok(written)
}
