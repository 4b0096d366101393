//! Species table loading and slug derivation
//!
//! The species table is a CSV file with one row per species. It needs a name
//! column (`name`, or `bird_name` for older tables) and, once resolved, a
//! `taxon_id` column. Any other columns are carried through untouched when the
//! table is rewritten by the taxon resolver.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Header names accepted for the species name column
const NAME_COLUMNS: &[&str] = &["name", "bird_name", "species"];

/// Header of the taxon ID column
pub const TAXON_ID_COLUMN: &str = "taxon_id";

/// Species table errors
#[derive(Debug, thiserror::Error)]
pub enum SpeciesTableError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Table has no usable name column
    #[error("species table has no name column (expected one of: {})", NAME_COLUMNS.join(", "))]
    MissingNameColumn,

    /// Resolved IDs do not line up with the table rows
    #[error("expected {expected} taxon IDs, got {actual}")]
    RowCountMismatch {
        /// Rows in the table
        expected: usize,
        /// IDs supplied
        actual: usize,
    },
}

/// A species to harvest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesEntry {
    /// Display name (e.g. "Northern Cardinal")
    pub name: String,
    /// Taxon ID in the observation API
    pub taxon_id: u64,
}

impl SpeciesEntry {
    /// Create a new species entry
    pub fn new(name: impl Into<String>, taxon_id: u64) -> Self {
        Self {
            name: name.into(),
            taxon_id,
        }
    }
}

/// Derive the lowercase, filesystem-safe directory name for a species
///
/// Whitespace, hyphens and path separators each become `_`; everything else is
/// lowercased and kept. "Chuck-will's-widow" becomes "chuck_will's_widow".
pub fn species_slug(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '-' | '/' | '\\' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

/// In-memory copy of a species CSV table
#[derive(Debug, Clone)]
pub struct SpeciesTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    name_col: usize,
    taxon_col: Option<usize>,
}

impl SpeciesTable {
    /// Read a species table from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SpeciesTableError> {
        let path = path.as_ref();
        debug!("Loading species table: {}", path.display());

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)
            .map_err(|e| SpeciesTableError::CsvError(format!("{}: {}", path.display(), e)))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| SpeciesTableError::CsvError(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| SpeciesTableError::CsvError(e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Self::from_parts(headers, rows)
    }

    /// Build a table from headers and rows
    ///
    /// Short rows are padded with empty cells to the header width.
    pub fn from_parts(headers: Vec<String>, mut rows: Vec<Vec<String>>) -> Result<Self, SpeciesTableError> {
        for row in &mut rows {
            if row.len() < headers.len() {
                row.resize(headers.len(), String::new());
            }
        }
        let name_col = NAME_COLUMNS
            .iter()
            .find_map(|wanted| headers.iter().position(|h| h.eq_ignore_ascii_case(wanted)))
            .ok_or(SpeciesTableError::MissingNameColumn)?;
        let taxon_col = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(TAXON_ID_COLUMN));

        Ok(Self {
            headers,
            rows,
            name_col,
            taxon_col,
        })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Species names in table order
    pub fn names(&self) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row[self.name_col].as_str())
            .collect()
    }

    /// Species with a usable taxon ID; rows without one are skipped
    pub fn entries(&self) -> Vec<SpeciesEntry> {
        let Some(taxon_col) = self.taxon_col else {
            warn!("Species table has no {} column; run resolve-taxa first", TAXON_ID_COLUMN);
            return Vec::new();
        };

        self.rows
            .iter()
            .filter_map(|row| {
                let name = row[self.name_col].as_str();
                if name.is_empty() {
                    return None;
                }
                match parse_taxon_id(&row[taxon_col]) {
                    Some(taxon_id) => Some(SpeciesEntry::new(name, taxon_id)),
                    None => {
                        warn!("Skipping '{}': no usable taxon_id ({:?})", name, row[taxon_col]);
                        None
                    }
                }
            })
            .collect()
    }

    /// Replace the taxon ID column, inserting it after the name column when absent
    pub fn set_taxon_ids(&mut self, ids: &[Option<u64>]) -> Result<(), SpeciesTableError> {
        if ids.len() != self.rows.len() {
            return Err(SpeciesTableError::RowCountMismatch {
                expected: self.rows.len(),
                actual: ids.len(),
            });
        }

        let col = match self.taxon_col {
            Some(col) => col,
            None => {
                let col = self.name_col + 1;
                self.headers.insert(col, TAXON_ID_COLUMN.to_string());
                for row in &mut self.rows {
                    row.insert(col, String::new());
                }
                self.taxon_col = Some(col);
                col
            }
        };

        for (row, id) in self.rows.iter_mut().zip(ids) {
            row[col] = id.map(|id| id.to_string()).unwrap_or_default();
        }
        Ok(())
    }

    /// Write the table to disk
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SpeciesTableError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SpeciesTableError::IoError(format!("Failed to create directory: {}", e)))?;
        }

        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| SpeciesTableError::CsvError(e.to_string()))?;
        writer
            .write_record(&self.headers)
            .map_err(|e| SpeciesTableError::CsvError(e.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| SpeciesTableError::CsvError(e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| SpeciesTableError::IoError(e.to_string()))
    }
}

/// Load the species to harvest from a CSV table
pub fn load_species<P: AsRef<Path>>(path: P) -> Result<Vec<SpeciesEntry>, SpeciesTableError> {
    Ok(SpeciesTable::load(path)?.entries())
}

// Tables written by pandas store integer columns with NaN as floats ("9083.0").
fn parse_taxon_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as u64)
    })
}
