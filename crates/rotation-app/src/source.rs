// Box-score file loading: CSV and Parquet into a `Table`.

use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use rotation_core::{Cell, SourceError, Table, TableSource};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("Parquet error in {path}: {source}")]
    Parquet {
        path: String,
        source: parquet::errors::ParquetError,
    },

    #[error("unsupported file type for {path}: expected .csv or .parquet")]
    UnsupportedFormat { path: String },
}

impl From<LoadError> for SourceError {
    fn from(e: LoadError) -> Self {
        SourceError(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// FileSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Parquet,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(FileFormat::Csv),
            "parquet" | "pq" => Some(FileFormat::Parquet),
            _ => None,
        }
    }
}

/// A box-score file on disk; the format follows the extension.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Table, LoadError> {
        let display = self.path.display().to_string();
        match FileFormat::from_path(&self.path) {
            Some(FileFormat::Csv) => load_csv(&self.path),
            Some(FileFormat::Parquet) => load_parquet(&self.path),
            None => Err(LoadError::UnsupportedFormat { path: display }),
        }
    }
}

impl TableSource for FileSource {
    fn source_id(&self) -> String {
        self.path.display().to_string()
    }

    fn read_table(&self) -> Result<Table, SourceError> {
        Ok(self.load()?)
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Read CSV from any reader. Headers become column names; empty cells are
/// `Missing`, everything else stays text and is coerced downstream. Invalid
/// UTF-8 is replaced per field, so a bad byte only degrades its own cell.
fn table_from_csv_reader<R: Read>(rdr: R) -> Result<Table, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let columns: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();
    let mut table = Table::new(columns);
    for (line, result) in reader.byte_records().enumerate() {
        match result {
            Ok(record) => {
                let mut lossy = false;
                let row = record
                    .iter()
                    .map(|raw| {
                        let value = String::from_utf8_lossy(raw);
                        lossy |= matches!(value, Cow::Owned(_));
                        if value.trim().is_empty() {
                            Cell::Missing
                        } else {
                            Cell::text(value.into_owned())
                        }
                    })
                    .collect();
                if lossy {
                    warn!("CSV record {} has invalid UTF-8; bad bytes replaced", line + 1);
                }
                table.push_row(row);
            }
            Err(e) => {
                warn!("skipping malformed CSV record {}: {}", line + 1, e);
            }
        }
    }
    Ok(table)
}

pub fn load_csv(path: &Path) -> Result<Table, LoadError> {
    let file = File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    table_from_csv_reader(file).map_err(|e| LoadError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

fn field_to_cell(field: &Field) -> Cell {
    match field {
        Field::Null => Cell::Missing,
        Field::Byte(v) => Cell::Number(f64::from(*v)),
        Field::Short(v) => Cell::Number(f64::from(*v)),
        Field::Int(v) => Cell::Number(f64::from(*v)),
        Field::Long(v) => Cell::Number(*v as f64),
        Field::UByte(v) => Cell::Number(f64::from(*v)),
        Field::UShort(v) => Cell::Number(f64::from(*v)),
        Field::UInt(v) => Cell::Number(f64::from(*v)),
        Field::ULong(v) => Cell::Number(*v as f64),
        Field::Float(v) => Cell::Number(f64::from(*v)),
        Field::Double(v) => Cell::Number(*v),
        Field::Str(s) => Cell::text(s.clone()),
        other => Cell::text(other.to_string()),
    }
}

pub fn load_parquet(path: &Path) -> Result<Table, LoadError> {
    let parquet_err = |e: parquet::errors::ParquetError| LoadError::Parquet {
        path: path.display().to_string(),
        source: e,
    };
    let file = File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let reader = SerializedFileReader::new(file).map_err(parquet_err)?;

    let columns: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema()
        .get_fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    debug!("parquet schema for {}: {} columns", path.display(), columns.len());

    let mut table = Table::new(columns);
    let rows = reader.get_row_iter(None).map_err(parquet_err)?;
    for (n, row) in rows.enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("skipping unreadable parquet row {}: {}", n, e);
                continue;
            }
        };
        let mut cells = vec![Cell::Missing; table.columns().len()];
        for (name, field) in row.get_column_iter() {
            if let Some(idx) = table.column_index(name) {
                cells[idx] = field_to_cell(field);
            }
        }
        table.push_row(cells);
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
