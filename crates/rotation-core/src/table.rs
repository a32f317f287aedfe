// In-memory row set shared by every pipeline stage, plus the source/sink seams.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A single field value. Sources decide the variant; the engine coerces on
/// demand and never rejects a row for holding the "wrong" kind of value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Missing,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Build a cell from an optional number. `None` and non-finite values
    /// become `Missing`.
    pub fn from_option(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Missing,
        }
    }

    /// Numeric view of the cell. Text is trimmed and parsed as `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Missing => None,
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Number(_) => None,
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Comparison key used for grouping and exact matching.
    ///
    /// Integral numbers render without a fractional part so that a Parquet
    /// `Long(16)` and a CSV `"16"` produce the same key.
    pub fn key(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(n) if !n.is_finite() => None,
            Cell::Number(n) => Some(format_number(*n)),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) if n.is_finite() => f.write_str(&format_number(*n)),
            Cell::Number(_) => Ok(()),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Ordered columns plus rows of cells. Every row has exactly one cell per
/// column; short rows are padded with `Cell::Missing` on insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Convenience constructor for fixtures and tests.
    pub fn from_rows(columns: &[&str], rows: Vec<Vec<Cell>>) -> Self {
        let mut table = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Missing);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `(row, column name)`, or `None` if the column does not exist.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// New table with the same columns and only the rows at `indices`, in
    /// the order given.
    pub fn select(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// Sorted distinct keys observed in `column`, capped at `limit` entries.
    pub fn distinct_keys(&self, column: &str, limit: usize) -> Vec<String> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };
        let keys: BTreeSet<String> = self.rows.iter().filter_map(|r| r[idx].key()).collect();
        keys.into_iter().take(limit).collect()
    }
}

// ---------------------------------------------------------------------------
// Source / sink seams
// ---------------------------------------------------------------------------

/// Error raised by a source that cannot produce a table at all.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SourceError(pub String);

/// Anything that can produce the raw row set in one read.
pub trait TableSource {
    /// Human-readable identifier used in diagnostics (usually a path).
    fn source_id(&self) -> String;

    fn read_table(&self) -> Result<Table, SourceError>;
}

/// The four result sets a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSet {
    FilteredRows,
    TopN,
    Summary,
    Detailed,
}

impl ResultSet {
    pub const ALL: [ResultSet; 4] = [
        ResultSet::FilteredRows,
        ResultSet::TopN,
        ResultSet::Summary,
        ResultSet::Detailed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResultSet::FilteredRows => "filtered_rows",
            ResultSet::TopN => "top_n",
            ResultSet::Summary => "summary",
            ResultSet::Detailed => "detailed",
        }
    }
}

/// Anything that accepts finished result sets.
pub trait TableSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn write_table(&mut self, set: ResultSet, table: &Table) -> Result<(), Self::Error>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
