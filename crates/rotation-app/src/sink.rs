// Result-set output: one CSV per result set plus a JSON run manifest.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rotation_core::filter::{FilterAttempt, MatchStrategy};
use rotation_core::schema::FieldMap;
use rotation_core::{ResultSet, RotationReport, Table, TableSink};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::OutputConfig;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error writing {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("failed to serialize manifest {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// CSV directory sink
// ---------------------------------------------------------------------------

/// Writes each result set to `<dir>/<file name>` as CSV. File names come from
/// the output config; the directory is passed already resolved.
#[derive(Debug)]
pub struct CsvDirSink {
    dir: PathBuf,
    file_names: HashMap<ResultSet, String>,
    /// Paths and row counts written so far, in write order.
    written: Vec<(ResultSet, PathBuf, usize)>,
}

impl CsvDirSink {
    pub fn new(dir: impl Into<PathBuf>, output: &OutputConfig) -> Self {
        let file_names = HashMap::from([
            (ResultSet::FilteredRows, output.filtered_rows.clone()),
            (ResultSet::TopN, output.top_n.clone()),
            (ResultSet::Summary, output.summary.clone()),
            (ResultSet::Detailed, output.detailed.clone()),
        ]);
        Self {
            dir: dir.into(),
            file_names,
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> &[(ResultSet, PathBuf, usize)] {
        &self.written
    }

    fn path_for(&self, set: ResultSet) -> PathBuf {
        let name = self
            .file_names
            .get(&set)
            .cloned()
            .unwrap_or_else(|| format!("{}.csv", set.as_str()));
        self.dir.join(name)
    }
}

impl TableSink for CsvDirSink {
    type Error = SinkError;

    fn write_table(&mut self, set: ResultSet, table: &Table) -> Result<(), SinkError> {
        fs::create_dir_all(&self.dir).map_err(|e| SinkError::Io {
            path: self.dir.clone(),
            source: e,
        })?;
        let path = self.path_for(set);
        write_csv(&path, table)?;
        info!("saved {} ({} rows) to {}", set.as_str(), table.len(), path.display());
        self.written.push((set, path, table.len()));
        Ok(())
    }
}

fn write_csv(path: &Path, table: &Table) -> Result<(), SinkError> {
    let csv_err = |e: csv::Error| SinkError::Csv {
        path: path.to_path_buf(),
        source: e,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(table.columns()).map_err(csv_err)?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|cell| cell.to_string()))
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|e| SinkError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Run manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ManifestPlayer {
    pub rank: usize,
    pub player_id: String,
    pub player_name: String,
    pub total_minutes: f64,
    pub games: usize,
}

#[derive(Debug, Serialize)]
pub struct ManifestOutput {
    pub set: ResultSet,
    pub path: String,
    pub rows: usize,
}

/// Audit record of one run, written next to the CSV outputs.
#[derive(Debug, Serialize)]
pub struct Manifest {
    pub completed_at: DateTime<Utc>,
    pub source: String,
    pub target: String,
    pub filter_strategy: MatchStrategy,
    pub filter_attempts: Vec<FilterAttempt>,
    pub fields: FieldMap,
    pub rank_key: String,
    pub outputs: Vec<ManifestOutput>,
    pub top_players: Vec<ManifestPlayer>,
}

impl Manifest {
    pub fn build(
        report: &RotationReport,
        source: &str,
        target: &str,
        sink: &CsvDirSink,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            completed_at,
            source: source.to_string(),
            target: target.to_string(),
            filter_strategy: report.filter.strategy,
            filter_attempts: report.filter.attempts.clone(),
            fields: report.fields.clone(),
            rank_key: report.ranking.key.to_string(),
            outputs: sink
                .written()
                .iter()
                .map(|(set, path, rows)| ManifestOutput {
                    set: *set,
                    path: path.display().to_string(),
                    rows: *rows,
                })
                .collect(),
            top_players: report
                .top()
                .iter()
                .enumerate()
                .map(|(i, p)| ManifestPlayer {
                    rank: i + 1,
                    player_id: p.player_id.clone(),
                    player_name: p.player_name.clone(),
                    total_minutes: p.total_minutes,
                    games: p.games,
                })
                .collect(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), SinkError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| SinkError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(|e| SinkError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
