// Fatal run errors. Per-row data problems never reach this type; they are
// coerced where they occur.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RotationError {
    #[error("[load] data source unavailable: {source_id}: {reason}")]
    DataSourceUnavailable { source_id: String, reason: String },

    #[error(
        "[schema] could not resolve required field(s) {}; available fields: {}",
        .roles.join(", "),
        .available.join(", ")
    )]
    MissingRequiredField {
        roles: Vec<String>,
        available: Vec<String>,
    },

    #[error(
        "[filter] no rows matched target `{entity}`; attempted: {}; observed values: {}; team columns: {}",
        .attempted.join(", "),
        format_observed(.observed),
        .team_columns.join(", ")
    )]
    EntityNotFound {
        entity: String,
        attempted: Vec<String>,
        observed: Vec<(String, Vec<String>)>,
        team_columns: Vec<String>,
    },

    #[error("[rank] unknown rank key `{key}`; available keys: {}", .available.join(", "))]
    InvalidRankKey { key: String, available: Vec<String> },
}

impl RotationError {
    /// Name of the pipeline stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            RotationError::DataSourceUnavailable { .. } => "load",
            RotationError::MissingRequiredField { .. } => "schema",
            RotationError::EntityNotFound { .. } => "filter",
            RotationError::InvalidRankKey { .. } => "rank",
        }
    }
}

fn format_observed(observed: &[(String, Vec<String>)]) -> String {
    if observed.is_empty() {
        return "none".into();
    }
    observed
        .iter()
        .map(|(field, values)| format!("{field}=[{}]", values.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}
