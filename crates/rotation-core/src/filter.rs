// Entity filter: keep the rows that belong to the target team.
//
// Source data providers disagree on team identifiers, so matching degrades
// from exact ids to fuzzy name fragments. The first strategy that keeps at
// least one row wins.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::TargetEntity;
use crate::error::RotationError;
use crate::schema::FieldMap;
use crate::table::{Cell, Table};

/// Cap on distinct values reported per field when nothing matches.
const OBSERVED_VALUES_LIMIT: usize = 25;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Exact match on the team id field.
    Identifier,
    /// Exact match on the team display name against known aliases.
    DisplayName,
    /// Case-insensitive substring match on the team display name.
    Keyword,
    /// Exact match on the team abbreviation field.
    Abbreviation,
}

impl MatchStrategy {
    /// Priority order, most precise first.
    pub const ORDER: [MatchStrategy; 4] = [
        MatchStrategy::Identifier,
        MatchStrategy::DisplayName,
        MatchStrategy::Keyword,
        MatchStrategy::Abbreviation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MatchStrategy::Identifier => "identifier",
            MatchStrategy::DisplayName => "display_name",
            MatchStrategy::Keyword => "keyword",
            MatchStrategy::Abbreviation => "abbreviation",
        }
    }

    /// Field this strategy reads, if the schema resolved one.
    pub fn field<'a>(self, fields: &'a FieldMap) -> Option<&'a str> {
        match self {
            MatchStrategy::Identifier => fields.team_id.as_deref(),
            MatchStrategy::DisplayName | MatchStrategy::Keyword => fields.team_name.as_deref(),
            MatchStrategy::Abbreviation => fields.team_abbreviation.as_deref(),
        }
    }

    fn candidates(self, target: &TargetEntity) -> &[String] {
        match self {
            MatchStrategy::Identifier => &target.ids,
            MatchStrategy::DisplayName => &target.display_names,
            MatchStrategy::Keyword => &target.keywords,
            MatchStrategy::Abbreviation => &target.abbreviations,
        }
    }

    /// Whether a single cell of this strategy's field matches the target.
    pub fn matches(self, cell: &Cell, target: &TargetEntity) -> bool {
        let Some(value) = cell.key() else {
            return false;
        };
        let candidates = self.candidates(target);
        match self {
            MatchStrategy::Keyword => {
                let haystack = value.to_lowercase();
                candidates
                    .iter()
                    .filter(|k| !k.trim().is_empty())
                    .any(|k| haystack.contains(&k.trim().to_lowercase()))
            }
            _ => candidates.iter().any(|c| c.trim() == value),
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What happened to one strategy during filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum AttemptResult {
    Skipped { reason: String },
    Matched { rows: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterAttempt {
    pub strategy: MatchStrategy,
    pub result: AttemptResult,
}

impl fmt::Display for FilterAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            AttemptResult::Skipped { reason } => write!(f, "{} (skipped: {reason})", self.strategy),
            AttemptResult::Matched { rows } => write!(f, "{} ({rows} rows)", self.strategy),
        }
    }
}

/// Filtered rows plus a record of how they were found.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub rows: Table,
    pub strategy: MatchStrategy,
    pub attempts: Vec<FilterAttempt>,
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Keep the rows of `table` that belong to `target`.
pub fn filter_rows(
    table: &Table,
    fields: &FieldMap,
    target: &TargetEntity,
) -> Result<FilterOutcome, RotationError> {
    let mut attempts = Vec::with_capacity(MatchStrategy::ORDER.len());

    for strategy in MatchStrategy::ORDER {
        let Some(field) = strategy.field(fields) else {
            attempts.push(FilterAttempt {
                strategy,
                result: AttemptResult::Skipped {
                    reason: "field not present".into(),
                },
            });
            continue;
        };
        if strategy.candidates(target).is_empty() {
            attempts.push(FilterAttempt {
                strategy,
                result: AttemptResult::Skipped {
                    reason: "no candidates configured".into(),
                },
            });
            continue;
        }
        let Some(idx) = table.column_index(field) else {
            attempts.push(FilterAttempt {
                strategy,
                result: AttemptResult::Skipped {
                    reason: "column missing".into(),
                },
            });
            continue;
        };

        let matched: Vec<usize> = table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| strategy.matches(&row[idx], target))
            .map(|(i, _)| i)
            .collect();
        debug!("strategy {} on `{}` kept {} rows", strategy, field, matched.len());
        attempts.push(FilterAttempt {
            strategy,
            result: AttemptResult::Matched {
                rows: matched.len(),
            },
        });

        if !matched.is_empty() {
            info!(
                "filtered to {} rows for {} using {} on `{}`",
                matched.len(),
                target.name,
                strategy,
                field
            );
            return Ok(FilterOutcome {
                rows: table.select(&matched),
                strategy,
                attempts,
            });
        }
    }

    Err(not_found(table, fields, target, &attempts))
}

fn not_found(
    table: &Table,
    fields: &FieldMap,
    target: &TargetEntity,
    attempts: &[FilterAttempt],
) -> RotationError {
    let mut observed: Vec<(String, Vec<String>)> = Vec::new();
    for field in [&fields.team_id, &fields.team_name, &fields.team_abbreviation]
        .into_iter()
        .flatten()
    {
        if observed.iter().any(|(f, _)| f == field) {
            continue;
        }
        observed.push((field.clone(), table.distinct_keys(field, OBSERVED_VALUES_LIMIT)));
    }

    let team_columns = table
        .columns()
        .iter()
        .filter(|c| c.to_lowercase().contains("team"))
        .cloned()
        .collect();

    RotationError::EntityNotFound {
        entity: target.name.clone(),
        attempted: attempts.iter().map(|a| a.to_string()).collect(),
        observed,
        team_columns,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldAliases;
    use crate::schema::resolve;

    fn aces() -> TargetEntity {
        TargetEntity {
            name: "Las Vegas Aces".into(),
            ids: vec!["16".into()],
            display_names: vec!["Las Vegas Aces".into(), "LV Aces".into()],
            keywords: vec!["Vegas".into(), "Aces".into()],
            abbreviations: vec!["LV".into(), "LVA".into()],
        }
    }

    fn table(team_cols: &[&str], teams: &[&[&str]]) -> (Table, FieldMap) {
        let mut columns = vec!["athlete_id", "athlete_display_name", "game_id", "minutes"];
        columns.extend_from_slice(team_cols);
        let rows = teams
            .iter()
            .enumerate()
            .map(|(i, team)| {
                let mut row: Vec<Cell> = vec![
                    Cell::Number(i as f64),
                    Cell::text(format!("P{i}")),
                    Cell::text("g1"),
                    Cell::Number(10.0),
                ];
                row.extend(team.iter().map(|v| Cell::text(*v)));
                row
            })
            .collect();
        let table = Table::from_rows(&columns, rows);
        let fields = resolve(table.columns(), &FieldAliases::default(), &[]).unwrap();
        (table, fields)
    }

    #[test]
    fn identifier_match_wins_first() {
        let (t, f) = table(
            &["team_id", "team_display_name"],
            &[&["16", "Las Vegas Aces"], &["5", "Seattle Storm"], &["16", "Las Vegas Aces"]],
        );
        let out = filter_rows(&t, &f, &aces()).unwrap();
        assert_eq!(out.strategy, MatchStrategy::Identifier);
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.attempts.len(), 1);
    }

    #[test]
    fn numeric_team_id_matches_text_candidate() {
        let columns = ["athlete_id", "athlete_display_name", "game_id", "minutes", "team_id"];
        let t = Table::from_rows(
            &columns,
            vec![vec![
                Cell::Number(1.0),
                Cell::text("A"),
                Cell::text("g1"),
                Cell::Number(30.0),
                Cell::Number(16.0),
            ]],
        );
        let f = resolve(t.columns(), &FieldAliases::default(), &[]).unwrap();
        let out = filter_rows(&t, &f, &aces()).unwrap();
        assert_eq!(out.rows.len(), 1);
    }

    #[test]
    fn falls_back_to_display_name_when_ids_miss() {
        let (t, f) = table(
            &["team_id", "team_display_name"],
            &[&["1611661319", "Las Vegas Aces"], &["5", "Seattle Storm"]],
        );
        let out = filter_rows(&t, &f, &aces()).unwrap();
        assert_eq!(out.strategy, MatchStrategy::DisplayName);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(
            out.attempts[0].result,
            AttemptResult::Matched { rows: 0 }
        );
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let (t, f) = table(
            &["team_display_name"],
            &[&["LAS VEGAS"], &["Seattle Storm"], &["the aces"]],
        );
        let out = filter_rows(&t, &f, &aces()).unwrap();
        assert_eq!(out.strategy, MatchStrategy::Keyword);
        assert_eq!(out.rows.len(), 2);
        assert!(matches!(
            out.attempts[0].result,
            AttemptResult::Skipped { .. }
        ));
    }

    #[test]
    fn abbreviation_is_last_resort() {
        let (t, f) = table(&["team_abbreviation"], &[&["SEA"], &["LVA"]]);
        let out = filter_rows(&t, &f, &aces()).unwrap();
        assert_eq!(out.strategy, MatchStrategy::Abbreviation);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows.cell(0, "team_abbreviation"), Some(&Cell::text("LVA")));
    }

    #[test]
    fn no_match_reports_observed_values() {
        let (t, f) = table(
            &["team_id", "team_display_name", "team_abbreviation"],
            &[&["5", "Seattle Storm", "SEA"], &["3", "Chicago Sky", "CHI"]],
        );
        let err = filter_rows(&t, &f, &aces()).unwrap_err();
        match err {
            RotationError::EntityNotFound {
                entity,
                attempted,
                observed,
                team_columns,
            } => {
                assert_eq!(entity, "Las Vegas Aces");
                assert_eq!(attempted.len(), 4);
                assert_eq!(observed[0], ("team_id".to_string(), vec!["3".into(), "5".into()]));
                assert_eq!(observed.len(), 3);
                assert_eq!(
                    team_columns,
                    vec!["team_id", "team_display_name", "team_abbreviation"]
                );
            }
            other => panic!("expected EntityNotFound, got: {other}"),
        }
    }

    #[test]
    fn no_team_fields_at_all_is_not_found() {
        let (t, f) = table(&[], &[&[], &[]]);
        let err = filter_rows(&t, &f, &aces()).unwrap_err();
        assert_eq!(err.stage(), "filter");
    }

    #[test]
    fn stale_field_map_records_missing_column() {
        // Field map resolved against a different table that had a team id.
        let (t, _) = table(&["team_display_name"], &[&["Las Vegas Aces"], &["Seattle Storm"]]);
        let (_, f) = table(&["team_id", "team_display_name"], &[&["16", "Las Vegas Aces"]]);
        let out = filter_rows(&t, &f, &aces()).unwrap();
        assert_eq!(out.strategy, MatchStrategy::DisplayName);
        assert_eq!(
            out.attempts[0],
            FilterAttempt {
                strategy: MatchStrategy::Identifier,
                result: AttemptResult::Skipped {
                    reason: "column missing".into(),
                },
            }
        );
    }
}
