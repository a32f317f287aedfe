// Group filtered rows into one summary per player.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use crate::config::GroupBy;
use crate::minutes::normalize_minutes;
use crate::schema::FieldMap;
use crate::table::Table;

/// Season totals for one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub player_id: String,
    pub player_name: String,
    pub total_minutes: f64,
    /// Distinct game identifiers, not rows.
    pub games: usize,
    /// `(counter key, total)` in the order the schema resolved them.
    pub counters: Vec<(String, f64)>,
}

impl PlayerSummary {
    pub fn counter(&self, key: &str) -> Option<f64> {
        self.counters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, total)| *total)
    }
}

/// Running state for one group while rows are folded in.
struct Accumulator {
    player_id: String,
    minutes: f64,
    games: HashSet<String>,
    counters: Vec<f64>,
    /// name -> (row count, last row index seen)
    names: HashMap<String, (usize, usize)>,
}

impl Accumulator {
    fn new(player_id: String, counter_count: usize) -> Self {
        Self {
            player_id,
            minutes: 0.0,
            games: HashSet::new(),
            counters: vec![0.0; counter_count],
            names: HashMap::new(),
        }
    }

    /// Most frequent name; ties go to the one seen last.
    fn display_name(&self) -> String {
        self.names
            .iter()
            .max_by_key(|(_, (count, last))| (*count, *last))
            .map(|(name, _)| name.clone())
            .unwrap_or_default()
    }
}

/// Aggregate `rows` into player summaries.
///
/// Summaries come back in order of each group's first appearance.
pub fn aggregate(rows: &Table, fields: &FieldMap, group_by: GroupBy) -> Vec<PlayerSummary> {
    let col = |name: &str| rows.column_index(name);
    let (Some(id_idx), Some(name_idx), Some(time_idx), Some(game_idx)) = (
        col(&fields.player_id),
        col(&fields.player_name),
        col(&fields.time_played),
        col(&fields.game_id),
    ) else {
        return Vec::new();
    };
    let counter_idx: Vec<Option<usize>> = fields.counters.iter().map(|c| col(&c.field)).collect();

    let mut groups: Vec<Accumulator> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for (row_no, row) in rows.rows().iter().enumerate() {
        let player_id = row[id_idx].key().unwrap_or_default();
        let player_name = row[name_idx].key().unwrap_or_default();
        let group_key = match group_by {
            GroupBy::IdAndName => (player_id.clone(), player_name.clone()),
            GroupBy::Id => (player_id.clone(), String::new()),
        };

        let slot = *index.entry(group_key).or_insert_with(|| {
            groups.push(Accumulator::new(player_id, counter_idx.len()));
            groups.len() - 1
        });
        let acc = &mut groups[slot];

        acc.minutes += normalize_minutes(&row[time_idx]);
        if let Some(game) = row[game_idx].key() {
            acc.games.insert(game);
        }
        for (total, idx) in acc.counters.iter_mut().zip(&counter_idx) {
            if let Some(v) = idx.and_then(|i| row[i].as_number()) {
                *total += v;
            }
        }
        let entry = acc.names.entry(player_name).or_insert((0, row_no));
        entry.0 += 1;
        entry.1 = row_no;
    }

    if group_by == GroupBy::IdAndName {
        warn_split_ids(&groups);
    }

    groups
        .into_iter()
        .map(|acc| PlayerSummary {
            player_name: acc.display_name(),
            player_id: acc.player_id,
            total_minutes: acc.minutes,
            games: acc.games.len(),
            counters: fields
                .counters
                .iter()
                .map(|c| c.key.clone())
                .zip(acc.counters)
                .collect(),
        })
        .collect()
}

/// Log ids that ended up in more than one summary because their name varies.
fn warn_split_ids(groups: &[Accumulator]) {
    let mut names_by_id: HashMap<&str, Vec<&str>> = HashMap::new();
    for acc in groups {
        for name in acc.names.keys() {
            names_by_id
                .entry(acc.player_id.as_str())
                .or_default()
                .push(name.as_str());
        }
    }
    for (id, names) in names_by_id {
        if names.len() > 1 {
            warn!(
                "player id {} appears under {} names ({}); summaries are split",
                id,
                names.len(),
                names.join(", ")
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_counters, FieldAliases};
    use crate::schema::resolve;
    use crate::table::Cell;

    fn row(id: f64, name: &str, game: &str, min: &str, pts: f64) -> Vec<Cell> {
        vec![
            Cell::Number(id),
            Cell::text(name),
            Cell::text(game),
            Cell::text(min),
            Cell::Number(pts),
        ]
    }

    fn build(rows: Vec<Vec<Cell>>) -> (Table, FieldMap) {
        let table = Table::from_rows(&["id", "name", "game_id", "min", "pts"], rows);
        let fields = resolve(table.columns(), &FieldAliases::default(), &default_counters()).unwrap();
        (table, fields)
    }

    #[test]
    fn sums_minutes_and_counters_per_player() {
        let (t, f) = build(vec![
            row(1.0, "A", "g1", "32:30", 20.0),
            row(1.0, "A", "g2", "28:00", 15.0),
            row(2.0, "B", "g1", "10:00", 5.0),
        ]);
        let out = aggregate(&t, &f, GroupBy::IdAndName);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].player_id, "1");
        assert_eq!(out[0].player_name, "A");
        assert_eq!(out[0].total_minutes, 60.5);
        assert_eq!(out[0].games, 2);
        assert_eq!(out[0].counter("pts"), Some(35.0));
        assert_eq!(out[1].total_minutes, 10.0);
        assert_eq!(out[1].games, 1);
    }

    #[test]
    fn games_count_distinct_ids_not_rows() {
        let (t, f) = build(vec![
            row(1.0, "A", "g1", "10:00", 2.0),
            row(1.0, "A", "g1", "05:00", 3.0),
            row(1.0, "A", "g2", "12:00", 4.0),
        ]);
        let out = aggregate(&t, &f, GroupBy::IdAndName);
        assert_eq!(out[0].games, 2);
        assert_eq!(out[0].total_minutes, 27.0);
        assert_eq!(out[0].counter("pts"), Some(9.0));
    }

    #[test]
    fn minutes_are_conserved() {
        let mins = ["32:30", "DNP", "18:15", "7", "", "40:00"];
        let rows = mins
            .iter()
            .enumerate()
            .map(|(i, m)| row((i % 3) as f64, &format!("P{}", i % 3), &format!("g{i}"), m, 1.0))
            .collect();
        let (t, f) = build(rows);
        let out = aggregate(&t, &f, GroupBy::IdAndName);
        let per_row: f64 = mins.iter().map(|m| normalize_minutes(&Cell::text(*m))).sum();
        let summed: f64 = out.iter().map(|s| s.total_minutes).sum();
        assert!((per_row - summed).abs() < 1e-9);
    }

    #[test]
    fn id_and_name_grouping_splits_renamed_player() {
        let (t, f) = build(vec![
            row(7.0, "Jo Smith", "g1", "20:00", 1.0),
            row(7.0, "Joanne Smith", "g2", "20:00", 1.0),
        ]);
        let out = aggregate(&t, &f, GroupBy::IdAndName);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn id_grouping_uses_most_frequent_name() {
        let (t, f) = build(vec![
            row(7.0, "Jo Smith", "g1", "20:00", 1.0),
            row(7.0, "Joanne Smith", "g2", "20:00", 1.0),
            row(7.0, "Joanne Smith", "g3", "20:00", 1.0),
        ]);
        let out = aggregate(&t, &f, GroupBy::Id);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].player_name, "Joanne Smith");
        assert_eq!(out[0].games, 3);
    }

    #[test]
    fn id_grouping_tie_goes_to_latest_name() {
        let (t, f) = build(vec![
            row(7.0, "Jo Smith", "g1", "20:00", 1.0),
            row(7.0, "Joanne Smith", "g2", "20:00", 1.0),
        ]);
        let out = aggregate(&t, &f, GroupBy::Id);
        assert_eq!(out[0].player_name, "Joanne Smith");
    }

    #[test]
    fn missing_game_ids_do_not_count() {
        let table = Table::from_rows(
            &["id", "name", "game_id", "min"],
            vec![vec![
                Cell::Number(1.0),
                Cell::text("A"),
                Cell::Missing,
                Cell::text("12:00"),
            ]],
        );
        let fields = resolve(table.columns(), &FieldAliases::default(), &[]).unwrap();
        let out = aggregate(&table, &fields, GroupBy::IdAndName);
        assert_eq!(out[0].games, 0);
        assert_eq!(out[0].total_minutes, 12.0);
        assert!(out[0].counters.is_empty());
    }

    #[test]
    fn unparseable_counter_cells_count_as_zero() {
        let table = Table::from_rows(
            &["id", "name", "game_id", "min", "pts"],
            vec![
                vec![Cell::Number(1.0), "A".into(), "g1".into(), "10".into(), "--".into()],
                vec![Cell::Number(1.0), "A".into(), "g2".into(), "10".into(), "12".into()],
            ],
        );
        let fields = resolve(table.columns(), &FieldAliases::default(), &default_counters()).unwrap();
        let out = aggregate(&table, &fields, GroupBy::IdAndName);
        assert_eq!(out[0].counter("pts"), Some(12.0));
    }
}
