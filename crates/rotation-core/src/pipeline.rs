// Batch entry point: source rows in, four result sets out.
//
// Stages run strictly in order: load, resolve schema, filter, aggregate,
// rank, derive. Any fatal error stops the run before later stages.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::aggregate::{aggregate, PlayerSummary};
use crate::config::RotationConfig;
use crate::error::RotationError;
use crate::filter::{filter_rows, FilterOutcome};
use crate::metrics::{derive, minutes_per_game, DerivedMetrics, MINUTES_PER_GAME, PER_GAME_SUFFIX};
use crate::rank::{rank, RankKey, Ranking};
use crate::schema::{resolve, FieldMap};
use crate::table::{Cell, ResultSet, Table, TableSink, TableSource};

/// Columns of the top-N and full summary result sets.
pub const SUMMARY_COLUMNS: [&str; 5] = [
    "player_id",
    "player_name",
    "total_minutes",
    "games",
    MINUTES_PER_GAME,
];

/// Number of players logged as a sample after filtering.
const SAMPLE_PLAYERS: usize = 5;

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RotationReport {
    pub fields: FieldMap,
    pub filter: FilterOutcome,
    pub ranking: Ranking,
    /// Derived metrics for each entry of `ranking.top()`, same order.
    pub detailed: Vec<DerivedMetrics>,
    percentage_names: Vec<String>,
}

/// Read the source and run every stage.
pub fn run(
    source: &dyn TableSource,
    config: &RotationConfig,
) -> Result<RotationReport, RotationError> {
    let source_id = source.source_id();
    info!("loading rows from {}", source_id);
    let table = source
        .read_table()
        .map_err(|e| RotationError::DataSourceUnavailable {
            source_id: source_id.clone(),
            reason: e.to_string(),
        })?;
    info!("loaded {} rows with {} columns", table.len(), table.columns().len());

    run_table(&table, config)
}

/// Run every stage on an already-loaded table.
pub fn run_table(table: &Table, config: &RotationConfig) -> Result<RotationReport, RotationError> {
    let fields = resolve(table.columns(), &config.fields, &config.counters)?;
    info!(
        "using player id `{}`, name `{}`, minutes `{}`, game `{}`; {} stat counters",
        fields.player_id,
        fields.player_name,
        fields.time_played,
        fields.game_id,
        fields.counters.len()
    );

    let filter = filter_rows(table, &fields, &config.target)?;
    log_sample_players(&filter.rows, &fields);

    let key = RankKey::parse(&config.ranking.key, &fields)?;
    let summaries = aggregate(&filter.rows, &fields, config.ranking.group_by);
    info!("aggregated {} players", summaries.len());

    let ranking = rank(&summaries, key, config.ranking.top_n);
    for (pos, p) in ranking.top().iter().enumerate() {
        info!(
            "#{} {} ({}): {:.1} min over {} games",
            pos + 1,
            p.player_name,
            p.player_id,
            p.total_minutes,
            p.games
        );
    }

    let detailed = ranking
        .top()
        .iter()
        .map(|s| derive(s, &config.percentages))
        .collect();

    Ok(RotationReport {
        fields,
        filter,
        ranking,
        detailed,
        percentage_names: config.percentages.iter().map(|r| r.name.clone()).collect(),
    })
}

/// Hand every result set to `sink`, in `ResultSet::ALL` order.
pub fn write_report<S: TableSink>(report: &RotationReport, sink: &mut S) -> Result<(), S::Error> {
    for (set, table) in report.result_sets() {
        sink.write_table(set, &table)?;
    }
    Ok(())
}

impl RotationReport {
    pub fn top(&self) -> &[PlayerSummary] {
        self.ranking.top()
    }

    pub fn result_sets(&self) -> [(ResultSet, Table); 4] {
        [
            (ResultSet::FilteredRows, self.filter.rows.clone()),
            (ResultSet::TopN, summary_table(self.ranking.top())),
            (ResultSet::Summary, summary_table(&self.ranking.ordered)),
            (ResultSet::Detailed, self.detailed_table()),
        ]
    }

    fn detailed_table(&self) -> Table {
        let counter_keys: Vec<String> = self.fields.counter_keys().map(str::to_string).collect();
        // Rules with no made/attempted pair in this dataset get no column.
        let pct_names: Vec<&String> = self
            .percentage_names
            .iter()
            .filter(|name| self.detailed.iter().any(|d| d.has_percentage(name)))
            .collect();

        let mut columns: Vec<String> = SUMMARY_COLUMNS[..4].iter().map(|c| c.to_string()).collect();
        columns.extend(counter_keys.iter().cloned());
        columns.push(MINUTES_PER_GAME.to_string());
        columns.extend(counter_keys.iter().map(|k| format!("{k}{PER_GAME_SUFFIX}")));
        columns.extend(pct_names.iter().map(|n| n.to_string()));

        let mut table = Table::new(columns);
        for (summary, derived) in self.ranking.top().iter().zip(&self.detailed) {
            let mut row = base_cells(summary);
            row.truncate(4);
            row.extend(counter_keys.iter().map(|k| Cell::from_option(summary.counter(k))));
            row.push(Cell::from_option(derived.minutes_per_game));
            row.extend(counter_keys.iter().map(|k| Cell::from_option(derived.per_game(k))));
            row.extend(pct_names.iter().map(|n| Cell::from_option(derived.percentage(n))));
            table.push_row(row);
        }
        table
    }
}

fn base_cells(summary: &PlayerSummary) -> Vec<Cell> {
    vec![
        Cell::text(summary.player_id.clone()),
        Cell::text(summary.player_name.clone()),
        Cell::Number(summary.total_minutes),
        Cell::Number(summary.games as f64),
        Cell::from_option(minutes_per_game(summary)),
    ]
}

fn summary_table(summaries: &[PlayerSummary]) -> Table {
    let mut table = Table::new(SUMMARY_COLUMNS.iter().map(|c| c.to_string()).collect());
    for summary in summaries {
        table.push_row(base_cells(summary));
    }
    table
}

fn log_sample_players(rows: &Table, fields: &FieldMap) {
    let Some(idx) = rows.column_index(&fields.player_name) else {
        return;
    };
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in rows.rows() {
        if let Some(name) = row[idx].key() {
            *counts.entry(name).or_default() += 1;
        }
    }
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    for (name, n) in counts.into_iter().take(SAMPLE_PLAYERS) {
        debug!("sample player {}: {} rows", name, n);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetEntity;
    use crate::table::SourceError;

    fn scenario_table() -> Table {
        Table::from_rows(
            &["id", "name", "game", "min", "pts", "team_id"],
            vec![
                vec![Cell::Number(1.0), "A".into(), "g1".into(), "32:30".into(), Cell::Number(20.0), "16".into()],
                vec![Cell::Number(1.0), "A".into(), "g2".into(), "28:00".into(), Cell::Number(15.0), "16".into()],
                vec![Cell::Number(2.0), "B".into(), "g1".into(), "10:00".into(), Cell::Number(5.0), "16".into()],
                vec![Cell::Number(3.0), "C".into(), "g1".into(), "40:00".into(), Cell::Number(30.0), "5".into()],
            ],
        )
    }

    fn config(top_n: usize) -> RotationConfig {
        let mut config = RotationConfig::for_target(TargetEntity {
            name: "Team".into(),
            ids: vec!["16".into()],
            ..TargetEntity::default()
        });
        config.ranking.top_n = top_n;
        config
    }

    struct MemorySource(Table);

    impl TableSource for MemorySource {
        fn source_id(&self) -> String {
            "memory".into()
        }

        fn read_table(&self) -> Result<Table, SourceError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenSource;

    impl TableSource for BrokenSource {
        fn source_id(&self) -> String {
            "missing.parquet".into()
        }

        fn read_table(&self) -> Result<Table, SourceError> {
            Err(SourceError("no such file".into()))
        }
    }

    #[derive(Default)]
    struct MemorySink(Vec<(ResultSet, Table)>);

    impl TableSink for MemorySink {
        type Error = std::convert::Infallible;

        fn write_table(&mut self, set: ResultSet, table: &Table) -> Result<(), Self::Error> {
            self.0.push((set, table.clone()));
            Ok(())
        }
    }

    #[test]
    fn scenario_top_one_by_minutes() {
        let report = run(&MemorySource(scenario_table()), &config(1)).unwrap();
        assert_eq!(report.filter.rows.len(), 3);
        let top = report.top();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].player_name, "A");
        assert_eq!(top[0].total_minutes, 60.5);
        assert_eq!(top[0].games, 2);
        assert_eq!(top[0].counter("pts"), Some(35.0));
        assert_eq!(report.detailed[0].minutes_per_game, Some(30.25));
        assert_eq!(report.detailed[0].per_game("pts"), Some(17.5));
    }

    #[test]
    fn unavailable_source_is_fatal() {
        let err = run(&BrokenSource, &config(8)).unwrap_err();
        match &err {
            RotationError::DataSourceUnavailable { source_id, reason } => {
                assert_eq!(source_id, "missing.parquet");
                assert_eq!(reason, "no such file");
            }
            other => panic!("expected DataSourceUnavailable, got: {other}"),
        }
        assert_eq!(err.stage(), "load");
    }

    #[test]
    fn unknown_target_is_fatal() {
        let mut cfg = config(8);
        cfg.target.ids = vec!["99".into()];
        let err = run_table(&scenario_table(), &cfg).unwrap_err();
        assert!(matches!(err, RotationError::EntityNotFound { .. }));
    }

    #[test]
    fn invalid_rank_key_is_fatal() {
        let mut cfg = config(8);
        cfg.ranking.key = "ast".into();
        let err = run_table(&scenario_table(), &cfg).unwrap_err();
        assert_eq!(err.stage(), "rank");
    }

    #[test]
    fn result_sets_have_expected_shapes() {
        let report = run_table(&scenario_table(), &config(1)).unwrap();
        let mut sink = MemorySink::default();
        write_report(&report, &mut sink).unwrap();

        let sets: Vec<ResultSet> = sink.0.iter().map(|(s, _)| *s).collect();
        assert_eq!(sets, ResultSet::ALL.to_vec());

        let (_, filtered) = &sink.0[0];
        assert_eq!(filtered.columns(), scenario_table().columns());
        assert_eq!(filtered.len(), 3);

        let (_, top) = &sink.0[1];
        assert_eq!(top.columns(), SUMMARY_COLUMNS.map(String::from).as_slice());
        assert_eq!(top.len(), 1);

        let (_, summary) = &sink.0[2];
        assert_eq!(summary.len(), 2);
        assert_eq!(summary.cell(1, "player_name"), Some(&Cell::text("B")));

        let (_, detailed) = &sink.0[3];
        assert_eq!(
            detailed.columns(),
            ["player_id", "player_name", "total_minutes", "games", "pts", "mpg", "pts_pg"]
                .map(String::from)
                .as_slice()
        );
        assert_eq!(detailed.cell(0, "pts_pg"), Some(&Cell::Number(17.5)));
        assert_eq!(detailed.cell(0, "mpg"), Some(&Cell::Number(30.25)));
    }

    #[test]
    fn percentage_columns_appear_when_pairs_exist() {
        let table = Table::from_rows(
            &["id", "name", "game", "min", "fgm", "fga", "team_id"],
            vec![
                vec![Cell::Number(1.0), "A".into(), "g1".into(), "30:00".into(), Cell::Number(4.0), Cell::Number(10.0), "16".into()],
                vec![Cell::Number(2.0), "B".into(), "g1".into(), "20:00".into(), Cell::Number(0.0), Cell::Number(0.0), "16".into()],
            ],
        );
        let report = run_table(&table, &config(8)).unwrap();
        let [_, _, _, (_, detailed)] = report.result_sets();
        assert_eq!(detailed.column_index("fg_pct"), Some(9));
        assert_eq!(detailed.cell(0, "fg_pct"), Some(&Cell::Number(0.4)));
        assert_eq!(detailed.cell(1, "fg_pct"), Some(&Cell::Missing));
        assert_eq!(detailed.column_index("fg3_pct"), None);
    }
}
