// Derived metrics: per-game rates and made/attempted percentages.

use serde::Serialize;

use crate::aggregate::PlayerSummary;
use crate::config::PercentageRule;

/// Suffix appended to a counter key for its per-game rate.
pub const PER_GAME_SUFFIX: &str = "_pg";

/// Column name of minutes per game.
pub const MINUTES_PER_GAME: &str = "mpg";

/// The one division policy used for every derived value: `None` when the
/// denominator is zero or the quotient is not a finite number.
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let q = numerator / denominator;
    q.is_finite().then_some(q)
}

/// Minutes per game for a summary.
pub fn minutes_per_game(summary: &PlayerSummary) -> Option<f64> {
    ratio(summary.total_minutes, summary.games as f64)
}

/// Metrics derived from one player summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub minutes_per_game: Option<f64>,
    /// `(counter key, per-game rate)` in summary counter order.
    pub per_game: Vec<(String, Option<f64>)>,
    /// `(rule name, percentage)` for each rule with a present pair.
    pub percentages: Vec<(String, Option<f64>)>,
}

impl DerivedMetrics {
    pub fn per_game(&self, key: &str) -> Option<f64> {
        lookup(&self.per_game, key)
    }

    pub fn percentage(&self, name: &str) -> Option<f64> {
        lookup(&self.percentages, name)
    }

    /// Whether a percentage rule produced a column at all, even if its value
    /// is `None`.
    pub fn has_percentage(&self, name: &str) -> bool {
        self.percentages.iter().any(|(n, _)| n == name)
    }
}

fn lookup(values: &[(String, Option<f64>)], key: &str) -> Option<f64> {
    values.iter().find(|(k, _)| k == key).and_then(|(_, v)| *v)
}

/// Derive per-game and percentage metrics for `summary`. Pure.
pub fn derive(summary: &PlayerSummary, rules: &[PercentageRule]) -> DerivedMetrics {
    let games = summary.games as f64;
    let per_game = summary
        .counters
        .iter()
        .map(|(key, total)| (key.clone(), ratio(*total, games)))
        .collect();

    let percentages = rules
        .iter()
        .filter_map(|rule| {
            rule.pairs.iter().find_map(|[made, attempted]| {
                let made = summary.counter(made)?;
                let attempted = summary.counter(attempted)?;
                Some((rule.name.clone(), ratio(made, attempted)))
            })
        })
        .collect();

    DerivedMetrics {
        minutes_per_game: minutes_per_game(summary),
        per_game,
        percentages,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
