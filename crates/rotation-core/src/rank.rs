// Ranking: stable descending sort by a chosen metric, truncated to the top N.

use std::cmp::Ordering;
use std::fmt;

use crate::aggregate::PlayerSummary;
use crate::error::RotationError;
use crate::metrics::{minutes_per_game, ratio, MINUTES_PER_GAME, PER_GAME_SUFFIX};
use crate::schema::FieldMap;

/// The metric summaries are ordered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankKey {
    TotalMinutes,
    Games,
    MinutesPerGame,
    Counter(String),
    CounterPerGame(String),
}

impl RankKey {
    /// Parse a configured key against the counters this run discovered.
    pub fn parse(key: &str, fields: &FieldMap) -> Result<Self, RotationError> {
        let key = key.trim();
        let parsed = match key {
            "total_minutes" => Some(RankKey::TotalMinutes),
            "games" => Some(RankKey::Games),
            MINUTES_PER_GAME => Some(RankKey::MinutesPerGame),
            _ if fields.has_counter(key) => Some(RankKey::Counter(key.to_string())),
            _ => key
                .strip_suffix(PER_GAME_SUFFIX)
                .filter(|base| fields.has_counter(base))
                .map(|base| RankKey::CounterPerGame(base.to_string())),
        };
        parsed.ok_or_else(|| RotationError::InvalidRankKey {
            key: key.to_string(),
            available: available_keys(fields),
        })
    }

    /// Value of this key for one summary; `None` sorts last.
    pub fn value(&self, summary: &PlayerSummary) -> Option<f64> {
        match self {
            RankKey::TotalMinutes => Some(summary.total_minutes),
            RankKey::Games => Some(summary.games as f64),
            RankKey::MinutesPerGame => minutes_per_game(summary),
            RankKey::Counter(key) => summary.counter(key),
            RankKey::CounterPerGame(key) => summary
                .counter(key)
                .and_then(|total| ratio(total, summary.games as f64)),
        }
    }
}

impl fmt::Display for RankKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankKey::TotalMinutes => f.write_str("total_minutes"),
            RankKey::Games => f.write_str("games"),
            RankKey::MinutesPerGame => f.write_str(MINUTES_PER_GAME),
            RankKey::Counter(key) => f.write_str(key),
            RankKey::CounterPerGame(key) => write!(f, "{key}{PER_GAME_SUFFIX}"),
        }
    }
}

fn available_keys(fields: &FieldMap) -> Vec<String> {
    let mut keys = vec![
        "total_minutes".to_string(),
        "games".to_string(),
        MINUTES_PER_GAME.to_string(),
    ];
    for key in fields.counter_keys() {
        keys.push(key.to_string());
        keys.push(format!("{key}{PER_GAME_SUFFIX}"));
    }
    keys
}

/// Full ordering plus the top-N prefix.
#[derive(Debug, Clone)]
pub struct Ranking {
    pub key: RankKey,
    pub ordered: Vec<PlayerSummary>,
    pub top_n: usize,
}

impl Ranking {
    /// The first `min(top_n, len)` entries of the full order.
    pub fn top(&self) -> &[PlayerSummary] {
        &self.ordered[..self.top_n.min(self.ordered.len())]
    }
}

/// Sort `summaries` descending by `key` and keep the top `top_n`.
///
/// The sort is stable: ties keep their input order. Missing values sort after
/// every present value.
pub fn rank(summaries: &[PlayerSummary], key: RankKey, top_n: usize) -> Ranking {
    let mut ordered = summaries.to_vec();
    ordered.sort_by(|a, b| descending(key.value(a), key.value(b)));
    Ranking {
        key,
        ordered,
        top_n,
    }
}

fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a.filter(|v| !v.is_nan()), b.filter(|v| !v.is_nan())) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
