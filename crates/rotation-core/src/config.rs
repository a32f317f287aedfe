// Run configuration: target entity, alias tables, counters and ranking knobs.
//
// Every piece is plain data passed into `pipeline::run`; nothing here is
// process-global.

use serde::Deserialize;

/// Default number of players kept in the rotation.
pub const DEFAULT_TOP_N: usize = 8;

/// Default rank key.
pub const DEFAULT_RANK_KEY: &str = "total_minutes";

// ---------------------------------------------------------------------------
// Top-level run configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RotationConfig {
    pub target: TargetEntity,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub fields: FieldAliases,
    #[serde(default = "default_counters")]
    pub counters: Vec<CounterSpec>,
    #[serde(default = "default_percentages")]
    pub percentages: Vec<PercentageRule>,
}

impl RotationConfig {
    /// Configuration for `target` with every other section at its default.
    pub fn for_target(target: TargetEntity) -> Self {
        Self {
            target,
            ranking: RankingConfig::default(),
            fields: FieldAliases::default(),
            counters: default_counters(),
            percentages: default_percentages(),
        }
    }
}

// ---------------------------------------------------------------------------
// Target entity
// ---------------------------------------------------------------------------

/// The team to keep. Each list feeds one filter strategy; an empty list
/// skips that strategy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetEntity {
    pub name: String,
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub display_names: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub abbreviations: Vec<String>,
}

impl TargetEntity {
    pub fn has_any_matcher(&self) -> bool {
        !(self.ids.is_empty()
            && self.display_names.is_empty()
            && self.keywords.is_empty()
            && self.abbreviations.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// How rows are grouped into player summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// One summary per (id, name) pair.
    #[default]
    IdAndName,
    /// One summary per id, labelled with the most frequent name.
    Id,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_rank_key")]
    pub key: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default)]
    pub group_by: GroupBy,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            key: default_rank_key(),
            top_n: default_top_n(),
            group_by: GroupBy::default(),
        }
    }
}

fn default_rank_key() -> String {
    DEFAULT_RANK_KEY.to_string()
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

// ---------------------------------------------------------------------------
// Field aliases
// ---------------------------------------------------------------------------

/// Ordered alias lists per logical role. The first alias present in the
/// dataset wins.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldAliases {
    pub player_id: Vec<String>,
    pub player_name: Vec<String>,
    pub time_played: Vec<String>,
    pub game_id: Vec<String>,
    pub team_id: Vec<String>,
    pub team_name: Vec<String>,
    pub team_abbreviation: Vec<String>,
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self {
            player_id: strings(&["athlete_id", "player_id", "id"]),
            player_name: strings(&["athlete_display_name", "player_name", "name"]),
            time_played: strings(&["minutes", "min", "mp"]),
            game_id: strings(&["game_id", "game", "gameid"]),
            team_id: strings(&["team_id"]),
            team_name: strings(&["team_display_name", "team_name", "team"]),
            team_abbreviation: strings(&["team_abbreviation", "team_abbr"]),
        }
    }
}

// ---------------------------------------------------------------------------
// Counters and percentages
// ---------------------------------------------------------------------------

/// A summable statistic. `key` is the output column name; `aliases` are the
/// source spellings tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CounterSpec {
    pub key: String,
    pub aliases: Vec<String>,
}

impl CounterSpec {
    pub fn new(key: &str, aliases: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            aliases: strings(aliases),
        }
    }
}

/// A made/attempted ratio. `pairs` lists `[made, attempted]` counter keys;
/// the first pair with both counters present is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PercentageRule {
    pub name: String,
    pub pairs: Vec<[String; 2]>,
}

impl PercentageRule {
    pub fn new(name: &str, pairs: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            pairs: pairs
                .iter()
                .map(|(made, att)| [made.to_string(), att.to_string()])
                .collect(),
        }
    }
}

pub fn default_counters() -> Vec<CounterSpec> {
    vec![
        CounterSpec::new("fgm", &["field_goals_made", "fgm", "fg"]),
        CounterSpec::new("fga", &["field_goals_attempted", "fga"]),
        CounterSpec::new("fg3m", &["three_point_field_goals_made", "fg3m", "3p"]),
        CounterSpec::new("fg3a", &["three_point_field_goals_attempted", "fg3a", "3pa"]),
        CounterSpec::new("ftm", &["free_throws_made", "ftm", "ft"]),
        CounterSpec::new("fta", &["free_throws_attempted", "fta"]),
        CounterSpec::new("pts", &["points", "pts"]),
        CounterSpec::new("ast", &["assists", "ast"]),
        CounterSpec::new("reb", &["rebounds", "reb", "trb"]),
        CounterSpec::new("oreb", &["offensive_rebounds", "orb", "oreb"]),
        CounterSpec::new("dreb", &["defensive_rebounds", "drb", "dreb"]),
        CounterSpec::new("stl", &["steals", "stl"]),
        CounterSpec::new("blk", &["blocks", "blk"]),
        CounterSpec::new("tov", &["turnovers", "tov", "to"]),
    ]
}

pub fn default_percentages() -> Vec<PercentageRule> {
    vec![
        PercentageRule::new("fg_pct", &[("fgm", "fga")]),
        PercentageRule::new("fg3_pct", &[("fg3m", "fg3a")]),
        PercentageRule::new("ft_pct", &[("ftm", "fta")]),
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
