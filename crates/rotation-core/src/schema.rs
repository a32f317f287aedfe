// Schema discovery: map logical roles onto the field names a dataset uses.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{CounterSpec, FieldAliases};
use crate::error::RotationError;

/// A counter whose source field was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCounter {
    pub key: String,
    pub field: String,
}

/// The canonical field set for one run. Built once by [`resolve`] and then
/// read by every later stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMap {
    pub player_id: String,
    pub player_name: String,
    pub time_played: String,
    pub game_id: String,
    pub team_id: Option<String>,
    pub team_name: Option<String>,
    pub team_abbreviation: Option<String>,
    /// Discovered counters, in configuration order.
    pub counters: Vec<ResolvedCounter>,
}

impl FieldMap {
    pub fn counter_keys(&self) -> impl Iterator<Item = &str> {
        self.counters.iter().map(|c| c.key.as_str())
    }

    pub fn has_counter(&self, key: &str) -> bool {
        self.counters.iter().any(|c| c.key == key)
    }
}

/// Return the first alias present in `available`, if any.
pub fn resolve_field(available: &[String], aliases: &[String]) -> Option<String> {
    aliases
        .iter()
        .find(|alias| available.iter().any(|field| field == *alias))
        .cloned()
}

/// Resolve every role against the dataset's field names.
///
/// Fails with `MissingRequiredField` listing every required role that could
/// not be resolved. Unresolved counters and team fields are dropped silently.
pub fn resolve(
    available: &[String],
    aliases: &FieldAliases,
    counters: &[CounterSpec],
) -> Result<FieldMap, RotationError> {
    let player_id = resolve_field(available, &aliases.player_id);
    let player_name = resolve_field(available, &aliases.player_name);
    let time_played = resolve_field(available, &aliases.time_played);
    let game_id = resolve_field(available, &aliases.game_id);

    let (Some(player_id), Some(player_name), Some(time_played), Some(game_id)) =
        (&player_id, &player_name, &time_played, &game_id)
    else {
        let roles = [
            ("player_id", &player_id),
            ("player_name", &player_name),
            ("time_played", &time_played),
            ("game_id", &game_id),
        ]
        .into_iter()
        .filter(|(_, field)| field.is_none())
        .map(|(role, _)| role.to_string())
        .collect();
        return Err(RotationError::MissingRequiredField {
            roles,
            available: available.to_vec(),
        });
    };

    let mut resolved_counters = Vec::new();
    let mut claimed: HashMap<String, String> = HashMap::new();
    for spec in counters {
        let Some(field) = resolve_field(available, &spec.aliases) else {
            debug!("counter `{}` not present in dataset, skipping", spec.key);
            continue;
        };
        if let Some(other) = claimed.get(&field) {
            warn!(
                "counters `{}` and `{}` both read field `{}`",
                other, spec.key, field
            );
        }
        claimed.insert(field.clone(), spec.key.clone());
        resolved_counters.push(ResolvedCounter {
            key: spec.key.clone(),
            field,
        });
    }

    Ok(FieldMap {
        player_id: player_id.clone(),
        player_name: player_name.clone(),
        time_played: time_played.clone(),
        game_id: game_id.clone(),
        team_id: resolve_field(available, &aliases.team_id),
        team_name: resolve_field(available, &aliases.team_name),
        team_abbreviation: resolve_field(available, &aliases.team_abbreviation),
        counters: resolved_counters,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_counters;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_alias_in_priority_order_wins() {
        let available = cols(&["id", "player_id"]);
        let aliases = cols(&["athlete_id", "player_id", "id"]);
        assert_eq!(resolve_field(&available, &aliases).as_deref(), Some("player_id"));
    }

    #[test]
    fn no_alias_present_is_none() {
        assert_eq!(resolve_field(&cols(&["x"]), &cols(&["a", "b"])), None);
    }

    #[test]
    fn wehoop_layout_resolves() {
        let available = cols(&[
            "game_id",
            "athlete_id",
            "athlete_display_name",
            "team_id",
            "team_display_name",
            "team_abbreviation",
            "minutes",
            "points",
            "field_goals_made",
            "field_goals_attempted",
        ]);
        let map = resolve(&available, &FieldAliases::default(), &default_counters()).unwrap();
        assert_eq!(map.player_id, "athlete_id");
        assert_eq!(map.player_name, "athlete_display_name");
        assert_eq!(map.time_played, "minutes");
        assert_eq!(map.game_id, "game_id");
        assert_eq!(map.team_id.as_deref(), Some("team_id"));
        assert_eq!(map.team_abbreviation.as_deref(), Some("team_abbreviation"));
        let keys: Vec<&str> = map.counter_keys().collect();
        assert_eq!(keys, vec!["fgm", "fga", "pts"]);
        assert!(map.has_counter("pts"));
        assert!(!map.has_counter("ast"));
    }

    #[test]
    fn missing_required_roles_are_all_reported() {
        let available = cols(&["player_id", "pts"]);
        let err = resolve(&available, &FieldAliases::default(), &default_counters()).unwrap_err();
        match err {
            RotationError::MissingRequiredField { roles, available } => {
                assert_eq!(roles, vec!["player_name", "time_played", "game_id"]);
                assert_eq!(available, vec!["player_id", "pts"]);
            }
            other => panic!("expected MissingRequiredField, got: {other}"),
        }
    }

    #[test]
    fn team_fields_are_optional() {
        let available = cols(&["id", "name", "min", "game_id"]);
        let map = resolve(&available, &FieldAliases::default(), &[]).unwrap();
        assert!(map.team_id.is_none());
        assert!(map.team_name.is_none());
        assert!(map.counters.is_empty());
    }
}
