// Configuration loading and parsing (config/rotation.toml).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rotation_core::config::{
    default_counters, default_percentages, CounterSpec, FieldAliases, PercentageRule,
    RankingConfig, TargetEntity,
};
use rotation_core::RotationConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// File name of the run configuration inside `config/`.
pub const CONFIG_FILE: &str = "rotation.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub rotation: RotationConfig,
}

// ---------------------------------------------------------------------------
// rotation.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire rotation.toml file.
#[derive(Debug, Clone, Deserialize)]
struct RotationFile {
    source: SourceConfig,
    #[serde(default)]
    output: OutputConfig,
    target: TargetEntity,
    #[serde(default)]
    ranking: RankingConfig,
    #[serde(default)]
    fields: FieldAliases,
    #[serde(default = "default_counters")]
    counters: Vec<CounterSpec>,
    #[serde(default = "default_percentages")]
    percentages: Vec<PercentageRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub path: String,
}

/// Output directory and the file name of each result set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub filtered_rows: String,
    pub top_n: String,
    pub summary: String,
    pub detailed: String,
    pub manifest: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "data/processed".into(),
            filtered_rows: "player_box_filtered.csv".into(),
            top_n: "rotation_top_n.csv".into(),
            summary: "player_summary.csv".into(),
            detailed: "rotation_detailed_stats.csv".into(),
            manifest: "rotation_manifest.json".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Command-line values that replace file settings before validation.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input: Option<String>,
    pub output_dir: Option<String>,
    pub top_n: Option<usize>,
    pub rank_by: Option<String>,
}

impl Config {
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(input) = &overrides.input {
            self.source.path = input.clone();
        }
        if let Some(dir) = &overrides.output_dir {
            self.output.dir = dir.clone();
        }
        if let Some(n) = overrides.top_n {
            self.rotation.ranking.top_n = n;
        }
        if let Some(key) = &overrides.rank_by {
            self.rotation.ranking.key = key.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse a rotation.toml document. Does not validate.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: RotationFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Config {
        source: file.source,
        output: file.output,
        rotation: RotationConfig {
            target: file.target,
            ranking: file.ranking,
            fields: file.fields,
            counters: file.counters,
            percentages: file.percentages,
        },
    })
}

/// Load `config/rotation.toml` relative to `base_dir`, apply `overrides`,
/// then validate.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path, overrides: &Overrides) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let mut config = parse_config(&text, &path)?;
    config.apply(overrides);
    validate(&config)?;
    Ok(config)
}

/// Seed `config/` from `defaults/`: every default file without a counterpart
/// in `config/` is copied; existing files are never touched and `.example`
/// files are skipped. Returns the paths written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        return if config_dir.is_dir() {
            Ok(Vec::new())
        } else {
            Err(seed_error(format!(
                "neither defaults/ nor config/ directory found in {}; \
                 run from the project root or pass --base-dir",
                base_dir.display()
            )))
        };
    }

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| seed_error(format!("cannot create {}: {e}", config_dir.display())))?;

    let entries = std::fs::read_dir(&defaults_dir)
        .map_err(|e| seed_error(format!("cannot list {}: {e}", defaults_dir.display())))?;

    let mut seeded = Vec::new();
    for entry in entries {
        let src = entry
            .map_err(|e| seed_error(format!("cannot list {}: {e}", defaults_dir.display())))?
            .path();
        let Some(name) = src.file_name().filter(|_| src.is_file()) else {
            continue;
        };
        if name.to_string_lossy().ends_with(".example") {
            continue;
        }
        let dest = config_dir.join(name);
        if seed_file(&src, &dest)? {
            info!("seeded {} from {}", dest.display(), src.display());
            seeded.push(dest);
        }
    }
    Ok(seeded)
}

/// Copy `src` to `dest` unless `dest` already exists. `create_new` makes the
/// existence check and the creation one step.
fn seed_file(src: &Path, dest: &Path) -> Result<bool, ConfigError> {
    let mut out = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(seed_error(format!("cannot create {}: {e}", dest.display()))),
    };
    let mut input = std::fs::File::open(src)
        .map_err(|e| seed_error(format!("cannot read {}: {e}", src.display())))?;
    std::io::copy(&mut input, &mut out)
        .map_err(|e| seed_error(format!("cannot write {}: {e}", dest.display())))?;
    Ok(true)
}

fn seed_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

/// Convenience wrapper: copies defaults if needed, then loads from `base_dir`.
pub fn load_config(base_dir: &Path, overrides: &Overrides) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir, overrides)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.source.path.trim().is_empty() {
        return Err(invalid("source.path", "must not be empty"));
    }
    if config.output.dir.trim().is_empty() {
        return Err(invalid("output.dir", "must not be empty"));
    }

    let rotation = &config.rotation;
    if rotation.ranking.top_n == 0 {
        return Err(invalid("ranking.top_n", "must be greater than 0"));
    }
    if rotation.ranking.key.trim().is_empty() {
        return Err(invalid("ranking.key", "must not be empty"));
    }
    if !rotation.target.has_any_matcher() {
        return Err(invalid(
            "target",
            "at least one of ids, display_names, keywords, abbreviations is required",
        ));
    }

    let f = &rotation.fields;
    let alias_lists: &[(&str, &Vec<String>)] = &[
        ("fields.player_id", &f.player_id),
        ("fields.player_name", &f.player_name),
        ("fields.time_played", &f.time_played),
        ("fields.game_id", &f.game_id),
    ];
    for (name, list) in alias_lists {
        if list.is_empty() {
            return Err(invalid(*name, "must list at least one alias"));
        }
    }

    let mut keys = HashSet::new();
    for counter in &rotation.counters {
        if counter.aliases.is_empty() {
            return Err(invalid(
                format!("counters.{}", counter.key),
                "must list at least one alias",
            ));
        }
        if !keys.insert(counter.key.as_str()) {
            return Err(invalid(
                format!("counters.{}", counter.key),
                "duplicate counter key",
            ));
        }
    }

    for rule in &rotation.percentages {
        if rule.pairs.is_empty() {
            return Err(invalid(
                format!("percentages.{}", rule.name),
                "must list at least one [made, attempted] pair",
            ));
        }
        for [made, attempted] in &rule.pairs {
            for key in [made, attempted] {
                if !keys.contains(key.as_str()) {
                    return Err(invalid(
                        format!("percentages.{}", rule.name),
                        format!("references unknown counter `{key}`"),
                    ));
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
