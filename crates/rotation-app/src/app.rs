// One batch run: load config-resolved paths, run the engine, write outputs.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use rotation_core::{write_report, RotationReport};
use tracing::info;

use crate::config::Config;
use crate::sink::{CsvDirSink, Manifest};
use crate::source::FileSource;

/// What a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RotationReport,
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
}

/// Resolve `path` against `base_dir` unless it is already absolute.
pub fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Run the full pipeline for `config`. Relative paths in the config are
/// taken relative to `base_dir`.
pub fn run(base_dir: &Path, config: &Config) -> anyhow::Result<RunOutcome> {
    let input = resolve_path(base_dir, &config.source.path);
    let source = FileSource::new(&input);

    let report = rotation_core::run(&source, &config.rotation)
        .with_context(|| format!("rotation run failed for {}", input.display()))?;
    info!(
        "{} rows matched {} via {}",
        report.filter.rows.len(),
        config.rotation.target.name,
        report.filter.strategy.as_str()
    );

    let mut sink = CsvDirSink::new(
        resolve_path(base_dir, &config.output.dir),
        &config.output,
    );
    write_report(&report, &mut sink).context("failed to write result sets")?;

    let manifest = Manifest::build(
        &report,
        &source.path().display().to_string(),
        &config.rotation.target.name,
        &sink,
        Utc::now(),
    );
    let manifest_path = sink.dir().join(&config.output.manifest);
    manifest
        .write(&manifest_path)
        .context("failed to write run manifest")?;
    info!("wrote manifest to {}", manifest_path.display());

    Ok(RunOutcome {
        report,
        manifest,
        manifest_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_base_dir() {
        let base = Path::new("/srv/rotation");
        assert_eq!(
            resolve_path(base, "data/box.csv"),
            PathBuf::from("/srv/rotation/data/box.csv")
        );
        assert_eq!(resolve_path(base, "/tmp/box.csv"), PathBuf::from("/tmp/box.csv"));
    }
}
