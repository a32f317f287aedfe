// Rotation report entry point.
//
// Startup sequence:
// 1. Parse command-line arguments
// 2. Initialize tracing (stderr)
// 3. Load config, copying defaults on first run
// 4. Run the pipeline and write result sets plus the manifest

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use rotation_app::app;
use rotation_app::config::{self, Overrides};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding `defaults/` and `config/`; relative paths resolve here.
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Box-score file (.csv or .parquet), replacing `source.path`.
    #[arg(long)]
    input: Option<String>,

    /// Output directory, replacing `output.dir`.
    #[arg(long)]
    output_dir: Option<String>,

    /// Number of players in the rotation, replacing `ranking.top_n`.
    #[arg(long)]
    top_n: Option<usize>,

    /// Rank key, replacing `ranking.key`.
    #[arg(long)]
    rank_by: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing()?;
    info!("rotation report starting");

    let overrides = Overrides {
        input: cli.input,
        output_dir: cli.output_dir,
        top_n: cli.top_n,
        rank_by: cli.rank_by,
    };
    let config = config::load_config(&cli.base_dir, &overrides)
        .context("failed to load configuration")?;
    info!(
        "config loaded: target={}, top {} by {}",
        config.rotation.target.name, config.rotation.ranking.top_n, config.rotation.ranking.key
    );

    let outcome = app::run(&cli.base_dir, &config)?;
    info!(
        "done: {} players summarized, top {} written",
        outcome.report.ranking.ordered.len(),
        outcome.report.top().len()
    );
    Ok(())
}

/// Initialize tracing to stderr; stdout stays free for piping.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rotation_app=info,rotation_core=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
