//! Trackwire Replay: runs a recorded page scenario through the tracking
//! pipeline and prints every collector call as a JSON line.
//!
//! The scenario runs on a virtual clock unless `--realtime` is given, so a
//! page that waits out the full readiness schedule replays instantly.

mod output;
mod runner;
mod scenario;

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use trackwire_core::config::merge_options;
use trackwire_core::EffectiveConfig;
use trackwire_web_sdk::registry::DEFAULT_GRACE_PERIOD;

use output::JsonLinesCollector;
use runner::Summary;
use scenario::Scenario;

#[derive(Parser, Debug)]
#[command(name = "trackwire-replay")]
#[command(about = "Replay a recorded page scenario through the analytics tracker")]
#[command(version)]
struct Cli {
    /// Scenario file (JSON)
    scenario: PathBuf,

    /// Tracker overrides file (TOML, JSON or YAML)
    #[arg(long, env = "TRACKWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Grace window for page-supplied configuration, in milliseconds
    #[arg(long, default_value_t = DEFAULT_GRACE_PERIOD.as_millis() as u64)]
    grace_ms: u64,

    /// Wait on the wall clock instead of a virtual one
    #[arg(long, default_value_t = false)]
    realtime: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    delivered: usize,
    #[serde(flatten)]
    summary: &'a Summary,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the track lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trackwire=info".into()),
        )
        .with_writer(io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(!cli.realtime)
        .build()?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let scenario = Scenario::load(&cli.scenario)?;

    let file_overrides = EffectiveConfig::load_overrides(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load overrides, using scenario config only");
        serde_json::Value::Null
    });
    let overrides = merge_options(&file_overrides, &scenario.config);

    info!(
        scenario = %cli.scenario.display(),
        location = %scenario.location,
        steps = scenario.steps.len(),
        grace_ms = cli.grace_ms,
        "Replaying scenario"
    );

    let collector: Arc<JsonLinesCollector<Stdout>> = Arc::new(JsonLinesCollector::new(io::stdout()));
    let summary = runner::replay(
        &scenario,
        overrides,
        Duration::from_millis(cli.grace_ms),
        collector.clone(),
    )
    .await?;

    collector.write_line(&Report {
        delivered: collector.delivered(),
        summary: &summary,
    })?;
    Ok(())
}
