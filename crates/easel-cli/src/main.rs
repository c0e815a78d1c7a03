mod demo;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use easel_core::observability::init_tracing;
use easel_core::{ConfigError, WorkerBuilder, WorkerConfig};
use tracing::{info, warn};

/// Demo runs poll faster than the production default.
const DEMO_POLL_INTERVAL_MS: u64 = 250;

/// Runs the Easel worker against an in-memory demo world until every
/// seeded task is completed or failed, then prints the task records.
#[derive(Parser)]
#[command(name = "easel-worker", version, about = "Generative image task worker (demo mode)")]
struct Cli {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `concurrency`
    #[arg(long)]
    concurrency: Option<usize>,

    /// Override `rate_limit_per_second`
    #[arg(long)]
    rate_limit: Option<f64>,

    /// Override `poll_interval_ms` (demo default 250 unless the file or env sets it)
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Number of tasks to seed (one extra, deliberately broken task is always added)
    #[arg(long, default_value_t = 6)]
    demo_tasks: usize,
}

/// Demo defaults, then the config file, then the environment, then flags.
fn resolve_config(cli: &Cli) -> Result<WorkerConfig, ConfigError> {
    let demo_defaults = WorkerConfig {
        poll_interval_ms: DEMO_POLL_INTERVAL_MS,
        ..WorkerConfig::default()
    };
    let mut config = WorkerConfig::load_over(demo_defaults, cli.config.as_deref())?;
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(rate) = cli.rate_limit {
        config.rate_limit_per_second = rate;
    }
    if let Some(ms) = cli.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = resolve_config(&cli)?;
    init_tracing(&config.log_level);

    let world = demo::seed(cli.demo_tasks, &config.asset_bucket);
    let worker = WorkerBuilder::new(config)
        .task_store(world.store.clone())
        .asset_store(world.assets.clone())
        .provider(Arc::new(demo::DemoProvider::default()))
        .title_generator(Arc::new(demo::DemoTitles))
        .canvas(world.canvas.clone())
        .build()?;

    info!(tasks = world.store.counts().total(), "demo world seeded");
    worker.start();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                warn!("interrupted; shutting down");
                break;
            }
            _ = ticker.tick() => {
                if world.store.counts().is_settled() {
                    break;
                }
            }
        }
    }
    worker.shutdown().await;

    let report = serde_json::json!({
        "status": worker.status(),
        "counts": world.store.counts(),
        "tasks": world.store.tasks(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
