use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ratemeter::config::RatemeterConfig;
use ratemeter::load::LoadGenerator;
use ratemeter::registry::MeterRegistry;
use ratemeter::report::Reporter;

/// Drive synthetic workloads through decaying rate meters and report them as JSON.
#[derive(Debug, Parser)]
#[command(name = "ratemeter", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds between reports (overrides the configuration)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Pretty-print reports
    #[arg(long)]
    pretty: bool,

    /// Stop after this many seconds instead of waiting for a signal
    #[arg(short, long)]
    duration: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    info!("Starting ratemeter");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => RatemeterConfig::from_file(path)?,
        None => RatemeterConfig::default(),
    };
    if let Some(interval) = args.interval {
        config.reporter.interval_secs = interval;
    }
    if args.pretty {
        config.reporter.pretty = true;
    }
    config.validate()?;
    info!(
        workloads = config.workloads.len(),
        interval_secs = config.reporter.interval_secs,
        "Configuration loaded"
    );

    let registry = Arc::new(MeterRegistry::new());
    let mut generator = LoadGenerator::start(registry.as_ref(), &config.workloads)?;
    info!(workers = generator.worker_count(), "Load generator running");

    let reporter = Reporter::new(Arc::clone(&registry), config.reporter.clone());
    let result = reporter.run_until(stop_condition(args.duration)).await;

    generator.stop();
    result?;

    info!("ratemeter stopped");
    Ok(())
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Reports own stdout; logs go to stderr.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolve after `duration` seconds, or on a shutdown signal.
async fn stop_condition(duration: Option<u64>) {
    match duration {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    info!(secs, "Run duration elapsed");
                }
                _ = shutdown_signal() => {}
            }
        }
        None => shutdown_signal().await,
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
