//! Pulsetrail Replay - feeds recorded interaction signals to a tracker.
//!
//! This binary reads JSON-lines host signals and forwards them to the
//! ingestion service through a [`Tracker`], exactly as an embedding host
//! would.
//!
//! # Commands
//!
//! - `pulsetrail-replay run`: Replay signals from a file or stdin
//! - `pulsetrail-replay config`: Print the effective configuration
//!
//! # Environment Variables
//!
//! See the [`config`](pulsetrail_tracker::config) module for available
//! configuration options.

use std::future::pending;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pulsetrail_tracker::config::TrackerConfig;
use pulsetrail_tracker::replay::replay_lines;
use pulsetrail_tracker::sender::{
    HttpTransport, MemoryTransport, Transport, DEFAULT_REQUEST_TIMEOUT,
};
use pulsetrail_tracker::tracker::Tracker;

/// Pulsetrail Replay - interaction telemetry replay.
///
/// Reads one interaction signal per line and delivers the resulting events
/// to the configured ingestion endpoint.
#[derive(Parser, Debug)]
#[command(name = "pulsetrail-replay")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    PULSETRAIL_ENDPOINT             Ingestion base URL (required)
    PULSETRAIL_SOURCE_ID            Client identifier (default: hostname)
    PULSETRAIL_ORIGIN               Origin of the observed application
    PULSETRAIL_BATCH_SIZE           Events per batch (default: 10)
    PULSETRAIL_FLUSH_INTERVAL_MS    Periodic flush interval (default: 5000)
    PULSETRAIL_TRACK_HOVER          Capture debounced hovers (default: false)
    PULSETRAIL_TRACK_MOUSE_PATH     Capture sampled pointer movement (default: false)

EXAMPLES:
    # Replay a recorded session
    export PULSETRAIL_ENDPOINT=https://app.example.com/api/events
    pulsetrail-replay run --input session.jsonl

    # Pipe signals from another process, without sending anything
    record-host | pulsetrail-replay run --dry-run
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Replay signals into a tracker.
    ///
    /// Teardown runs at end of input or on SIGINT/SIGTERM.
    Run {
        /// JSON-lines file to read (default: stdin).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Record requests in memory instead of sending them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the configuration loaded from the environment.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Config => run_config(),
        Command::Run { input, dry_run } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;

            runtime.block_on(run_replay(input, dry_run))
        }
    }
}

/// Prints the effective configuration.
fn run_config() -> Result<()> {
    let config = TrackerConfig::from_env().context("Failed to load configuration")?;

    println!("endpoint:               {}", config.endpoint);
    println!("source_id:              {}", config.source_id);
    println!(
        "origin:                 {}",
        config.origin.as_ref().map_or("-", |o| o.as_str())
    );
    println!("initial_page:           {}", config.initial_page);
    println!("track_all_clicks:       {}", config.track_all_clicks);
    println!("track_right_clicks:     {}", config.track_right_clicks);
    println!("track_double_clicks:    {}", config.track_double_clicks);
    println!("track_hover:            {}", config.track_hover);
    println!("track_mouse_path:       {}", config.track_mouse_path);
    println!("batch_size:             {}", config.batch_size);
    println!("flush_interval:         {:?}", config.flush_interval);
    println!("idle_threshold:         {:?}", config.idle_threshold);
    println!("hover_debounce:         {:?}", config.hover_debounce);
    println!("mouse_path_sample_rate: {:?}", config.mouse_path_sample_rate);
    println!("teardown_timeout:       {:?}", config.teardown_timeout);
    Ok(())
}

/// Replays signals until end of input or a shutdown signal.
async fn run_replay(input: Option<PathBuf>, dry_run: bool) -> Result<()> {
    init_logging();

    let config = TrackerConfig::from_env().context("Failed to load configuration")?;

    info!(
        endpoint = %config.endpoint,
        source_id = %config.source_id,
        batch_size = config.batch_size,
        dry_run,
        "Configuration loaded"
    );

    let memory = MemoryTransport::new();
    let transport: Arc<dyn Transport> = if dry_run {
        Arc::new(memory.clone())
    } else {
        Arc::new(
            HttpTransport::new(&config.endpoint, &config.source_id, DEFAULT_REQUEST_TIMEOUT)
                .context("Failed to create HTTP transport")?,
        )
    };

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &input {
        Some(path) => {
            let file = File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let tracker = Tracker::start(config, transport).context("Failed to start tracker")?;

    info!("Replaying signals. Press Ctrl+C to stop.");

    tokio::select! {
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received");
        }

        result = replay_lines(reader, &tracker) => {
            let stats = result.context("Failed to read input")?;
            info!(
                lines = stats.lines,
                dispatched = stats.dispatched,
                dropped = stats.dropped,
                malformed = stats.malformed,
                "End of input"
            );
        }
    }

    info!("Shutting down...");
    tracker
        .shutdown()
        .await
        .context("Tracker did not shut down cleanly")?;

    if dry_run {
        for request in memory.requests() {
            println!("{} {}", request.endpoint, request.body);
        }
    }

    info!("Replay finished");
    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
