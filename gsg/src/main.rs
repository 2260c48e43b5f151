mod viewer;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use gsg_core::{bootstrap::load_config, logging, source::http_source, Config, MultiStreamSession};

#[derive(Parser, Debug)]
#[command(name = "gsg")]
#[command(about = "GSG multi-stream viewer", long_about = None)]
struct Args {
    /// Config file path (falls back to GSG_CONFIG_PATH, then ./config.yaml)
    #[arg(long, short)]
    config: Option<String>,

    /// Poll once, print the grid and exit
    #[arg(long)]
    once: bool,

    /// Read the dev deployment instead of prod
    #[arg(long)]
    dev: bool,

    /// Use the built-in test stream list instead of the network
    #[arg(long)]
    test_mode: bool,

    /// Viewport width override
    #[arg(long)]
    width: Option<f64>,

    /// Viewport height override
    #[arg(long)]
    height: Option<f64>,
}

/// Layer command-line flags over the loaded config and re-check it
fn apply_overrides(config: &mut Config, args: &Args) -> Result<()> {
    config.api.use_dev_api |= args.dev;
    config.streams.test_mode |= args.test_mode;
    if let Some(width) = args.width {
        config.layout.viewport_width = width;
    }
    if let Some(height) = args.height {
        config.layout.viewport_height = height;
    }

    config
        .validate()
        .map_err(|errors| anyhow::anyhow!("Invalid command-line overrides: {}", errors.join("; ")))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration, CLI flags on top
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("GSG multi-stream viewer starting...");
    info!("Stream feed: {}", config.api.active_base_url());
    info!("Event service: {}", config.api.active_event_base_url());

    // 3. Build the session
    let source = Arc::new(http_source(&config.api)?);
    let session = Arc::new(MultiStreamSession::new(&config, source)?);

    if args.once {
        let outcome = session.poll().await;
        info!(?outcome, "Single poll finished");
        viewer::report(&session);
        return Ok(());
    }

    // 4. Poll and report until Ctrl-C
    let cancel = CancellationToken::new();
    let poller = tokio::spawn(Arc::clone(&session).run(cancel.clone()));
    let reporter = tokio::spawn(viewer::run(
        Arc::clone(&session),
        config.polling.stream_interval(),
        cancel.clone(),
    ));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down...");
    cancel.cancel();

    let (poller, reporter) = tokio::join!(poller, reporter);
    if let Err(e) = poller.and(reporter) {
        error!("Background task failed: {}", e);
    }

    Ok(())
}
