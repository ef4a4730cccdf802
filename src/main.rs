// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/airbarn-rs

//! Airbarn - Home Weather & Air Quality Station
//!
//! Station daemon: detects the platform, wires all components from
//! settings, supervises their update loops and shuts them down
//! deterministically on Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use airbarn::{Config, ComponentRegistry, RuntimeSystem, Settings, VERSION};

const WATCHDOG_INTERVAL: Duration = Duration::from_secs(5);

/// Airbarn - Home Weather & Air Quality Station
#[derive(Parser, Debug)]
#[command(name = "airbarn")]
#[command(author = "Airbarn Project")]
#[command(version = VERSION)]
#[command(about = "Home weather and air quality station for Raspberry Pi")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Demo mode with simulated sensors
    #[arg(long)]
    demo: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Airbarn v{} - Home Weather & Air Quality Station", VERSION);

    // Load or create configuration
    let config_path = args.config.unwrap_or_else(Config::default_path);
    let settings = Settings::load_or_create(&config_path)?;
    let demo = args.demo || settings.read().demo_mode;
    info!("Configuration loaded from {:?}", config_path);
    info!("Demo mode: {}", demo);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(settings, demo))
}

/// Bring the station up, supervise it, and tear it down on Ctrl+C.
async fn run(settings: Arc<Settings>, demo: bool) -> Result<()> {
    let runtime = Arc::new(RuntimeSystem::detect(demo));
    info!("Platform: {}", runtime.platform_name());

    let registry = ComponentRegistry::new(settings, runtime)?;
    registry.start_all();

    info!("🚀 Airbarn running - press Ctrl+C to shut down");

    let mut watchdog = tokio::time::interval(WATCHDOG_INTERVAL);
    watchdog.tick().await; // first tick is immediate
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = watchdog.tick() => registry.restart_dead(),
        }
    }

    info!("Shutdown signal received, stopping components...");
    registry.stop_all().await;
    info!("Airbarn shutdown complete");

    Ok(())
}
