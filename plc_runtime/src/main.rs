//! # PLC Runtime Service Binary
//!
//! Hosts a `RuntimeController` for one working directory. A remote
//! transport embedding the library drives install/start/stop/sampling;
//! this binary restores the persisted image, optionally starts it, and
//! stops it cleanly on shutdown.
//!
//! # Usage
//!
//! ```bash
//! # Run from a config file
//! plc_runtime --config /etc/plc_runtime/runtime.toml
//!
//! # Start the persisted image right away, with debug sampling resumed
//! plc_runtime --working-dir /var/lib/plc --autostart --debug
//!
//! # Pass extra arguments to the control program
//! plc_runtime --working-dir /var/lib/plc --autostart -- --opt value
//! ```

#![deny(warnings)]

use clap::Parser;
use plc_common::config::{ConfigLoader, RuntimeConfig};
use plc_common::state::RuntimeState;
use plc_runtime::{ExecRelauncher, RuntimeController};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// PLC Runtime - installs, runs and debugs compiled control programs
#[derive(Parser, Debug)]
#[command(name = "plc_runtime")]
#[command(version)]
#[command(about = "On-device runtime controller for compiled PLC images")]
#[command(long_about = None)]
struct Args {
    /// Path to the runtime configuration file (runtime.toml).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Working directory for images; overrides the config file.
    #[arg(short, long, value_name = "DIR")]
    working_dir: Option<PathBuf>,

    /// Start the persisted image at boot
    #[arg(short, long)]
    autostart: bool,

    /// Resume debug sampling when autostarting
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Arguments passed to the control program after argv[0]
    #[arg(last = true)]
    program_args: Vec<String>,
}

fn main() {
    if let Err(e) = run() {
        error!("Runtime startup failed: {}", e);
        eprintln!("plc_runtime: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args)?;

    setup_tracing(&args, &config);
    info!(
        "PLC runtime v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );
    info!("Working directory: {}", config.runtime.working_dir.display());

    let relauncher = ExecRelauncher::from_env()?;
    let controller = RuntimeController::new(&config.runtime, Arc::new(relauncher))?;

    if config.runtime.autostart {
        match controller.status() {
            RuntimeState::Stopped => {
                if !controller.start(args.debug) {
                    warn!("Autostart failed; waiting for a new image");
                }
            }
            state => info!("Autostart skipped ({})", state),
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    if controller.status() == RuntimeState::Started {
        controller.stop();
    }
    info!("PLC runtime shutdown complete");
    Ok(())
}

/// Build the effective configuration from the config file and CLI overrides.
fn load_config(args: &Args) -> Result<RuntimeConfig, Box<dyn std::error::Error>> {
    let mut config = match (&args.config, &args.working_dir) {
        (Some(path), _) => RuntimeConfig::load(path)?,
        (None, Some(dir)) => RuntimeConfig::with_working_dir(dir),
        (None, None) => RuntimeConfig::with_working_dir(std::env::current_dir()?),
    };

    if let Some(dir) = &args.working_dir {
        config.runtime.working_dir = dir.clone();
    }
    if args.autostart {
        config.runtime.autostart = true;
    }
    if !args.program_args.is_empty() {
        config.runtime.program_args = args.program_args.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Setup tracing subscriber based on CLI arguments and config.
fn setup_tracing(args: &Args, config: &RuntimeConfig) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        config.shared.log_level.into()
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
