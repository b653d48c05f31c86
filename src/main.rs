//! idlemgt - report user idle time and idle/active transitions.

use idlemgt::config::Config;
use idlemgt::idle;
use idlemgt::{IdleMonitor, IdleTimeHandle, IdleTransition};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Report how long the user has been idle.
///
/// By default runs until interrupted, logging when the user goes idle and
/// when they come back.
#[derive(Parser, Debug)]
#[command(name = "idlemgt")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the current idle time in seconds and exit.
    #[arg(long)]
    once: bool,

    /// Idle threshold in seconds (overrides config; 0 disables).
    #[arg(short, long)]
    threshold: Option<u64>,

    /// Print idle transitions to stdout.
    #[arg(long)]
    print_events: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level)?;

    debug!("idlemgt v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config =
        Config::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(threshold) = args.threshold {
        config.idle_threshold_seconds = threshold;
    }

    config.warn_if_coarse();

    if args.once {
        return run_once();
    }

    run_monitor(&config, args.print_events).await
}

/// Initialize logging with the specified level.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(format!("idlemgt={level}"))
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Read idle time once and print it.
fn run_once() -> Result<()> {
    let seconds = idle::with_handle(IdleTimeHandle::query_idle_seconds)
        .context("Failed to read idle time")?;
    println!("{seconds}");
    Ok(())
}

/// Poll idle time until Ctrl-C.
async fn run_monitor(config: &Config, print_events: bool) -> Result<()> {
    let monitor = Arc::new(IdleMonitor::new(config.idle_threshold()));
    let mut transitions = monitor
        .clone()
        .start_polling(config.poll_interval(), IdleTimeHandle::acquire);
    let mut monitoring = true;

    info!(
        "Watching idle time (threshold {}s, interval {}s)",
        config.idle_threshold_seconds,
        config.poll_interval().as_secs()
    );

    loop {
        tokio::select! {
            transition = transitions.recv(), if monitoring => {
                if let Some(transition) = transition {
                    handle_transition(transition, print_events);
                } else {
                    warn!("Idle time unknown, treating user as always active");
                    monitoring = false;
                }
            }

            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Handle an idle transition.
fn handle_transition(transition: IdleTransition, print_events: bool) {
    match transition {
        IdleTransition::WentIdle { idle_for } => {
            info!("User idle for {}s, suspending tracking", idle_for.as_secs());
            if print_events {
                println!("[IDLE] | idle_for={}s", idle_for.as_secs());
            }
        }
        IdleTransition::Resumed { idle_for } => {
            info!("User back after {}s idle", idle_for.as_secs());
            if print_events {
                println!("[ACTIVE] | away_for={}s", idle_for.as_secs());
            }
        }
    }
}
