//! Healthwatch Runtime
//!
//! The entry point for the dead man's switch. Handles CLI args and
//! orchestrates the HTTP listener + sweep daemon, plus the management
//! commands that operate on the local store.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Local, TimeZone, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use healthwatch::config::{self, resolve_path};
use healthwatch::poller::{self, archive};
use healthwatch::state::Database;
use healthwatch::sweep::{self, create_sweep_daemon, SweepDaemonOptions};
use healthwatch::types::{default_config, WatchConfig};
use healthwatch::web::{self, AppState};

/// Healthwatch -- Dead Man's Switch
#[derive(Parser, Debug)]
#[command(
    name = "healthwatch",
    version,
    about = "Dead man's switch: heartbeat registry, timeout sweep, alert outbox"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP listener and the sweep daemon
    Serve,
    /// Run one sweep pass immediately and exit
    Sweep,
    /// Run one poller pass: fetch, archive, deliver, clear
    Poll,
    /// Show all monitors with their last ping and expected death
    List,
    /// Quick outbox health check: empty or backed up?
    Status,
    /// Delete a monitor so a retired job stops alerting
    Remove {
        /// The unique id of the monitor
        id: String,
    },
    /// Push a monitor's expected death out by N hours
    Pause {
        /// The unique id of the monitor
        id: String,
        /// Hours to pause
        hours: f64,
    },
    /// Show the last entries of the local alert archive
    Log {
        /// Number of entries to show
        #[arg(default_value_t = 10)]
        count: usize,
    },
}

// ---- Helpers ----------------------------------------------------------------

fn init_tracing(config: &WatchConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Load the config, writing a default file on first run so the
/// operator has something to edit.
fn load_or_init_config() -> Result<WatchConfig> {
    if let Some(config) = config::load_config() {
        return Ok(config);
    }

    let defaults = default_config();
    config::save_config(&defaults)?;
    eprintln!(
        "Wrote default config to {}. Set apiToken before serving.",
        config::get_config_path().display()
    );
    Ok(defaults)
}

fn open_store(config: &WatchConfig) -> Result<Database> {
    Database::open(&resolve_path(&config.db_path))
}

/// Render an epoch timestamp in local time for operator-facing output.
fn format_local(epoch: i64) -> String {
    Local
        .timestamp_opt(epoch, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format!("epoch {epoch}"))
}

// ---- Serve ------------------------------------------------------------------

async fn serve(config: WatchConfig) -> Result<()> {
    if config.api_token.is_empty() {
        bail!(
            "apiToken is empty; set it in {} before serving",
            config::get_config_path().display()
        );
    }
    sweep::validate_schedule(&config.sweep_schedule)
        .context("Bad sweepSchedule in config")?;

    let db = open_store(&config).context("Failed to open store")?;
    let db = Arc::new(Mutex::new(db));

    let mut daemon = create_sweep_daemon(
        Arc::clone(&db),
        SweepDaemonOptions {
            tick_interval_secs: config.tick_interval_secs,
            schedule: config.sweep_schedule.clone(),
        },
    );
    daemon.start();

    let state = Arc::new(AppState {
        db,
        config: Arc::new(config),
    });

    let result = web::serve(state).await;
    daemon.stop();
    result
}

// ---- Management Commands ----------------------------------------------------

fn cmd_list(config: &WatchConfig) -> Result<()> {
    let db = open_store(config)?;
    let monitors = db.list_monitors()?;
    if monitors.is_empty() {
        println!("No active monitors found.");
        return Ok(());
    }

    println!("{:<30} | {:<20} | {}", "MONITOR ID", "LAST PING", "EXPECTED DEATH");
    println!("{}", "-".repeat(75));

    let now = Utc::now().timestamp();
    for m in &monitors {
        let mut status = format_local(m.deadline());
        if m.is_expired(now) {
            status = format!("{} {}", status, "[DEAD]".red());
        }
        println!("{:<30} | {:<20} | {}", m.id, format_local(m.last_ping), status);
    }
    Ok(())
}

fn cmd_status(config: &WatchConfig) -> Result<()> {
    let db = open_store(config)?;
    let count = db.outbox_count()?;
    if count == 0 {
        println!("Status: {}. The outbox is empty.", "HEALTHY".green());
    } else {
        println!(
            "Status: {}. There are {} pending alert(s) in the outbox.",
            "BACKED UP".red(),
            count
        );
    }
    Ok(())
}

fn cmd_remove(config: &WatchConfig, id: &str) -> Result<()> {
    let db = open_store(config)?;
    if db.remove_monitor(id)? {
        println!("Monitor '{id}' has been permanently removed.");
    } else {
        println!("No monitor named '{id}' found.");
    }
    Ok(())
}

fn cmd_pause(config: &WatchConfig, id: &str, hours: f64) -> Result<()> {
    let db = open_store(config)?;
    if db.pause_monitor(id, hours, Utc::now().timestamp())? {
        println!("Monitor '{id}' paused. Its expected death has been pushed out by {hours} hours.");
    } else {
        println!("No monitor named '{id}' found.");
    }
    Ok(())
}

fn cmd_log(config: &WatchConfig, count: usize) -> Result<()> {
    let blocks = archive::tail(&resolve_path(&config.archive_path), count)?;
    if blocks.is_empty() {
        println!("Archive is empty. No alerts have been processed locally yet.");
        return Ok(());
    }

    println!("--- Showing last {} entries ---", blocks.len());
    for block in blocks {
        println!("----------------------------------------------------------------");
        println!("{block}");
        println!("----------------------------------------------------------------\n");
    }
    Ok(())
}

// ---- Entry Point ------------------------------------------------------------

async fn run(cli: Cli) -> Result<()> {
    let config = load_or_init_config()?;

    match cli.command {
        Command::Serve => {
            init_tracing(&config);
            serve(config).await
        }
        Command::Sweep => {
            init_tracing(&config);
            let db = Arc::new(Mutex::new(open_store(&config)?));
            let daemon = create_sweep_daemon(
                db,
                SweepDaemonOptions {
                    tick_interval_secs: config.tick_interval_secs,
                    schedule: config.sweep_schedule.clone(),
                },
            );
            let queued = daemon.force_run().await?;
            println!("Sweep complete: {queued} alert(s) queued.");
            Ok(())
        }
        Command::Poll => {
            init_tracing(&config);
            let processed = poller::run_poll(&config).await?;
            if processed == 0 {
                println!("Outbox is empty.");
            } else {
                println!("Processed {processed} alert(s).");
            }
            Ok(())
        }
        Command::List => cmd_list(&config),
        Command::Status => cmd_status(&config),
        Command::Remove { id } => cmd_remove(&config, &id),
        Command::Pause { id, hours } => cmd_pause(&config, &id, hours),
        Command::Log { count } => cmd_log(&config, count),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Fatal: {e:#}");
        std::process::exit(1);
    }
}
