//! Sweep Daemon
//!
//! Runs a background loop that checks the sweep's cron schedule and
//! executes due passes. Uses `tokio::time::interval` for the tick loop
//! and `Arc<AtomicBool>` for graceful shutdown signaling. Passes run
//! sequentially on the one daemon task, so a slow batch commit can
//! never overlap with the next tick's sweep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use cron::Schedule;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::state::Database;

use super::run_sweep;

/// Options for creating a sweep daemon.
pub struct SweepDaemonOptions {
    /// Seconds between schedule checks. Defaults to 60.
    pub tick_interval_secs: u64,
    /// Cron expression (6-field, seconds first). Defaults to hourly.
    pub schedule: String,
}

impl Default for SweepDaemonOptions {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            schedule: "0 0 * * * *".to_string(),
        }
    }
}

/// The sweep daemon. Runs a background tokio task that periodically
/// checks whether the cron schedule is due and runs one sweep pass.
pub struct SweepDaemon {
    /// Atomic flag indicating whether the daemon is running.
    running: Arc<AtomicBool>,
    /// Handle to the spawned background task.
    interval_handle: Option<JoinHandle<()>>,
    /// Tick interval in seconds.
    tick_interval_secs: u64,
    /// Cron expression for sweep passes.
    schedule: String,
    /// Shared store handle.
    db: Arc<Mutex<Database>>,
}

/// Create a new sweep daemon over the shared store.
pub fn create_sweep_daemon(db: Arc<Mutex<Database>>, options: SweepDaemonOptions) -> SweepDaemon {
    SweepDaemon {
        running: Arc::new(AtomicBool::new(false)),
        interval_handle: None,
        tick_interval_secs: options.tick_interval_secs,
        schedule: options.schedule,
        db,
    }
}

impl SweepDaemon {
    /// Start the sweep daemon background loop.
    pub fn start(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            warn!("Sweep daemon is already running");
            return;
        }

        self.running.store(true, Ordering::SeqCst);
        info!(
            "Starting sweep daemon: schedule '{}', {}s tick interval",
            self.schedule, self.tick_interval_secs
        );

        let running = Arc::clone(&self.running);
        let db = Arc::clone(&self.db);
        let schedule = self.schedule.clone();
        let tick_secs = self.tick_interval_secs;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(tick_secs));
            let mut last_run: Option<DateTime<Utc>> = None;

            loop {
                interval.tick().await;

                if !running.load(Ordering::SeqCst) {
                    info!("Sweep daemon stopping");
                    break;
                }

                let now = Utc::now();
                if !is_due(&schedule, last_run, now) {
                    continue;
                }

                let mut db = db.lock().await;
                match run_sweep(&mut db, now.timestamp()) {
                    Ok(0) => debug!("Sweep pass complete, nothing expired"),
                    Ok(n) => info!("Sweep pass queued {} alert(s)", n),
                    // Nothing was committed; the same expired set will
                    // be recomputed on the next due tick.
                    Err(e) => error!("Sweep pass failed: {:#}", e),
                }
                last_run = Some(now);
            }
        });

        self.interval_handle = Some(handle);
    }

    /// Stop the sweep daemon gracefully.
    pub fn stop(&mut self) {
        if !self.running.load(Ordering::SeqCst) {
            debug!("Sweep daemon is not running");
            return;
        }

        info!("Stopping sweep daemon");
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.interval_handle.take() {
            handle.abort();
        }
    }

    /// Returns whether the daemon is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one sweep pass immediately, regardless of the schedule.
    pub async fn force_run(&self) -> Result<usize> {
        info!("Force-running sweep pass");
        let mut db = self.db.lock().await;
        run_sweep(&mut db, Utc::now().timestamp())
    }
}

/// Parse-check a configured cron expression so `serve` can fail fast
/// at startup instead of warning on every tick forever.
pub fn validate_schedule(schedule: &str) -> Result<()> {
    schedule
        .parse::<Schedule>()
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!("invalid cron schedule '{schedule}': {e}"))
}

/// Check whether the sweep is due: has a scheduled time arrived since
/// the last pass? With no pass recorded yet the sweep is due
/// immediately, which gives a freshly started daemon one catch-up pass.
pub fn is_due(schedule: &str, last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let schedule: Schedule = match schedule.parse() {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid cron schedule '{}': {}", schedule, e);
            return false;
        }
    };

    match last_run {
        Some(last) => match schedule.after(&last).next() {
            Some(next) => now >= next,
            None => false,
        },
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const HOURLY: &str = "0 0 * * * *";

    #[test]
    fn test_due_immediately_with_no_last_run() {
        assert!(is_due(HOURLY, None, Utc::now()));
    }

    #[test]
    fn test_not_due_before_next_scheduled_time() {
        let last = Utc.with_ymd_and_hms(2026, 8, 25, 10, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 10, 30, 0).unwrap();
        assert!(!is_due(HOURLY, Some(last), now));
    }

    #[test]
    fn test_due_once_scheduled_time_passes() {
        let last = Utc.with_ymd_and_hms(2026, 8, 25, 10, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 11, 0, 1).unwrap();
        assert!(is_due(HOURLY, Some(last), now));
    }

    #[test]
    fn test_invalid_schedule_is_never_due() {
        assert!(!is_due("not a cron line", None, Utc::now()));
    }

    #[test]
    fn test_validate_schedule() {
        assert!(validate_schedule(HOURLY).is_ok());
        assert!(validate_schedule("not a cron line").is_err());
    }

    #[tokio::test]
    async fn test_force_run_sweeps_regardless_of_schedule() {
        let db = Database::open_in_memory().unwrap();
        db.record_heartbeat("job", 0, Some(1.0), None, None).unwrap();
        let db = Arc::new(Mutex::new(db));

        // Daemon never started: only the forced pass may sweep.
        let daemon = create_sweep_daemon(Arc::clone(&db), SweepDaemonOptions::default());
        assert!(!daemon.is_running());

        // The monitor above expired long before any wall-clock now.
        assert_eq!(daemon.force_run().await.unwrap(), 1);
        // Fire-once: the row is gone, so a second pass queues nothing.
        assert_eq!(daemon.force_run().await.unwrap(), 0);
        assert_eq!(db.lock().await.peek_outbox().unwrap().len(), 1);
    }
}
