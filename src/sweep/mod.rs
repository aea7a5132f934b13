//! Sweep Module
//!
//! Periodic timeout detection: scans the registry for monitors silent
//! past their window, enqueues one alert per expiry into the outbox,
//! and deletes the expired row so the alert fires exactly once.

pub mod daemon;
pub mod message;

pub use daemon::{create_sweep_daemon, validate_schedule, SweepDaemon, SweepDaemonOptions};
pub use message::resolve_alert;

use anyhow::Result;
use tracing::{debug, info};

use crate::state::Database;

/// Run one sweep pass at the given timestamp snapshot.
///
/// The steady state is an empty expired set and does zero writes.
/// Otherwise every expired monitor gets its alert synthesized and the
/// whole enqueue+delete batch is committed atomically; if the commit
/// fails nothing changes and the next tick recomputes the same set,
/// which makes the sweep naturally retryable with no extra bookkeeping.
///
/// Returns the number of alerts enqueued.
pub fn run_sweep(db: &mut Database, now: i64) -> Result<usize> {
    let expired = db.find_expired(now)?;
    if expired.is_empty() {
        debug!("Sweep found no expired monitors");
        return Ok(0);
    }

    let alerts: Vec<_> = expired.iter().map(resolve_alert).collect();
    db.expire_monitors(&alerts)?;

    for alert in &alerts {
        info!("Declared monitor '{}' dead, alert queued", alert.monitor_id);
    }
    Ok(alerts.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Database;

    #[test]
    fn test_sweep_at_ping_instant_never_alerts() {
        let mut db = Database::open_in_memory().unwrap();
        db.record_heartbeat("job", 5000, Some(1.0), None, None).unwrap();

        assert_eq!(run_sweep(&mut db, 5000).unwrap(), 0);
        assert!(db.peek_outbox().unwrap().is_empty());
        assert!(db.get_monitor("job").unwrap().is_some());
    }

    #[test]
    fn test_expired_monitor_alerts_once_and_is_removed() {
        let mut db = Database::open_in_memory().unwrap();
        db.record_heartbeat("job-x", 0, Some(1.0), None, None).unwrap();

        assert_eq!(run_sweep(&mut db, 3601).unwrap(), 1);

        let outbox = db.peek_outbox().unwrap();
        assert_eq!(outbox.len(), 1);
        assert!(outbox[0].subject.contains("job-x"));
        assert!(db.get_monitor("job-x").unwrap().is_none());
    }

    #[test]
    fn test_sweep_is_idempotent_per_silence_episode() {
        let mut db = Database::open_in_memory().unwrap();
        db.record_heartbeat("job", 0, Some(1.0), None, None).unwrap();

        assert_eq!(run_sweep(&mut db, 3601).unwrap(), 1);
        // Second sweep with no intervening pings: the row is gone, so
        // the same silence never alerts twice.
        assert_eq!(run_sweep(&mut db, 7200).unwrap(), 0);
        assert_eq!(db.peek_outbox().unwrap().len(), 1);
    }

    #[test]
    fn test_monitor_pinging_on_schedule_never_alerts() {
        let mut db = Database::open_in_memory().unwrap();

        // job-y pings every 1800s with a one hour timeout
        let mut now = 0;
        for _ in 0..10 {
            db.record_heartbeat("job-y", now, Some(1.0), None, None).unwrap();
            now += 1800;
            assert_eq!(run_sweep(&mut db, now).unwrap(), 0);
        }
        assert!(db.peek_outbox().unwrap().is_empty());
    }

    #[test]
    fn test_reregistration_has_no_memory_of_prior_failure() {
        let mut db = Database::open_in_memory().unwrap();
        db.record_heartbeat("job", 0, Some(1.0), Some("custom"), None).unwrap();
        run_sweep(&mut db, 3601).unwrap();

        // Later heartbeat re-registers from scratch
        db.record_heartbeat("job", 10_000, Some(1.0), None, None).unwrap();
        let m = db.get_monitor("job").unwrap().unwrap();
        assert_eq!(m.last_ping, 10_000);
        assert!(m.alert_subject.is_none());

        // And the new silence episode alerts again, once
        assert_eq!(run_sweep(&mut db, 14_000).unwrap(), 1);
        assert_eq!(db.peek_outbox().unwrap().len(), 2);
    }

    #[test]
    fn test_shortened_timeout_can_expire_on_next_sweep() {
        let mut db = Database::open_in_memory().unwrap();
        db.record_heartbeat("job", 0, Some(13.0), None, None).unwrap();
        assert_eq!(run_sweep(&mut db, 7200).unwrap(), 0);

        // Re-ping with a timeout shorter than what then elapses.
        // The deadline was reset by the ping, so expiry is measured
        // from the new last_ping. Intended behavior, not a bug.
        db.record_heartbeat("job", 7200, Some(0.5), None, None).unwrap();
        assert_eq!(run_sweep(&mut db, 7200 + 1801).unwrap(), 1);
    }

    #[test]
    fn test_sweep_batch_covers_multiple_expiries() {
        let mut db = Database::open_in_memory().unwrap();
        db.record_heartbeat("a", 0, Some(1.0), None, None).unwrap();
        db.record_heartbeat("b", 0, Some(1.0), None, None).unwrap();
        db.record_heartbeat("c", 0, Some(48.0), None, None).unwrap();

        assert_eq!(run_sweep(&mut db, 3601).unwrap(), 2);
        assert_eq!(db.peek_outbox().unwrap().len(), 2);
        assert!(db.get_monitor("c").unwrap().is_some());
    }
}
