//! Healthwatch - Type Definitions
//!
//! Shared types for the dead man's switch: registry rows, outbox
//! entries, ping override payloads, and the on-disk configuration.

use serde::{Deserialize, Serialize};

// ─── Registry ────────────────────────────────────────────────────

/// Timeout applied when a ping does not supply one, in hours.
/// Chosen to survive a missed daily run plus margin.
pub const DEFAULT_TIMEOUT_HOURS: f64 = 13.0;

/// One watched heartbeat source. A row exists iff the monitor has
/// pinged at least once and has not yet been declared dead by the sweep.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Monitor {
    /// Caller-chosen unique id, e.g. "hostname-jobname".
    pub id: String,
    /// Epoch seconds of the most recent heartbeat.
    pub last_ping: i64,
    /// Silence longer than this many hours is failure.
    pub timeout_hours: f64,
    /// Caller-supplied alert subject override, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_subject: Option<String>,
    /// Caller-supplied alert body override, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_body: Option<String>,
}

impl Monitor {
    /// Epoch seconds after which this monitor is considered dead.
    pub fn deadline(&self) -> i64 {
        self.last_ping + (self.timeout_hours * 3600.0) as i64
    }

    /// Whether the monitor has been silent past its timeout at `now`.
    /// Boundary equality (`now - last_ping == timeout`) is not expired.
    pub fn is_expired(&self, now: i64) -> bool {
        (now - self.last_ping) as f64 > self.timeout_hours * 3600.0
    }
}

// ─── Outbox ──────────────────────────────────────────────────────

/// A pending alert awaiting delivery. Produced only by the sweep,
/// consumed only by pollers, never mutated in place. The id is a
/// store-assigned monotonic sequence number used to scope destructive
/// reads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: i64,
    pub subject: String,
    pub body: String,
}

// ─── Ping payload ────────────────────────────────────────────────

/// Optional JSON body of a ping request. Each present field overrides
/// the corresponding query parameter; absent fields fall back to the
/// query parameter and then to the defaults. There is no partial-merge
/// against the stored row: omitted means default, not "keep previous".
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PingOverrides {
    pub timeout: Option<f64>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

// ─── Configuration ───────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchConfig {
    /// Address the HTTP surface binds to.
    pub listen_addr: String,
    /// Static shared secret; every request must present it.
    pub api_token: String,
    /// Path to the SQLite database, `~` allowed.
    pub db_path: String,
    /// Cron expression for the sweep (6-field, seconds first).
    pub sweep_schedule: String,
    /// Seconds between daemon schedule checks.
    pub tick_interval_secs: u64,
    pub log_level: LogLevel,
    /// Base URL the poller fetches the outbox from.
    pub api_url: String,
    /// Webhook the poller forwards alerts to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// When set, the poller archives alerts but skips delivery.
    pub squelch: bool,
    /// Path to the local alert archive log, `~` allowed.
    pub archive_path: String,
    pub version: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by tracing's env filter.
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Returns the default `WatchConfig`. The api token has no sensible
/// default and is left empty so `serve` can refuse to start until the
/// operator sets one.
pub fn default_config() -> WatchConfig {
    WatchConfig {
        listen_addr: "127.0.0.1:8473".to_string(),
        api_token: String::new(),
        db_path: "~/.healthwatch/watch.db".to_string(),
        sweep_schedule: "0 0 * * * *".to_string(),
        tick_interval_secs: 60,
        log_level: LogLevel::Info,
        api_url: "http://127.0.0.1:8473".to_string(),
        webhook_url: None,
        squelch: false,
        archive_path: "~/.healthwatch/logs/alert_log".to_string(),
        version: "0.1.0".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(last_ping: i64, timeout_hours: f64) -> Monitor {
        Monitor {
            id: "job".to_string(),
            last_ping,
            timeout_hours,
            alert_subject: None,
            alert_body: None,
        }
    }

    #[test]
    fn test_deadline_adds_timeout_window() {
        assert_eq!(monitor(1000, 1.0).deadline(), 1000 + 3600);
        assert_eq!(monitor(0, 0.5).deadline(), 1800);
    }

    #[test]
    fn test_is_expired_boundary_is_not_expired() {
        let m = monitor(0, 1.0);
        assert!(!m.is_expired(3600));
        assert!(m.is_expired(3601));
    }
}
