//! Alert Synthesis
//!
//! Turns an expired monitor row into the final alert text: caller
//! overrides (or defaults naming the monitor), plus a machine-readable
//! evidence block that is appended regardless of any custom body.

use chrono::DateTime;

use crate::state::ResolvedAlert;
use crate::types::Monitor;

/// Fixed UTC rendering used throughout the evidence block.
fn format_utc(epoch: i64) -> String {
    DateTime::from_timestamp(epoch, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("epoch {epoch}"))
}

/// Subject used when the monitor supplied none.
pub fn default_subject(id: &str) -> String {
    format!("[healthwatch] No heartbeat from '{id}'")
}

/// Body used when the monitor supplied none.
pub fn default_body(id: &str, timeout_hours: f64) -> String {
    format!(
        "Monitor '{id}' has not pinged within its {timeout_hours} hour window \
         and has been declared dead."
    )
}

/// Evidence block naming the monitor, its last heartbeat, and the
/// deadline it blew through. Always appended, even to custom bodies.
pub fn evidence_block(monitor: &Monitor) -> String {
    format!(
        "\n\n--- monitor evidence ---\n\
         id:          {}\n\
         last ping:   {}\n\
         expected by: {}\n",
        monitor.id,
        format_utc(monitor.last_ping),
        format_utc(monitor.deadline()),
    )
}

/// Synthesize the final alert for one expired monitor.
pub fn resolve_alert(monitor: &Monitor) -> ResolvedAlert {
    let subject = monitor
        .alert_subject
        .clone()
        .unwrap_or_else(|| default_subject(&monitor.id));
    let base = monitor
        .alert_body
        .clone()
        .unwrap_or_else(|| default_body(&monitor.id, monitor.timeout_hours));

    ResolvedAlert {
        monitor_id: monitor.id.clone(),
        subject,
        body: format!("{}{}", base, evidence_block(monitor)),
    }
}
