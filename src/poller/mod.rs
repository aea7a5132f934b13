//! Poller Module
//!
//! One of possibly many independent processes draining the alert
//! outbox over HTTP. Pollers coordinate only through the store:
//! whichever delivers and clears first claims the batch, and one that
//! dies mid-pass leaves the entries for the next. Duplicate delivery
//! across failover pollers is the accepted cost of at-least-once.

pub mod archive;
pub mod sink;

pub use sink::{AlertSink, SinkError, WebhookSink};

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{info, warn};

use crate::config::resolve_path;
use crate::types::{OutboxEntry, WatchConfig};

/// Run one poller pass: fetch the pending alert set, archive every
/// entry locally, deliver unless squelched, and clear the outbox
/// scoped to the highest id seen — only if every delivery succeeded.
///
/// Returns the number of alerts processed.
pub async fn run_poll(config: &WatchConfig) -> Result<usize> {
    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build http client")?;
    let base = config.api_url.trim_end_matches('/');

    let alerts: Vec<OutboxEntry> = client
        .get(format!("{base}/outbox"))
        .bearer_auth(&config.api_token)
        .send()
        .await
        .context("failed to fetch outbox")?
        .error_for_status()
        .context("outbox fetch rejected")?
        .json()
        .await
        .context("failed to parse outbox response")?;

    if alerts.is_empty() {
        return Ok(0);
    }

    let mode = pass_mode(config.squelch, config.webhook_url.is_some());
    if mode == PassMode::ArchiveOnly {
        warn!("No webhook configured; alerts will be archived and cleared without delivery");
    }
    info!("Processing {} alert(s)... [{}]", alerts.len(), mode.label());

    let archive_path = resolve_path(&config.archive_path);
    let webhook = config
        .webhook_url
        .as_ref()
        .map(|url| WebhookSink::new(url.clone()));

    let mut all_processed = true;

    for alert in &alerts {
        if let Err(e) = archive::archive_locally(&archive_path, alert) {
            warn!("Failed to archive alert '{}': {:#}", alert.subject, e);
        }

        // Squelched alerts count as processed so the outbox still drains.
        if config.squelch {
            continue;
        }

        if let Some(webhook) = &webhook {
            if let Err(e) = webhook.deliver(alert).await {
                all_processed = false;
                warn!("Delivery failed for '{}': {}", alert.subject, e);
            }
        }
    }

    if !all_processed {
        // Leave the outbox intact; this pass (or another poller) retries.
        warn!("Some deliveries failed; outbox left for retry");
        return Ok(alerts.len());
    }

    // Scoped clear: entries enqueued after our peek have higher ids
    // and must survive.
    let max_id = alerts.iter().map(|a| a.id).max().unwrap_or(0);
    client
        .delete(format!("{base}/outbox?up_to={max_id}"))
        .bearer_auth(&config.api_token)
        .send()
        .await
        .context("failed to clear outbox")?
        .error_for_status()
        .context("outbox clear rejected")?;

    info!("Outbox cleared through id {}", max_id);
    Ok(alerts.len())
}

/// What a pass will do with the alerts it fetches. Squelch wins over
/// a configured webhook; no webhook and no squelch still drains the
/// outbox, with a warning from `run_poll`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PassMode {
    Deliver,
    Squelched,
    ArchiveOnly,
}

impl PassMode {
    fn label(self) -> &'static str {
        match self {
            Self::Deliver => "delivering",
            Self::Squelched => "SQUELCHED (archiving only)",
            Self::ArchiveOnly => "no sink (archiving only)",
        }
    }
}

fn pass_mode(squelch: bool, has_webhook: bool) -> PassMode {
    if squelch {
        PassMode::Squelched
    } else if has_webhook {
        PassMode::Deliver
    } else {
        PassMode::ArchiveOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_mode_resolution() {
        assert_eq!(pass_mode(false, true), PassMode::Deliver);
        assert_eq!(pass_mode(true, true), PassMode::Squelched);
        assert_eq!(pass_mode(true, false), PassMode::Squelched);
        // No sink and no squelch drains without delivering; run_poll
        // warns about it instead of failing the pass.
        assert_eq!(pass_mode(false, false), PassMode::ArchiveOnly);
    }
}
