//! Polling sync engine.
//!
//! Every tick, each enabled destination fetches the newest website messages,
//! delivers the ones its ledger has not seen (oldest first) and persists the
//! ledger once for the whole batch. Resumption after an interrupted batch
//! falls out of the ledger check; there is no separate cursor.
//!
//! Only one instance may run against a given store. Two instances would
//! both deliver every message.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::common::error::FeedError;
use crate::common::{DestinationId, MessageOrigin};
use crate::config::types::SyncConfig;
use crate::feed::FeedClient;
use crate::store::ConfigStore;
use crate::sync::DeliverySink;

/// Timing and batch size of the sync loop.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub interval: Duration,
    pub fetch_limit: usize,
    pub fetch_timeout: Duration,
}

impl From<&SyncConfig> for SyncSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            fetch_limit: config.fetch_limit,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Destinations whose batch was fetched and processed.
    pub synced: usize,
    /// Destinations without a usable sync channel.
    pub skipped: usize,
    /// Destinations whose fetch failed or timed out.
    pub failed: usize,
    /// Messages posted to Discord.
    pub delivered: usize,
    /// Messages whose delivery failed (recorded, not retried).
    pub delivery_failures: usize,
}

enum DestinationOutcome {
    Skipped,
    Synced { delivered: usize, failures: usize },
}

/// Drives website -> Discord delivery.
pub struct SyncEngine {
    store: Arc<ConfigStore>,
    feed: Arc<dyn FeedClient>,
    sink: Arc<dyn DeliverySink>,
    settings: SyncSettings,
}

impl SyncEngine {
    pub fn new(
        store: Arc<ConfigStore>,
        feed: Arc<dyn FeedClient>,
        sink: Arc<dyn DeliverySink>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            store,
            feed,
            sink,
            settings,
        }
    }

    /// Tick on the configured interval until shutdown is signalled.
    ///
    /// A tick in progress finishes the destination it is working on before
    /// the loop exits, so no batch is left half-persisted.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "Sync engine started (every {:.1}s, {} messages per fetch)",
            self.settings.interval.as_secs_f64(),
            self.settings.fetch_limit
        );

        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown channel closed");
                        break;
                    }
                    continue;
                }
            }

            let report = self.tick(Some(&shutdown_rx)).await;
            if report.delivered > 0 || report.failed > 0 || report.delivery_failures > 0 {
                info!(
                    "Sync tick: {} delivered, {} delivery failure(s), {} destination(s) failed",
                    report.delivered, report.delivery_failures, report.failed
                );
            } else {
                debug!(?report, "Sync tick complete");
            }
        }

        info!("Sync engine stopped");
    }

    /// Run one full tick over every destination, stopping between
    /// destinations once shutdown is signalled.
    pub async fn tick(&self, shutdown_rx: Option<&watch::Receiver<bool>>) -> TickReport {
        let mut report = TickReport::default();

        for (dest, _) in self.store.destinations().await {
            if shutdown_rx.map(|rx| *rx.borrow()).unwrap_or(false) {
                debug!("Shutdown requested, ending tick early");
                break;
            }

            match self.sync_destination(&dest).await {
                Ok(DestinationOutcome::Skipped) => report.skipped += 1,
                Ok(DestinationOutcome::Synced {
                    delivered,
                    failures,
                }) => {
                    report.synced += 1;
                    report.delivered += delivered;
                    report.delivery_failures += failures;
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(destination = %dest, "Skipping destination this tick: {}", e);
                }
            }
        }

        report
    }

    async fn sync_destination(&self, dest: &DestinationId) -> Result<DestinationOutcome, FeedError> {
        let _guard = self.store.lock_destination(dest).await;

        let channel = match self.store.get(dest).await.and_then(|c| c.sync_channel()) {
            Some(channel) => channel,
            None => return Ok(DestinationOutcome::Skipped),
        };

        if !self.sink.channel_available(channel).await {
            debug!(destination = %dest, channel = %channel, "Sync channel unavailable");
            return Ok(DestinationOutcome::Skipped);
        }

        let mut batch = match timeout(
            self.settings.fetch_timeout,
            self.feed.fetch_recent_external(self.settings.fetch_limit),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(FeedError::Timeout {
                    seconds: self.settings.fetch_timeout.as_secs(),
                })
            }
        };

        // Newest-first from the feed; deliver oldest first.
        batch.reverse();
        batch.sort_by_key(|message| message.created_at);

        let mut delivered = 0;
        let mut failures = 0;
        let mut recorded = 0;

        for message in batch {
            if message.origin != MessageOrigin::External {
                continue;
            }
            if self.store.already_delivered(dest, &message.id).await {
                continue;
            }

            match self.sink.deliver(channel, &message).await {
                Ok(()) => {
                    delivered += 1;
                    info!(
                        destination = %dest,
                        feed_id = %message.id,
                        "Website -> Discord [{}]: {}",
                        message.author_name,
                        message.body
                    );
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        destination = %dest,
                        feed_id = %message.id,
                        "Failed to deliver website message: {}",
                        e
                    );
                }
            }

            self.store.record_delivered(dest, message.id).await;
            recorded += 1;
        }

        if recorded > 0 {
            if let Err(e) = self.store.persist().await {
                error!(destination = %dest, "Failed to persist delivery ledger: {}", e);
            }
        }

        Ok(DestinationOutcome::Synced {
            delivered,
            failures,
        })
    }
}
