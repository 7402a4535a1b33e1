//! JSON-backed configuration store.
//!
//! One entry per destination, keyed by guild id. The whole file is rewritten
//! on every mutation (temp file + rename); there is no append mode.
//!
//! Ledger read-modify-write and configuration changes for the same
//! destination are serialized through `lock_destination`. The map lock is
//! only ever held for short, non-awaiting sections.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

use crate::common::error::{StoreError, StoreResult};
use crate::common::{ChannelRef, DestinationId, FeedMessageId};
use crate::store::ledger::DeliveryLedger;

/// Configuration and delivery state of one destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Channel where administrators run commands. Not used by the relay core.
    #[serde(default, alias = "mod_channel", skip_serializing_if = "Option::is_none")]
    pub mod_channel_id: Option<ChannelRef>,
    /// Channel mirrored with the website chat.
    #[serde(
        default,
        alias = "global_chat_channel",
        skip_serializing_if = "Option::is_none"
    )]
    pub global_chat_channel_id: Option<ChannelRef>,
    /// Sync can be paused without losing the channel configuration.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, alias = "posted_message_ids")]
    pub delivered_ids: DeliveryLedger,
}

fn default_enabled() -> bool {
    true
}

impl DestinationConfig {
    pub fn new(ledger_capacity: usize) -> Self {
        Self {
            mod_channel_id: None,
            global_chat_channel_id: None,
            enabled: true,
            delivered_ids: DeliveryLedger::new(ledger_capacity),
        }
    }

    /// The sync channel, if this destination should be polled.
    pub fn sync_channel(&self) -> Option<ChannelRef> {
        if self.enabled {
            self.global_chat_channel_id
        } else {
            None
        }
    }

    /// Both channels chosen by the setup wizard.
    pub fn is_fully_configured(&self) -> bool {
        self.mod_channel_id.is_some() && self.global_chat_channel_id.is_some()
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self::new(crate::store::DEFAULT_LEDGER_CAPACITY)
    }
}

/// Store of all destinations with load/persist lifecycle.
pub struct ConfigStore {
    path: PathBuf,
    ledger_capacity: usize,
    destinations: RwLock<BTreeMap<DestinationId, DestinationConfig>>,
    locks: Mutex<HashMap<DestinationId, Arc<Mutex<()>>>>,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    /// Load the store from `path`. A missing or empty file yields an empty store.
    pub async fn load(path: impl AsRef<Path>, ledger_capacity: usize) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let mut destinations: BTreeMap<DestinationId, DestinationConfig> =
            match tokio::fs::read_to_string(&path).await {
                Ok(content) if content.trim().is_empty() => BTreeMap::new(),
                Ok(content) => {
                    serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                        path: path.display().to_string(),
                        source,
                    })?
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    info!("No store at {}, starting empty", path.display());
                    BTreeMap::new()
                }
                Err(source) => {
                    return Err(StoreError::Io {
                        path: path.display().to_string(),
                        source,
                    })
                }
            };

        for config in destinations.values_mut() {
            config.delivered_ids.set_capacity(ledger_capacity);
        }

        let remembered: usize = destinations
            .values()
            .map(|config| config.delivered_ids.len())
            .sum();
        info!(
            "Loaded {} destination(s) with {} delivered id(s) from {}",
            destinations.len(),
            remembered,
            path.display()
        );

        Ok(Self {
            path,
            ledger_capacity,
            destinations: RwLock::new(destinations),
            locks: Mutex::new(HashMap::new()),
            write_lock: Mutex::new(()),
        })
    }

    /// Rewrite the whole store file from the in-memory state.
    ///
    /// On failure the in-memory state is kept; the next successful persist
    /// brings the file back in line.
    pub async fn persist(&self) -> StoreResult<()> {
        let _writer = self.write_lock.lock().await;

        let json = {
            let destinations = self.destinations.read().await;
            serde_json::to_vec_pretty(&*destinations)?
        };

        let tmp_path = self.path.with_extension("tmp");
        let io_error = |source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        };
        tokio::fs::write(&tmp_path, &json).await.map_err(io_error)?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(io_error)?;

        debug!("Persisted store to {} ({} bytes)", self.path.display(), json.len());
        Ok(())
    }

    /// Acquire the per-destination lock.
    ///
    /// Hold it across any ledger read-modify-write or configuration change of
    /// that destination.
    pub async fn lock_destination(&self, dest: &DestinationId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(dest.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub async fn get(&self, dest: &DestinationId) -> Option<DestinationConfig> {
        self.destinations.read().await.get(dest).cloned()
    }

    /// Snapshot of every destination.
    pub async fn destinations(&self) -> Vec<(DestinationId, DestinationConfig)> {
        self.destinations
            .read()
            .await
            .iter()
            .map(|(id, config)| (id.clone(), config.clone()))
            .collect()
    }

    /// Apply `f` to a destination (creating it if needed) and persist.
    ///
    /// The in-memory change stands even if persisting fails.
    pub async fn update<F>(&self, dest: &DestinationId, f: F) -> StoreResult<DestinationConfig>
    where
        F: FnOnce(&mut DestinationConfig),
    {
        let _guard = self.lock_destination(dest).await;

        let updated = {
            let mut destinations = self.destinations.write().await;
            let config = destinations
                .entry(dest.clone())
                .or_insert_with(|| DestinationConfig::new(self.ledger_capacity));
            f(config);
            config.clone()
        };

        self.persist().await?;
        Ok(updated)
    }

    pub async fn set_mod_channel(
        &self,
        dest: &DestinationId,
        channel: ChannelRef,
    ) -> StoreResult<DestinationConfig> {
        self.update(dest, |config| config.mod_channel_id = Some(channel))
            .await
    }

    pub async fn set_sync_channel(
        &self,
        dest: &DestinationId,
        channel: ChannelRef,
    ) -> StoreResult<DestinationConfig> {
        self.update(dest, |config| config.global_chat_channel_id = Some(channel))
            .await
    }

    pub async fn set_enabled(
        &self,
        dest: &DestinationId,
        enabled: bool,
    ) -> StoreResult<DestinationConfig> {
        self.update(dest, |config| config.enabled = enabled).await
    }

    /// Unconfigure a destination entirely. Returns whether it existed.
    pub async fn remove(&self, dest: &DestinationId) -> StoreResult<bool> {
        let _guard = self.lock_destination(dest).await;
        let existed = self.destinations.write().await.remove(dest).is_some();
        if existed {
            self.persist().await?;
        }
        Ok(existed)
    }

    pub async fn already_delivered(&self, dest: &DestinationId, id: &FeedMessageId) -> bool {
        self.destinations
            .read()
            .await
            .get(dest)
            .map(|config| config.delivered_ids.contains(id))
            .unwrap_or(false)
    }

    /// Record a delivery in memory. Callers hold the destination lock and
    /// persist once per batch.
    pub async fn record_delivered(&self, dest: &DestinationId, id: FeedMessageId) {
        let mut destinations = self.destinations.write().await;
        if let Some(config) = destinations.get_mut(dest) {
            config.delivered_ids.record(id);
        }
    }
}
