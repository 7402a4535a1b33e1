//! Configuration type definitions.

use serde::Deserialize;

use crate::store::DEFAULT_LEDGER_CAPACITY;

/// Root configuration structure. Every section may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discord: DiscordConfig,
    pub feed: FeedConfig,
    pub sync: SyncConfig,
    pub relay: RelayConfig,
    pub store: StoreConfig,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub token: String,
    /// Prefix for text commands (`.setup`, `.help`).
    pub command_prefix: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            command_prefix: ".".to_string(),
        }
    }
}

/// Website feed (Supabase) connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub service_key: String,
    pub table: String,
    pub request_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_key: String::new(),
            table: "global_chat".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Polling behaviour of the sync engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_secs: u64,
    /// How many of the newest website messages each tick looks at.
    pub fetch_limit: usize,
    /// Upper bound for one destination's feed fetch.
    pub fetch_timeout_secs: u64,
    /// How many delivered ids each destination remembers.
    pub ledger_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            fetch_limit: 10,
            fetch_timeout_secs: 4,
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
        }
    }
}

/// Discord -> website relay settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// The website rejects longer messages.
    pub max_message_length: usize,
    /// Lifetime of the "message not sent" notice.
    pub notice_ttl_secs: u64,
    /// Author label of website messages shown in Discord.
    pub author_format: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_message_length: 500,
            notice_ttl_secs: 5,
            author_format: "%user (Website)".to_string(),
        }
    }
}

/// Configuration store location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "data.json".to_string(),
        }
    }
}
