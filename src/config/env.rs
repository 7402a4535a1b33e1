//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `HIDEOUT_DISCORD_TOKEN` - Discord bot token
//! - `HIDEOUT_FEED_URL` - Supabase project URL
//! - `HIDEOUT_FEED_KEY` - Supabase service key
//! - `HIDEOUT_STORE_PATH` - Configuration store file
//! - `HIDEOUT_SYNC_INTERVAL_SECS` - Polling interval
//! - `HIDEOUT_SYNC_FETCH_TIMEOUT_SECS` - Per-destination fetch budget

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "HIDEOUT";

/// Apply environment variable overrides to a config.
///
/// Secrets are expected to come from the environment rather than the file.
pub fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |name| env::var(format!("{}_{}", ENV_PREFIX, name)).ok())
}

fn apply_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(token) = lookup("DISCORD_TOKEN") {
        config.discord.token = token;
    }

    if let Some(url) = lookup("FEED_URL") {
        config.feed.url = url;
    }
    if let Some(key) = lookup("FEED_KEY") {
        config.feed.service_key = key;
    }

    if let Some(path) = lookup("STORE_PATH") {
        config.store.path = path;
    }
    if let Some(interval) = lookup("SYNC_INTERVAL_SECS") {
        if let Ok(interval) = interval.parse() {
            config.sync.interval_secs = interval;
        }
    }
    if let Some(timeout) = lookup("SYNC_FETCH_TIMEOUT_SECS") {
        if let Ok(timeout) = timeout.parse() {
            config.sync.fetch_timeout_secs = timeout;
        }
    }

    config
}

/// Check if any required environment variables are set but empty.
///
/// Returns a list of variable names that are set but empty.
pub fn check_empty_env_vars() -> Vec<String> {
    let vars = [
        format!("{}_DISCORD_TOKEN", ENV_PREFIX),
        format!("{}_FEED_URL", ENV_PREFIX),
        format!("{}_FEED_KEY", ENV_PREFIX),
    ];

    vars.into_iter()
        .filter(|var| env::var(var).map(|v| v.is_empty()).unwrap_or(false))
        .collect()
}

/// Get the config file path from environment or use default.
///
/// Checks `HIDEOUT_CONFIG` environment variable, otherwise returns "hideout.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "hideout.conf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(ENV_PREFIX, "HIDEOUT");
    }

    #[test]
    fn test_no_overrides() {
        let mut config = Config::default();
        config.discord.token = "original_token".to_string();

        let result = apply_overrides(config, lookup_from(&[]));
        assert_eq!(result.discord.token, "original_token");
        assert_eq!(result.sync.interval_secs, 5);
    }

    #[test]
    fn test_overrides_applied() {
        let result = apply_overrides(
            Config::default(),
            lookup_from(&[
                ("DISCORD_TOKEN", "tok"),
                ("FEED_URL", "https://x.supabase.co"),
                ("FEED_KEY", "secret"),
                ("STORE_PATH", "/tmp/data.json"),
                ("SYNC_INTERVAL_SECS", "12"),
            ]),
        );

        assert_eq!(result.discord.token, "tok");
        assert_eq!(result.feed.url, "https://x.supabase.co");
        assert_eq!(result.feed.service_key, "secret");
        assert_eq!(result.store.path, "/tmp/data.json");
        assert_eq!(result.sync.interval_secs, 12);
    }

    #[test]
    fn test_short_interval_from_env_validates() {
        let mut config = Config::default();
        config.discord.token = "tok".to_string();
        config.feed.url = "https://x.supabase.co".to_string();
        config.feed.service_key = "secret".to_string();

        let result = apply_overrides(
            config,
            lookup_from(&[("SYNC_INTERVAL_SECS", "3"), ("SYNC_FETCH_TIMEOUT_SECS", "2")]),
        );

        assert_eq!(result.sync.interval_secs, 3);
        assert_eq!(result.sync.fetch_timeout_secs, 2);
        assert!(crate::config::validate::validate_config(&result).is_ok());
    }

    #[test]
    fn test_unparsable_interval_ignored() {
        let result = apply_overrides(Config::default(), lookup_from(&[("SYNC_INTERVAL_SECS", "soon")]));
        assert_eq!(result.sync.interval_secs, 5);
    }
}
