//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::Config;

const PLACEHOLDERS: &[&str] = &[
    "YOUR_DISCORD_TOKEN_HERE",
    "YOUR_SUPABASE_URL_HERE",
    "YOUR_SERVICE_KEY_HERE",
];

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Credentials
    check_secret(&mut errors, "discord.token", &config.discord.token);
    check_secret(&mut errors, "feed.url", &config.feed.url);
    check_secret(&mut errors, "feed.service_key", &config.feed.service_key);

    if !config.feed.url.is_empty()
        && !config.feed.url.starts_with("https://")
        && !config.feed.url.starts_with("http://")
    {
        errors.push(format!(
            "feed.url must be an http(s) URL (got '{}')",
            config.feed.url
        ));
    }
    if config.feed.table.is_empty() {
        errors.push("feed.table is required".to_string());
    }
    if config.feed.request_timeout_secs == 0 {
        errors.push("feed.request_timeout_secs must be non-zero".to_string());
    }

    if config.discord.command_prefix.is_empty() {
        errors.push("discord.command_prefix must not be empty".to_string());
    }

    // Sync loop
    if config.sync.interval_secs == 0 {
        errors.push("sync.interval_secs must be non-zero".to_string());
    }
    if config.sync.fetch_limit == 0 {
        errors.push("sync.fetch_limit must be non-zero".to_string());
    }
    if config.sync.ledger_capacity == 0 {
        errors.push("sync.ledger_capacity must be non-zero".to_string());
    }
    if config.sync.fetch_timeout_secs == 0 {
        errors.push("sync.fetch_timeout_secs must be non-zero".to_string());
    } else if config.sync.fetch_timeout_secs >= config.sync.interval_secs {
        errors.push(format!(
            "sync.fetch_timeout_secs ({}) must be shorter than sync.interval_secs ({})",
            config.sync.fetch_timeout_secs, config.sync.interval_secs
        ));
    }

    // Relay
    if config.relay.max_message_length == 0 {
        errors.push("relay.max_message_length must be non-zero".to_string());
    }
    if !config.relay.author_format.contains("%user") {
        errors.push("relay.author_format must contain %user".to_string());
    }

    if config.store.path.is_empty() {
        errors.push("store.path is required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

fn check_secret(errors: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{} is required", field));
    } else if PLACEHOLDERS.contains(&value) {
        errors.push(format!(
            "{} has not been configured (still using placeholder)",
            field
        ));
    }
}

/// Quick check if config has the minimum required fields populated.
pub fn has_required_fields(config: &Config) -> bool {
    !config.discord.token.is_empty()
        && !config.feed.url.is_empty()
        && !config.feed.service_key.is_empty()
}
