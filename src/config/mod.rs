//! Configuration parsing and types.
//!
//! Settings come from an optional HOCON file, then environment overrides,
//! then validation. Any problem here is fatal at startup.

pub mod env;
pub mod parser;
pub mod types;
pub mod validate;

use std::path::Path;

use tracing::{info, warn};

use crate::common::error::ConfigError;

pub use parser::load_config;
pub use types::*;

/// Load the settings file (if present), apply environment overrides and validate.
pub fn load_and_validate(path: &str) -> Result<Config, ConfigError> {
    let config = if Path::new(path).exists() {
        load_config(path)?
    } else {
        info!("No settings file at {}, using defaults and environment", path);
        Config::default()
    };

    for var in env::check_empty_env_vars() {
        warn!("Environment variable {} is set but empty", var);
    }

    let config = env::apply_env_overrides(config);
    if !validate::has_required_fields(&config) {
        warn!("Required credentials are missing; set them in the environment");
    }
    validate::validate_config(&config)?;
    Ok(config)
}
