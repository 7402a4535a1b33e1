//! Discord bot integration.
//!
//! This module provides the Discord side of the relay: the gateway client,
//! commands and the setup wizard, plus the sink the sync engine posts through.

pub mod client;
pub mod commands;
pub mod format;
pub mod handler;
pub mod setup;
pub mod sink;
pub mod wizard;

// Re-export main types for external use
pub use client::{DiscordBot, DiscordBotBuilder};
pub use sink::DiscordSink;
