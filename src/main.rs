//! Hideout relay - Discord <-> website global chat bridge
//!
//! Mirrors the Hideout website's global chat into a Discord channel per
//! server and relays filtered Discord messages back to the website.
//!
//! Only one instance may run against a given store file.

mod common;
mod config;
mod discord;
mod feed;
mod moderation;
mod relay;
mod store;
mod sync;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use config::{env::get_config_path, load_and_validate, Config};
use discord::{DiscordBot, DiscordBotBuilder, DiscordSink};
use feed::{FeedClient, SupabaseFeed};
use relay::{OutboundRelay, RelaySettings};
use store::ConfigStore;
use sync::{SyncEngine, SyncSettings};

const READY_TIMEOUT: Duration = Duration::from_secs(30);
const ENGINE_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything built before connecting to Discord.
struct Services {
    config: Config,
    store: Arc<ConfigStore>,
    feed: Arc<dyn FeedClient>,
}

async fn bootstrap(config_path: &str) -> common::error::Result<Services> {
    let config = load_and_validate(config_path)?;

    info!("Configuration loaded successfully");
    info!("  Feed: {} (table {})", config.feed.url, config.feed.table);
    info!("  Store: {}", config.store.path);
    info!(
        "  Sync: every {}s, {} messages per fetch",
        config.sync.interval_secs, config.sync.fetch_limit
    );

    let store = Arc::new(ConfigStore::load(&config.store.path, config.sync.ledger_capacity).await?);
    let feed: Arc<dyn FeedClient> = Arc::new(SupabaseFeed::new(&config.feed)?);

    Ok(Services {
        config,
        store,
        feed,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Hideout relay v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let Services {
        config,
        store,
        feed,
    } = bootstrap(&config_path).await.map_err(|e| {
        error!("Startup failed: {}", e);
        error!("Check {} and the HIDEOUT_* environment variables.", config_path);
        e
    })?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ============================================================
    // Start Discord bot
    // ============================================================
    let relay = OutboundRelay::new(feed.clone(), RelaySettings::from(&config.relay));
    let (ready_tx, ready_rx) = oneshot::channel();

    let discord_bot: DiscordBot = DiscordBotBuilder::new(config.discord.clone(), store.clone(), relay)
        .build(ready_tx)
        .await?;

    info!("Starting Discord bot...");
    let mut discord_task = {
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            discord_bot.run(shutdown_rx).await;
        })
    };

    info!("Waiting for Discord to become ready...");
    let context = match tokio::time::timeout(READY_TIMEOUT, ready_rx).await {
        Ok(Ok(context)) => Some(context),
        Ok(Err(_)) => {
            error!("Discord ready signal was dropped before firing - initialization failed");
            None
        }
        Err(_) => {
            error!(
                "Timed out waiting for Discord to become ready ({}s) - initialization failed",
                READY_TIMEOUT.as_secs()
            );
            None
        }
    };

    let Some(context) = context else {
        error!("Failed to initialize Discord client - shutting down");
        // Give a moment for error logs to flush
        tokio::time::sleep(Duration::from_secs(1)).await;
        std::process::exit(1);
    };

    // ============================================================
    // Start sync engine
    // ============================================================
    let sink = Arc::new(DiscordSink::new(
        context.http.clone(),
        context.cache.clone(),
        config.relay.author_format.clone(),
    ));
    let engine = SyncEngine::new(store.clone(), feed, sink, SyncSettings::from(&config.sync));
    let mut engine_task = {
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { engine.run(shutdown_rx).await })
    };

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - stopping...");
            true
        }
        _ = &mut engine_task => {
            error!("Sync engine stopped unexpectedly");
            false
        }
        _ = &mut discord_task => {
            error!("Discord task stopped unexpectedly");
            false
        }
    };

    if let Err(e) = shutdown_tx.send(true) {
        debug!("Shutdown channel closed (all tasks already exited): {}", e);
    }

    if shutdown {
        match tokio::time::timeout(ENGINE_STOP_TIMEOUT, engine_task).await {
            Ok(Ok(())) => info!("Sync engine stopped gracefully"),
            Ok(Err(e)) => warn!("Sync engine task panicked: {}", e),
            Err(_) => warn!("Sync engine did not stop within {}s", ENGINE_STOP_TIMEOUT.as_secs()),
        }
        match tokio::time::timeout(ENGINE_STOP_TIMEOUT, discord_task).await {
            Ok(_) => info!("Discord disconnected"),
            Err(_) => warn!("Discord shutdown timed out"),
        }
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
