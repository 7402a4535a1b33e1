//! Discord bot client abstraction.
//!
//! Provides a high-level interface for creating and running the Discord bot,
//! hiding serenity implementation details from the rest of the application.

use std::sync::Arc;
use std::time::Duration;

use backon::BackoffBuilder;
use serenity::async_trait;
use serenity::http::HttpBuilder;
use serenity::model::application::Interaction;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::types::DiscordConfig;
use crate::discord::commands::CommandHandler;
use crate::discord::handler::RelayHandler;
use crate::discord::setup::SetupSessions;
use crate::relay::OutboundRelay;
use crate::store::ConfigStore;

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub enum DiscordBotEvent {
    /// Bot connected and ready.
    Ready { context: Context, ready: Ready },
    /// Message received.
    Message { context: Context, message: Message },
    /// Button press or select menu choice.
    Interaction {
        context: Context,
        interaction: Interaction,
    },
    Disconnected,
}

struct DiscordBotEvents {
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
}

impl DiscordBotEvents {
    fn new(discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>) -> Self {
        Self { discord_events_tx }
    }

    fn forward(&self, event: DiscordBotEvent) {
        if let Err(error) = self.discord_events_tx.send(event) {
            warn!("Failed to process discord event: {}", error);
        }
    }
}

#[async_trait]
impl EventHandler for DiscordBotEvents {
    async fn ready(&self, context: Context, ready: Ready) {
        self.forward(DiscordBotEvent::Ready { context, ready });
    }

    async fn message(&self, context: Context, message: Message) {
        self.forward(DiscordBotEvent::Message { context, message });
    }

    async fn interaction_create(&self, context: Context, interaction: Interaction) {
        self.forward(DiscordBotEvent::Interaction {
            context,
            interaction,
        });
    }
}

/// Builder for creating the Discord bot.
pub struct DiscordBotBuilder {
    config: DiscordConfig,
    store: Arc<ConfigStore>,
    relay: OutboundRelay,
}

impl DiscordBotBuilder {
    /// Create a new Discord bot builder.
    pub fn new(config: DiscordConfig, store: Arc<ConfigStore>, relay: OutboundRelay) -> Self {
        Self {
            config,
            store,
            relay,
        }
    }

    /// Build the Discord bot.
    ///
    /// `ready_tx` receives the gateway context the first time the bot is ready.
    pub async fn build(self, ready_tx: oneshot::Sender<Context>) -> anyhow::Result<DiscordBot> {
        let (discord_events_tx, discord_events_rx) = mpsc::unbounded_channel::<DiscordBotEvent>();

        let client = build_client(&self.config.token, discord_events_tx.clone()).await?;

        let setup = Arc::new(SetupSessions::new(self.store.clone()));
        let command_handler = CommandHandler::new(
            self.config.command_prefix.clone(),
            self.store.clone(),
            setup.clone(),
        );
        let handler = Arc::new(RelayHandler::new(self.store, self.relay, command_handler, setup));

        Ok(DiscordBot {
            client: Some(client),
            token: self.config.token,
            handler,
            discord_events_rx,
            discord_events_tx,
            ready_tx: Some(ready_tx),
        })
    }
}

async fn build_client(
    token: &str,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
) -> anyhow::Result<Client> {
    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILDS;

    // Build a custom reqwest client with timeout settings
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let http = HttpBuilder::new(token).client(reqwest_client).build();

    let events = DiscordBotEvents::new(discord_events_tx);
    let client = serenity::client::ClientBuilder::new_with_http(http, intents)
        .event_handler(events)
        .await?;
    Ok(client)
}

pub struct DiscordBot {
    client: Option<Client>,
    token: String,
    handler: Arc<RelayHandler>,
    discord_events_rx: mpsc::UnboundedReceiver<DiscordBotEvent>,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
    ready_tx: Option<oneshot::Sender<Context>>,
}

impl DiscordBot {
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        // Extract shard manager before we move client into run_connection
        let shard_manager = self.client.as_ref().map(|c| c.shard_manager.clone());
        let client = &mut self.client;
        let discord_events_rx = &mut self.discord_events_rx;
        let handler = &self.handler;
        let ready_tx = &mut self.ready_tx;
        let mut events_shutdown_rx = shutdown_rx.clone();

        tokio::select! {
            _ = Self::run_connection(client, &self.token, &self.discord_events_tx) => {},
            _ = Self::process_events(discord_events_rx, handler, ready_tx, &mut events_shutdown_rx) => {},
            _ = async {
                // Wait for shutdown signal
                loop {
                    if shutdown_rx.changed().await.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                // Gracefully shutdown Discord gateway
                if let Some(ref manager) = shard_manager {
                    info!("Initiating graceful Discord shutdown...");
                    manager.shutdown_all().await;
                    info!("Discord shutdown complete");
                }
            } => {}
        }
        info!("Discord task ended");
    }

    async fn run_connection(
        client: &mut Option<Client>,
        token: &str,
        discord_events_tx: &mpsc::UnboundedSender<DiscordBotEvent>,
    ) {
        /// Create an exponential backoff iterator for Discord reconnection.
        /// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
        fn discord_backoff() -> impl Iterator<Item = Duration> {
            backon::ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(5))
                .with_max_delay(MAX_RECONNECT_DELAY)
                .with_factor(1.1)
                .with_jitter()
                .without_max_times()
                .build()
        }

        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord...");

            let mut client = match client.take() {
                Some(client) => client,
                None => {
                    // serenity mostly handles reconnections itself.
                    match build_client(token, discord_events_tx.clone()).await {
                        Ok(client) => {
                            backoff = discord_backoff();
                            client
                        }
                        Err(e) => {
                            error!("Failed to rebuild Discord client: {}", e);
                            let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                            warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                            sleep(delay).await;
                            continue;
                        }
                    }
                }
            };

            match client.start().await {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    if let Err(error) = discord_events_tx.send(DiscordBotEvent::Disconnected) {
                        warn!("Failed to process discord event: {}", error);
                    }
                    break;
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                    warn!(
                        "Discord disconnected. Reconnecting in {:.1}s...",
                        delay.as_secs_f64(),
                    );
                    if let Err(error) = discord_events_tx.send(DiscordBotEvent::Disconnected) {
                        warn!("Failed to process discord event: {}", error);
                    }
                    sleep(delay).await;
                }
            }
        }
    }

    async fn process_events(
        discord_events_rx: &mut mpsc::UnboundedReceiver<DiscordBotEvent>,
        handler: &Arc<RelayHandler>,
        ready_tx: &mut Option<oneshot::Sender<Context>>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                event = discord_events_rx.recv() => {
                    match event {
                        Some(DiscordBotEvent::Ready { context, ready }) => {
                            info!(
                                "Discord bot connected as {} ({} guild(s))",
                                ready.user.name,
                                ready.guilds.len()
                            );
                            if let Some(tx) = ready_tx.take() {
                                if tx.send(context).is_err() {
                                    warn!("Nobody is waiting for the ready signal");
                                }
                            }
                        }
                        // Relays wait on the website and component interactions must be
                        // answered within 3s, so neither may hold up the event loop.
                        Some(DiscordBotEvent::Message { context, message }) => {
                            let handler = handler.clone();
                            tokio::spawn(async move {
                                handler.handle_message(context, message).await;
                            });
                        }
                        Some(DiscordBotEvent::Interaction { context, interaction }) => {
                            let handler = handler.clone();
                            tokio::spawn(async move {
                                handler.handle_interaction(context, interaction).await;
                            });
                        }
                        Some(DiscordBotEvent::Disconnected) => {
                            debug!("Discord connection lost");
                        }
                        None => {
                            debug!("Discord events channel closed.");
                            break;
                        }
                    }
                }

                // Shutdown signal
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping event processing");
                        break;
                    }
                }
            }
        }
    }
}
