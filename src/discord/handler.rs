//! Discord message event handling.
//!
//! Routes commands to the command handler and sync-channel messages to the
//! outbound relay.

use std::sync::Arc;

use serenity::model::application::Interaction;
use serenity::model::channel::Message;
use serenity::prelude::*;
use tracing::{debug, error};

use crate::common::{ChannelRef, DestinationId};
use crate::discord::commands::CommandHandler;
use crate::discord::setup::SetupSessions;
use crate::discord::sink::DiscordOrigin;
use crate::relay::{LocalMessage, OutboundRelay, RelayOutcome};
use crate::store::ConfigStore;

/// Discord event handler.
pub struct RelayHandler {
    store: Arc<ConfigStore>,
    relay: OutboundRelay,
    command_handler: CommandHandler,
    setup: Arc<SetupSessions>,
}

impl RelayHandler {
    pub fn new(
        store: Arc<ConfigStore>,
        relay: OutboundRelay,
        command_handler: CommandHandler,
        setup: Arc<SetupSessions>,
    ) -> Self {
        Self {
            store,
            relay,
            command_handler,
            setup,
        }
    }

    pub async fn handle_message(&self, ctx: Context, msg: Message) {
        // Ignore our own messages and other bots, including website embeds.
        if msg.author.bot || msg.author.id == ctx.cache.current_user().id {
            return;
        }

        // Only handle guild (server) messages
        let Some(guild_id) = msg.guild_id else {
            return;
        };

        let content = msg.content.trim();
        match self.command_handler.handle_command(&ctx, &msg, content).await {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                error!("Command handler error: {}", e);
                return;
            }
        }

        let dest = DestinationId::from(guild_id.get());
        let sync_channel = self.store.get(&dest).await.and_then(|c| c.sync_channel());
        if sync_channel != Some(ChannelRef(msg.channel_id.get())) {
            return;
        }

        let local = LocalMessage {
            author_name: display_name(&msg),
            body: msg.content.clone(),
        };
        let origin = DiscordOrigin::new(ctx.http.clone(), msg);

        match self.relay.relay(&local, &origin).await {
            RelayOutcome::Ignored => debug!(guild = %dest, "Nothing to relay"),
            outcome => debug!(guild = %dest, ?outcome, "Relay finished"),
        }
    }

    pub async fn handle_interaction(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Component(component) = interaction else {
            return;
        };
        if !SetupSessions::is_setup_component(&component.data.custom_id) {
            return;
        }

        if let Err(e) = self.setup.handle_component(&ctx, &component).await {
            error!("Setup interaction error: {}", e);
        }
    }
}

/// Name shown on the website: server nickname, then global name, then username.
fn display_name(msg: &Message) -> String {
    msg.member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .or_else(|| msg.author.global_name.clone())
        .unwrap_or_else(|| msg.author.name.clone())
}
