//! Interactive `.setup` flow: embeds, components and wizard sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serenity::builder::{
    CreateActionRow, CreateButton, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, CreateSelectMenu, CreateSelectMenuKind,
};
use serenity::model::application::{ButtonStyle, ComponentInteraction, ComponentInteractionDataKind};
use serenity::model::channel::{ChannelType, Message};
use serenity::model::id::{GuildId, UserId};
use serenity::prelude::*;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::common::{ChannelRef, DestinationId};
use crate::discord::format::{channel_mention, ACCENT, SUCCESS};
use crate::discord::sink::channel_id;
use crate::discord::wizard::{ChannelChoice, SetupWizard, WizardEvent, WizardStep};
use crate::store::{ConfigStore, DestinationConfig};

pub const SESSION_TIMEOUT: Duration = Duration::from_secs(300);

const NEXT_BUTTON_ID: &str = "setup:next";
const CHANNEL_SELECT_ID: &str = "setup:channel";

struct Session {
    wizard: SetupWizard,
    owner: UserId,
    started: Instant,
}

impl Session {
    fn is_expired(&self) -> bool {
        self.started.elapsed() >= SESSION_TIMEOUT
    }
}

/// One wizard per guild; starting a new one replaces the old.
pub struct SetupSessions {
    store: Arc<ConfigStore>,
    sessions: Mutex<HashMap<GuildId, Session>>,
}

impl SetupSessions {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self {
            store,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_setup_component(custom_id: &str) -> bool {
        custom_id == NEXT_BUTTON_ID || custom_id == CHANNEL_SELECT_ID
    }

    /// Post the wizard's first page in reply to `.setup`.
    pub async fn start(&self, ctx: &Context, msg: &Message, guild_id: GuildId) -> anyhow::Result<()> {
        let dest = DestinationId::from(guild_id.get());
        let existing = self.store.get(&dest).await;
        let wizard = existing
            .as_ref()
            .map(SetupWizard::from_config)
            .unwrap_or_default();

        let embed = match existing.as_ref() {
            Some(config) if config.is_fully_configured() => reconfigure_embed(config),
            _ => welcome_embed(),
        };
        let components = render_components(&wizard);

        msg.channel_id
            .send_message(&ctx.http, CreateMessage::new().embed(embed).components(components))
            .await?;

        info!(guild = %dest, "Setup started by {}", msg.author.name);
        self.sessions.lock().await.insert(
            guild_id,
            Session {
                wizard,
                owner: msg.author.id,
                started: Instant::now(),
            },
        );
        Ok(())
    }

    /// Drive the wizard from a button press or channel selection.
    pub async fn handle_component(
        &self,
        ctx: &Context,
        interaction: &ComponentInteraction,
    ) -> anyhow::Result<()> {
        let Some(guild_id) = interaction.guild_id else {
            return Ok(());
        };

        let event = match wizard_event(&interaction.data.kind) {
            Ok(Some(event)) => event,
            Ok(None) => return Ok(()),
            Err(text) => return ephemeral(ctx, interaction, text).await,
        };

        let (wizard, choice) = {
            let mut sessions = self.sessions.lock().await;
            let rejection = match sessions.get(&guild_id) {
                None => Some("No setup in progress. Run `.setup` to start.".to_string()),
                Some(session) if session.is_expired() => {
                    Some("This setup session has expired. Run `.setup` again.".to_string())
                }
                Some(session) if session.owner != interaction.user.id => {
                    Some("Only the administrator who started setup can use this.".to_string())
                }
                Some(_) => None,
            };

            let outcome = match (rejection, sessions.get_mut(&guild_id)) {
                (None, Some(session)) => match session.wizard.apply(event) {
                    Ok(choice) => Ok((session.wizard.clone(), choice)),
                    Err(e) => {
                        debug!(guild = %guild_id, "Wizard event rejected: {}", e);
                        Err(capitalize(&e.to_string()))
                    }
                },
                (rejection, _) => Err(rejection.unwrap_or_default()),
            };

            match outcome {
                Ok((wizard, choice)) => {
                    if wizard.is_finished() {
                        sessions.remove(&guild_id);
                    }
                    (wizard, choice)
                }
                Err(text) => {
                    if sessions.get(&guild_id).is_some_and(Session::is_expired) {
                        sessions.remove(&guild_id);
                    }
                    drop(sessions);
                    return ephemeral(ctx, interaction, &text).await;
                }
            }
        };

        // Discord drops interactions not answered within 3s; persist afterwards.
        let response = CreateInteractionResponseMessage::new()
            .embed(render_embed(&wizard))
            .components(render_components(&wizard));
        let responded = interaction
            .create_response(&ctx.http, CreateInteractionResponse::UpdateMessage(response))
            .await;

        let dest = DestinationId::from(guild_id.get());
        if let Some(choice) = choice {
            let result = match choice {
                ChannelChoice::Moderation(channel) => self.store.set_mod_channel(&dest, channel).await,
                ChannelChoice::Sync(channel) => self.store.set_sync_channel(&dest, channel).await,
            };
            match result {
                Ok(_) => info!(guild = %dest, ?choice, "Setup selection saved"),
                Err(e) => warn!(guild = %dest, "Failed to save setup selection: {}", e),
            }
        }

        responded?;
        if wizard.is_finished() {
            info!(guild = %dest, "Setup complete");
        }
        Ok(())
    }

    /// Drop any wizard in progress for the guild.
    pub async fn cancel(&self, guild_id: GuildId) -> bool {
        self.sessions.lock().await.remove(&guild_id).is_some()
    }
}

/// Map a component payload to a wizard event; `Ok(None)` means not ours.
fn wizard_event(kind: &ComponentInteractionDataKind) -> Result<Option<WizardEvent>, &'static str> {
    match kind {
        ComponentInteractionDataKind::Button => Ok(Some(WizardEvent::Next)),
        ComponentInteractionDataKind::ChannelSelect { values } => match values.first() {
            Some(id) => Ok(Some(WizardEvent::ChannelSelected(ChannelRef(id.get())))),
            None => Err("Select a channel first."),
        },
        _ => Ok(None),
    }
}

async fn ephemeral(
    ctx: &Context,
    interaction: &ComponentInteraction,
    text: &str,
) -> anyhow::Result<()> {
    let response = CreateInteractionResponseMessage::new()
        .content(text)
        .ephemeral(true);
    interaction
        .create_response(&ctx.http, CreateInteractionResponse::Message(response))
        .await?;
    Ok(())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>() + ".",
        None => String::new(),
    }
}

fn welcome_embed() -> CreateEmbed {
    CreateEmbed::new()
        .title("🏠 Hideout Network Bot Setup")
        .description(
            "Welcome to the Hideout Network bot setup!\n\n\
             This bot syncs global chat between Discord and the Hideout website.",
        )
        .field(
            "What this bot does:",
            "• Syncs messages between Discord and the website\n\
             • Applies the same chat filters as the website\n\
             • Keeps your community connected",
            false,
        )
        .colour(ACCENT)
}

fn reconfigure_embed(config: &DestinationConfig) -> CreateEmbed {
    CreateEmbed::new()
        .title("🏠 Hideout Network Bot")
        .description("This server is already configured. Do you want to reconfigure?")
        .field(
            "Current Configuration:",
            configuration_summary(config.mod_channel_id, config.global_chat_channel_id),
            false,
        )
        .colour(ACCENT)
}

fn configuration_summary(mod_channel: Option<ChannelRef>, sync_channel: Option<ChannelRef>) -> String {
    format!(
        "**Mod Channel:** {}\n**Global Chat:** {}",
        channel_mention(mod_channel),
        channel_mention(sync_channel)
    )
}

fn render_embed(wizard: &SetupWizard) -> CreateEmbed {
    match wizard.step() {
        WizardStep::Welcome => welcome_embed(),
        WizardStep::SelectModChannel => CreateEmbed::new()
            .title("📋 Step 1: Moderator Channel")
            .description(
                "Select the channel where moderators can run admin commands.\n\n\
                 Only users with **Administrator** permission can use admin commands.",
            )
            .colour(ACCENT),
        WizardStep::SelectSyncChannel => CreateEmbed::new()
            .title("💬 Step 2: Global Chat Channel")
            .description(
                "Select the channel for global chat.\n\n\
                 **Messages in this channel will be synced with the Hideout website!**\n\n\
                 Messages from the website will appear here, and messages sent here \
                 will appear on the website.",
            )
            .colour(ACCENT),
        WizardStep::Confirmed => CreateEmbed::new()
            .title("✅ Setup Complete!")
            .description("The Hideout Network bot is now configured for this server.")
            .field(
                "Configuration:",
                configuration_summary(wizard.mod_channel(), wizard.sync_channel()),
                false,
            )
            .field(
                "What's Next?",
                "• Messages in the global chat channel will sync with the website\n\
                 • Use `.help` for more commands\n\
                 • Run `.setup` again to reconfigure",
                false,
            )
            .colour(SUCCESS),
    }
}

fn render_components(wizard: &SetupWizard) -> Vec<CreateActionRow> {
    let selected = match wizard.step() {
        WizardStep::SelectModChannel => wizard.mod_channel(),
        WizardStep::SelectSyncChannel => wizard.sync_channel(),
        WizardStep::Welcome | WizardStep::Confirmed => None,
    };

    let mut rows = Vec::new();
    match wizard.step() {
        WizardStep::Confirmed => return rows,
        WizardStep::SelectModChannel | WizardStep::SelectSyncChannel => {
            // Discord lists every text channel itself, so large servers are not truncated.
            let kind = CreateSelectMenuKind::Channel {
                channel_types: Some(vec![ChannelType::Text]),
                default_channels: selected
                    .and_then(|channel| channel_id(channel).ok())
                    .map(|id| vec![id]),
            };
            let menu = CreateSelectMenu::new(CHANNEL_SELECT_ID, kind)
                .placeholder("Select a channel...")
                .min_values(1)
                .max_values(1);
            rows.push(CreateActionRow::SelectMenu(menu));
        }
        WizardStep::Welcome => {}
    }

    let label = if wizard.step() == WizardStep::SelectSyncChannel {
        "Finish Setup ✓"
    } else {
        "Next →"
    };
    rows.push(CreateActionRow::Buttons(vec![CreateButton::new(NEXT_BUTTON_ID)
        .label(label)
        .style(ButtonStyle::Primary)
        .disabled(!wizard.can_advance())]));
    rows
}
