//! Discord bot commands (.setup, .setup reset, .help, .sync).
//!
//! Handles command parsing and execution for prefix commands.

use std::sync::Arc;

use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::model::channel::Message;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use tracing::{debug, info};

use crate::common::DestinationId;
use crate::discord::format::{channel_mention, ACCENT};
use crate::discord::setup::SetupSessions;
use crate::store::ConfigStore;

/// A recognised prefix command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Setup,
    /// `.setup reset` forgets the server's configuration.
    Reset,
    Help,
    /// `.sync on|off`; `None` shows the current state.
    Sync(Option<bool>),
    /// A known command with an argument it does not take.
    Usage(String),
}

/// Parse `content` as a command for `prefix`.
pub fn parse_command(prefix: &str, content: &str) -> Option<BotCommand> {
    if content.len() > 100 {
        return None;
    }
    let rest = content.strip_prefix(prefix)?;

    let mut parts = rest.split_whitespace();
    let command = parts.next()?.to_lowercase();
    let arg = parts.next().map(|s| s.to_lowercase());

    let command = match command.as_str() {
        "setup" => match arg.as_deref() {
            None => BotCommand::Setup,
            Some("reset") => BotCommand::Reset,
            Some(_) => BotCommand::Usage(format!("{prefix}setup [reset]")),
        },
        "help" => BotCommand::Help,
        "sync" => match arg.as_deref() {
            None => BotCommand::Sync(None),
            Some("on") | Some("enable") => BotCommand::Sync(Some(true)),
            Some("off") | Some("disable") => BotCommand::Sync(Some(false)),
            Some(_) => BotCommand::Usage(format!("{prefix}sync on|off")),
        },
        _ => return None,
    };
    Some(command)
}

/// Command handler for Discord bot.
pub struct CommandHandler {
    prefix: String,
    store: Arc<ConfigStore>,
    setup: Arc<SetupSessions>,
}

impl CommandHandler {
    pub fn new(prefix: String, store: Arc<ConfigStore>, setup: Arc<SetupSessions>) -> Self {
        Self {
            prefix,
            store,
            setup,
        }
    }

    /// Parse and execute a command from Discord.
    ///
    /// Returns `true` if the message was a command, `false` otherwise.
    pub async fn handle_command(
        &self,
        ctx: &Context,
        msg: &Message,
        content: &str,
    ) -> anyhow::Result<bool> {
        let Some(command) = parse_command(&self.prefix, content) else {
            return Ok(false);
        };
        let Some(guild_id) = msg.guild_id else {
            return Ok(false);
        };

        debug!("Processing command {:?} from {}", command, msg.author.name);

        match command {
            BotCommand::Help => self.handle_help(ctx, msg).await?,
            BotCommand::Setup => {
                if self.require_admin(ctx, msg).await? {
                    self.setup.start(ctx, msg, guild_id).await?;
                }
            }
            BotCommand::Reset => {
                if self.require_admin(ctx, msg).await? {
                    self.handle_reset(ctx, msg, guild_id).await?;
                }
            }
            BotCommand::Sync(state) => {
                if self.require_admin(ctx, msg).await? {
                    self.handle_sync(ctx, msg, guild_id, state).await?;
                }
            }
            BotCommand::Usage(usage) => {
                msg.channel_id
                    .say(&ctx.http, format!("Usage: `{}`", usage))
                    .await?;
            }
        }
        Ok(true)
    }

    async fn require_admin(&self, ctx: &Context, msg: &Message) -> anyhow::Result<bool> {
        let is_admin = msg
            .author_permissions(&ctx.cache)
            .map(|permissions| permissions.administrator())
            .unwrap_or(false);

        if !is_admin {
            info!("Denied admin command from {}", msg.author.name);
            msg.channel_id
                .say(&ctx.http, "You need **Administrator** permission to do that.")
                .await?;
        }
        Ok(is_admin)
    }

    /// Handle .setup reset.
    async fn handle_reset(&self, ctx: &Context, msg: &Message, guild_id: GuildId) -> anyhow::Result<()> {
        let dest = DestinationId::from(guild_id.get());
        self.setup.cancel(guild_id).await;

        let reply = if self.store.remove(&dest).await? {
            info!(guild = %dest, "Configuration reset by {}", msg.author.name);
            format!("Configuration removed. Run `{}setup` to configure again.", self.prefix)
        } else {
            "This server is not configured.".to_string()
        };

        msg.channel_id.say(&ctx.http, reply).await?;
        Ok(())
    }

    /// Handle .sync [on|off].
    async fn handle_sync(
        &self,
        ctx: &Context,
        msg: &Message,
        guild_id: GuildId,
        state: Option<bool>,
    ) -> anyhow::Result<()> {
        let dest = DestinationId::from(guild_id.get());

        let reply = match (state, self.store.get(&dest).await) {
            (_, None) => format!("This server is not configured yet. Run `{}setup` first.", self.prefix),
            (None, Some(config)) => format!(
                "Sync is **{}** for {}.",
                if config.enabled { "on" } else { "off" },
                channel_mention(config.global_chat_channel_id)
            ),
            (Some(enabled), Some(_)) => {
                self.store.set_enabled(&dest, enabled).await?;
                info!(guild = %dest, enabled, "Sync toggled by {}", msg.author.name);
                msg.react(&ctx.http, '👀').await.ok();
                format!("Sync is now **{}**.", if enabled { "on" } else { "off" })
            }
        };

        msg.channel_id.say(&ctx.http, reply).await?;
        Ok(())
    }

    /// Handle .help command.
    async fn handle_help(&self, ctx: &Context, msg: &Message) -> anyhow::Result<()> {
        let p = &self.prefix;
        let embed = CreateEmbed::new()
            .title("🏠 Hideout Network Bot Help")
            .description("This bot syncs global chat between Discord and the Hideout website.")
            .field(
                "Commands:",
                format!(
                    "`{p}setup` - Configure the bot (Admin only)\n\
                     `{p}setup reset` - Forget this server's configuration (Admin only)\n\
                     `{p}sync on|off` - Pause or resume syncing (Admin only)\n\
                     `{p}help` - Show this help message"
                ),
                false,
            )
            .field(
                "How it works:",
                "Messages sent in the configured global chat channel are synced to the \
                 Hideout website, and messages from the website appear in Discord.",
                false,
            )
            .field(
                "Chat Rules:",
                "• Same filters as the website apply\n\
                 • Inappropriate messages are automatically blocked\n\
                 • Be respectful to everyone",
                false,
            )
            .colour(ACCENT);

        msg.channel_id
            .send_message(&ctx.http, CreateMessage::new().embed(embed))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command(".", ".setup"), Some(BotCommand::Setup));
        assert_eq!(parse_command(".", ".HELP"), Some(BotCommand::Help));
        assert_eq!(parse_command(".", ".sync"), Some(BotCommand::Sync(None)));
        assert_eq!(parse_command(".", ".sync off"), Some(BotCommand::Sync(Some(false))));
        assert_eq!(parse_command(".", ".sync on"), Some(BotCommand::Sync(Some(true))));
        assert_eq!(parse_command(".", ".setup reset"), Some(BotCommand::Reset));
        assert_eq!(parse_command(".", ".Setup RESET"), Some(BotCommand::Reset));
    }

    #[test]
    fn test_bad_arguments_get_usage() {
        // Must not fall through and be relayed to the website.
        assert_eq!(
            parse_command(".", ".sync maybe"),
            Some(BotCommand::Usage(".sync on|off".to_string()))
        );
        assert_eq!(
            parse_command("!", "!setup now"),
            Some(BotCommand::Usage("!setup [reset]".to_string()))
        );
    }

    #[test]
    fn test_non_commands() {
        assert_eq!(parse_command(".", "setup"), None);
        assert_eq!(parse_command(".", "..."), None);
        assert_eq!(parse_command(".", ". setup"), Some(BotCommand::Setup));
        assert_eq!(parse_command(".", ".who"), None);
        assert_eq!(parse_command("!", ".setup"), None);
    }

    #[test]
    fn test_long_messages_are_not_commands() {
        let long = format!(".setup {}", "x".repeat(200));
        assert_eq!(parse_command(".", &long), None);
    }
}
