//! Discord implementations of the delivery sink and origin actions.

use std::sync::Arc;
use std::time::Duration;

use serenity::builder::CreateMessage;
use serenity::cache::Cache;
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::id::ChannelId;
use serenity::model::mention::Mentionable;
use tracing::{debug, warn};

use crate::common::error::DeliveryError;
use crate::common::{ChannelRef, FeedMessage};
use crate::discord::format::delivery_embed;
use crate::relay::{Ack, OriginActions};
use crate::sync::DeliverySink;

/// Zero is not a valid snowflake and would panic in `ChannelId::new`.
pub(crate) fn channel_id(channel: ChannelRef) -> Result<ChannelId, DeliveryError> {
    if channel.get() == 0 {
        return Err(DeliveryError::ChannelUnavailable { channel_id: 0 });
    }
    Ok(ChannelId::new(channel.get()))
}

/// Whether any cached guild owns the channel.
fn cached_guild_channel(cache: &Cache, id: ChannelId) -> bool {
    cache.guilds().into_iter().any(|guild_id| {
        cache
            .guild(guild_id)
            .is_some_and(|guild| guild.channels.contains_key(&id))
    })
}

/// Posts website messages into sync channels.
pub struct DiscordSink {
    http: Arc<Http>,
    cache: Arc<Cache>,
    author_format: String,
}

impl DiscordSink {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, author_format: String) -> Self {
        Self {
            http,
            cache,
            author_format,
        }
    }
}

#[serenity::async_trait]
impl DeliverySink for DiscordSink {
    async fn channel_available(&self, channel: ChannelRef) -> bool {
        let Ok(id) = channel_id(channel) else {
            return false;
        };

        if cached_guild_channel(&self.cache, id) {
            return true;
        }

        // Not cached (e.g. right after a reconnect); ask the API.
        match id.to_channel(&self.http).await {
            Ok(_) => true,
            Err(e) => {
                debug!(channel = %channel, "Channel lookup failed: {}", e);
                false
            }
        }
    }

    async fn deliver(&self, channel: ChannelRef, message: &FeedMessage) -> Result<(), DeliveryError> {
        let id = channel_id(channel)?;
        let embed = delivery_embed(message, &self.author_format);
        id.send_message(&self.http, CreateMessage::new().embed(embed))
            .await?;
        Ok(())
    }
}

/// Side effects on one message posted in a sync channel.
pub struct DiscordOrigin {
    http: Arc<Http>,
    message: Message,
}

impl DiscordOrigin {
    pub fn new(http: Arc<Http>, message: Message) -> Self {
        Self { http, message }
    }
}

#[serenity::async_trait]
impl OriginActions for DiscordOrigin {
    async fn suppress(&self) -> Result<(), DeliveryError> {
        self.message.delete(&self.http).await?;
        Ok(())
    }

    async fn notify_transient(&self, text: &str, ttl: Duration) -> Result<(), DeliveryError> {
        let notice = self
            .message
            .channel_id
            .say(&self.http, format!("{} {}", self.message.author.mention(), text))
            .await?;

        let http = self.http.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Err(e) = notice.delete(&http).await {
                warn!("Failed to remove notice: {}", e);
            }
        });
        Ok(())
    }

    async fn acknowledge(&self, ack: Ack) -> Result<(), DeliveryError> {
        self.message.react(&self.http, ack.emoji()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_channel_rejected() {
        assert!(matches!(
            channel_id(ChannelRef(0)),
            Err(DeliveryError::ChannelUnavailable { channel_id: 0 })
        ));
        assert_eq!(channel_id(ChannelRef(42)).unwrap(), ChannelId::new(42));
    }

    #[test]
    fn test_empty_cache_owns_no_channels() {
        let cache = Cache::new();
        assert!(!cached_guild_channel(&cache, ChannelId::new(42)));
    }
}
