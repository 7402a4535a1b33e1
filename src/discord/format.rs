//! Rendering of website messages and notices for Discord.

use serenity::builder::{CreateEmbed, CreateEmbedAuthor};
use serenity::model::{Colour, Timestamp};

use crate::common::{ChannelRef, FeedMessage};

/// Accent colour of relay embeds.
pub const ACCENT: Colour = Colour::BLUE;
/// Colour of the setup-complete embed.
pub const SUCCESS: Colour = Colour::new(0x2ECC71);

/// Substitute the author into a label format such as `%user (Website)`.
pub fn format_author(format: &str, author: &str) -> String {
    format.replace("%user", author)
}

/// Embed shown in a sync channel for one website message.
pub fn delivery_embed(message: &FeedMessage, author_format: &str) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .description(&message.body)
        .author(CreateEmbedAuthor::new(format_author(
            author_format,
            &message.author_name,
        )))
        .colour(ACCENT);

    if let Ok(timestamp) = Timestamp::from_unix_timestamp(message.created_at.timestamp()) {
        embed = embed.timestamp(timestamp);
    }
    embed
}

/// `<#id>` or a placeholder.
pub fn channel_mention(channel: Option<ChannelRef>) -> String {
    match channel {
        Some(channel) => format!("<#{}>", channel),
        None => "Not set".to_string(),
    }
}
