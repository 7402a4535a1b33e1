//! Shared types used across the relay.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifies one destination (a Discord guild, keyed by its decimal id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(String);

impl From<u64> for DestinationId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A channel on the chat platform.
///
/// Persisted as a decimal string; numbers are accepted on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelRef(pub u64);

impl ChannelRef {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ChannelRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for ChannelRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::Number(n) => Ok(Self(n)),
            StringOrNumber::String(s) => s
                .trim()
                .parse()
                .map(Self)
                .map_err(|_| serde::de::Error::custom(format!("invalid channel id '{}'", s))),
        }
    }
}

/// Feed ids are integers or strings depending on the backing table; we keep
/// the canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FeedMessageId(String);

impl FeedMessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for FeedMessageId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for FeedMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FeedMessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::Number(n) => Self(n.to_string()),
            StringOrNumber::String(s) => Self(s),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Number(u64),
    String(String),
}

/// Where a feed message was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    /// Posted on the website.
    External,
    /// Relayed from Discord by this service.
    Local,
}

impl MessageOrigin {
    /// The `source` column value used by the feed.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::External => "website",
            Self::Local => "discord",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "website" => Some(Self::External),
            "discord" => Some(Self::Local),
            _ => None,
        }
    }
}

/// A message retrieved from the remote feed. Immutable once fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedMessage {
    pub id: FeedMessageId,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub origin: MessageOrigin,
}

/// A locally originated message on its way to the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedMessage {
    pub author_name: String,
    pub body: String,
}

impl NewFeedMessage {
    /// Outbound messages are always tagged local.
    pub fn origin(&self) -> MessageOrigin {
        MessageOrigin::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_ref_accepts_string_and_number() {
        let from_str: ChannelRef = serde_json::from_str("\"123456789\"").unwrap();
        let from_num: ChannelRef = serde_json::from_str("123456789").unwrap();
        assert_eq!(from_str, ChannelRef(123456789));
        assert_eq!(from_num, ChannelRef(123456789));
        assert_eq!(serde_json::to_string(&from_num).unwrap(), "\"123456789\"");
    }

    #[test]
    fn test_channel_ref_rejects_garbage() {
        assert!(serde_json::from_str::<ChannelRef>("\"general\"").is_err());
    }

    #[test]
    fn test_feed_message_id_canonical_form() {
        let numeric: FeedMessageId = serde_json::from_str("42").unwrap();
        let text: FeedMessageId = serde_json::from_str("\"9b1c-42\"").unwrap();
        assert_eq!(numeric, FeedMessageId::from(42));
        assert_eq!(text.as_str(), "9b1c-42");
    }

    #[test]
    fn test_origin_wire_tags() {
        assert_eq!(MessageOrigin::from_wire("website"), Some(MessageOrigin::External));
        assert_eq!(MessageOrigin::from_wire("discord"), Some(MessageOrigin::Local));
        assert_eq!(MessageOrigin::from_wire("irc"), None);
        assert_eq!(MessageOrigin::Local.as_wire(), "discord");
    }
}
