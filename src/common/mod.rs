//! Common types and errors shared across the relay.

pub mod error;
pub mod types;

pub use types::{ChannelRef, DestinationId, FeedMessage, FeedMessageId, MessageOrigin, NewFeedMessage};
