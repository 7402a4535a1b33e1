//! Website -> Discord synchronization.

pub mod engine;

use async_trait::async_trait;

use crate::common::error::DeliveryError;
use crate::common::{ChannelRef, FeedMessage};

pub use engine::{SyncEngine, SyncSettings};

/// Where the sync engine delivers website messages.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Whether the channel still exists and is reachable.
    async fn channel_available(&self, channel: ChannelRef) -> bool;

    /// Post one feed message to the channel.
    async fn deliver(&self, channel: ChannelRef, message: &FeedMessage) -> Result<(), DeliveryError>;
}
