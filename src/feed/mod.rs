//! Remote website chat feed.
//!
//! `FeedClient` is the seam the sync engine and the outbound relay talk to;
//! `SupabaseFeed` is the production implementation.

pub mod supabase;

use async_trait::async_trait;

use crate::common::error::FeedResult;
use crate::common::{FeedMessage, FeedMessageId, NewFeedMessage};

pub use supabase::SupabaseFeed;

/// Read and write access to the website chat feed.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// The newest `limit` website-originated messages, newest first.
    async fn fetch_recent_external(&self, limit: usize) -> FeedResult<Vec<FeedMessage>>;

    /// Insert a Discord-originated message. Returns the id the feed assigned.
    async fn submit(&self, message: &NewFeedMessage) -> FeedResult<FeedMessageId>;
}
