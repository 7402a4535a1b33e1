//! Screening and submission of messages posted in a sync channel.
//!
//! Only Discord -> website traffic is filtered. Website messages are
//! delivered to Discord verbatim by the sync engine.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::common::error::DeliveryError;
use crate::common::{FeedMessageId, NewFeedMessage};
use crate::config::types::RelayConfig;
use crate::feed::FeedClient;
use crate::moderation::ContentFilter;
use crate::relay::{Ack, OriginActions};

pub const BLOCKED_NOTICE: &str = "Your message contains inappropriate content and was not sent.";
pub const BLOCKED_NAME_NOTICE: &str =
    "Your display name contains inappropriate content, so your message was not sent.";

/// A message posted in a sync channel by a human.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMessage {
    /// Display name shown on the website.
    pub author_name: String,
    pub body: String,
}

/// What happened to a local message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Nothing to relay (attachment-only or whitespace).
    Ignored,
    /// Rejected by the content filter and removed.
    Blocked,
    /// Longer than the website accepts.
    TooLong,
    Submitted(FeedMessageId),
    SubmissionFailed,
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub max_message_length: usize,
    pub notice_ttl: Duration,
}

impl From<&RelayConfig> for RelaySettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            max_message_length: config.max_message_length,
            notice_ttl: Duration::from_secs(config.notice_ttl_secs),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

/// Forwards filtered local messages to the feed.
pub struct OutboundRelay {
    feed: Arc<dyn FeedClient>,
    filter: &'static ContentFilter,
    settings: RelaySettings,
}

impl OutboundRelay {
    pub fn new(feed: Arc<dyn FeedClient>, settings: RelaySettings) -> Self {
        Self {
            feed,
            filter: ContentFilter::standard(),
            settings,
        }
    }

    /// Screen one local message and submit it if it passes.
    ///
    /// A blocked message is never submitted, regardless of whether removing
    /// it from the channel succeeded.
    pub async fn relay(&self, message: &LocalMessage, origin: &dyn OriginActions) -> RelayOutcome {
        if message.body.trim().is_empty() {
            return RelayOutcome::Ignored;
        }

        if let Some(reason) = self.filter.find_violation(&message.body) {
            info!(author = %message.author_name, ?reason, "Blocked Discord message");
            self.reject(origin, BLOCKED_NOTICE).await;
            return RelayOutcome::Blocked;
        }

        if self.filter.is_blocked(&message.author_name) {
            info!(author = %message.author_name, "Blocked Discord message: display name");
            self.reject(origin, BLOCKED_NAME_NOTICE).await;
            return RelayOutcome::Blocked;
        }

        let length = message.body.chars().count();
        if length > self.settings.max_message_length {
            let notice = format!(
                "Your message is too long for the website chat ({}/{} characters) and was not sent.",
                length, self.settings.max_message_length
            );
            log_failure(
                "notify",
                origin
                    .notify_transient(&notice, self.settings.notice_ttl)
                    .await,
            );
            log_failure("acknowledge", origin.acknowledge(Ack::Failure).await);
            return RelayOutcome::TooLong;
        }

        let outbound = NewFeedMessage {
            author_name: message.author_name.clone(),
            body: message.body.clone(),
        };

        match self.feed.submit(&outbound).await {
            Ok(id) => {
                info!(
                    feed_id = %id,
                    "Discord -> Website [{}]: {}",
                    message.author_name,
                    message.body
                );
                log_failure("acknowledge", origin.acknowledge(Ack::Success).await);
                RelayOutcome::Submitted(id)
            }
            Err(e) => {
                error!("Failed to relay message to website: {}", e);
                log_failure("acknowledge", origin.acknowledge(Ack::Failure).await);
                RelayOutcome::SubmissionFailed
            }
        }
    }

    async fn reject(&self, origin: &dyn OriginActions, notice: &str) {
        log_failure("suppress", origin.suppress().await);
        log_failure(
            "notify",
            origin.notify_transient(notice, self.settings.notice_ttl).await,
        );
    }
}

fn log_failure(action: &str, result: Result<(), DeliveryError>) {
    if let Err(e) = result {
        warn!("Origin action '{}' failed: {}", action, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeFeed, FakeOrigin, OriginAction};

    fn relay_with(feed: Arc<FakeFeed>) -> OutboundRelay {
        OutboundRelay::new(feed, RelaySettings::default())
    }

    fn local(author: &str, body: &str) -> LocalMessage {
        LocalMessage {
            author_name: author.to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_blocked_message_suppressed_and_not_submitted() {
        let feed = Arc::new(FakeFeed::new());
        let origin = FakeOrigin::new();

        let outcome = relay_with(feed.clone())
            .relay(&local("alice", "kys"), &origin)
            .await;

        assert_eq!(outcome, RelayOutcome::Blocked);
        assert!(feed.submitted().is_empty());
        assert_eq!(
            origin.actions(),
            vec![
                OriginAction::Suppressed,
                OriginAction::Notified(BLOCKED_NOTICE.to_string(), Duration::from_secs(5)),
            ]
        );
    }

    #[tokio::test]
    async fn test_clean_message_submitted_and_acknowledged() {
        let feed = Arc::new(FakeFeed::new());
        let origin = FakeOrigin::new();

        let outcome = relay_with(feed.clone())
            .relay(&local("alice", "good morning everyone"), &origin)
            .await;

        assert!(matches!(outcome, RelayOutcome::Submitted(_)));
        assert_eq!(
            feed.submitted(),
            vec![NewFeedMessage {
                author_name: "alice".to_string(),
                body: "good morning everyone".to_string(),
            }]
        );
        assert_eq!(origin.actions(), vec![OriginAction::Acknowledged(Ack::Success)]);
    }

    #[tokio::test]
    async fn test_submission_failure_acknowledged_as_failure() {
        let feed = Arc::new(FakeFeed::new());
        feed.fail_submissions(true);
        let origin = FakeOrigin::new();

        let outcome = relay_with(feed.clone())
            .relay(&local("alice", "hello"), &origin)
            .await;

        assert_eq!(outcome, RelayOutcome::SubmissionFailed);
        assert_eq!(origin.actions(), vec![OriginAction::Acknowledged(Ack::Failure)]);
    }

    #[tokio::test]
    async fn test_suppress_failure_still_blocks() {
        let feed = Arc::new(FakeFeed::new());
        let origin = FakeOrigin::failing();

        let outcome = relay_with(feed.clone())
            .relay(&local("alice", "f.u.c.k"), &origin)
            .await;

        assert_eq!(outcome, RelayOutcome::Blocked);
        assert!(feed.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_blocked_display_name() {
        let feed = Arc::new(FakeFeed::new());
        let origin = FakeOrigin::new();

        let outcome = relay_with(feed.clone())
            .relay(&local("xX_n4z1_Xx", "hello there"), &origin)
            .await;

        assert_eq!(outcome, RelayOutcome::Blocked);
        assert!(feed.submitted().is_empty());
        assert_eq!(origin.actions()[0], OriginAction::Suppressed);
    }

    #[tokio::test]
    async fn test_too_long_message_not_submitted() {
        let feed = Arc::new(FakeFeed::new());
        let origin = FakeOrigin::new();
        let body = "a".repeat(501);

        let outcome = relay_with(feed.clone())
            .relay(&local("alice", &body), &origin)
            .await;

        assert_eq!(outcome, RelayOutcome::TooLong);
        assert!(feed.submitted().is_empty());
        let actions = origin.actions();
        assert!(matches!(actions[0], OriginAction::Notified(ref text, _) if text.contains("501/500")));
        assert_eq!(actions[1], OriginAction::Acknowledged(Ack::Failure));
    }

    #[tokio::test]
    async fn test_limit_counts_characters_not_bytes() {
        let feed = Arc::new(FakeFeed::new());
        let origin = FakeOrigin::new();
        let body = "é".repeat(500);

        let outcome = relay_with(feed.clone())
            .relay(&local("alice", &body), &origin)
            .await;

        assert!(matches!(outcome, RelayOutcome::Submitted(_)));
    }

    #[tokio::test]
    async fn test_empty_message_ignored() {
        let feed = Arc::new(FakeFeed::new());
        let origin = FakeOrigin::new();

        let outcome = relay_with(feed.clone())
            .relay(&local("alice", "   "), &origin)
            .await;

        assert_eq!(outcome, RelayOutcome::Ignored);
        assert!(origin.actions().is_empty());
        assert!(feed.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_relays_from_separate_tasks_overlap() {
        let delay = Duration::from_millis(200);
        let feed = Arc::new(FakeFeed::new().with_delay(delay));
        let relay = Arc::new(relay_with(feed.clone()));

        let started = std::time::Instant::now();
        let handles: Vec<_> = ["first", "second"]
            .into_iter()
            .map(|body| {
                let relay = relay.clone();
                tokio::spawn(async move {
                    let origin = FakeOrigin::new();
                    relay.relay(&local("alice", body), &origin).await
                })
            })
            .collect();
        for handle in handles {
            assert!(matches!(handle.await.unwrap(), RelayOutcome::Submitted(_)));
        }

        // A slow website must not serialize relays behind each other.
        assert!(started.elapsed() < delay * 2);
        assert_eq!(feed.submitted().len(), 2);
    }
}
