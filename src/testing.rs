//! In-memory fakes for the feed, the Discord sink and message origins.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::common::error::{DeliveryError, FeedError, FeedResult};
use crate::common::{ChannelRef, FeedMessage, FeedMessageId, MessageOrigin, NewFeedMessage};
use crate::feed::FeedClient;
use crate::relay::{Ack, OriginActions};
use crate::sync::DeliverySink;

/// A website message created `offset_secs` after a fixed epoch.
pub fn feed_message(id: u64, body: &str, offset_secs: i64) -> FeedMessage {
    FeedMessage {
        id: FeedMessageId::from(id),
        author_name: format!("user{}", id),
        body: body.to_string(),
        created_at: Utc
            .timestamp_opt(1_700_000_000 + offset_secs, 0)
            .single()
            .unwrap(),
        origin: MessageOrigin::External,
    }
}

/// Feed returning a fixed newest-first list.
#[derive(Default)]
pub struct FakeFeed {
    messages: Mutex<Vec<FeedMessage>>,
    submitted: Mutex<Vec<NewFeedMessage>>,
    fetches: AtomicUsize,
    failing_fetches: AtomicUsize,
    fail_submissions: AtomicBool,
    delay: Option<Duration>,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Messages served by every fetch, newest first.
    pub fn set_messages(&self, messages: Vec<FeedMessage>) {
        *self.messages.lock().unwrap() = messages;
    }

    /// Make the next `count` fetches fail.
    pub fn fail_next_fetches(&self, count: usize) {
        self.failing_fetches.store(count, Ordering::SeqCst);
    }

    pub fn fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<NewFeedMessage> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedClient for FakeFeed {
    async fn fetch_recent_external(&self, limit: usize) -> FeedResult<Vec<FeedMessage>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .failing_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(FeedError::Fetch {
                message: "feed unreachable".to_string(),
            });
        }

        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.origin == MessageOrigin::External)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn submit(&self, message: &NewFeedMessage) -> FeedResult<FeedMessageId> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(FeedError::Submission {
                message: "rejected".to_string(),
            });
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(message.clone());
        Ok(FeedMessageId::from(1000 + submitted.len() as u64))
    }
}

/// Sink recording what each channel received.
#[derive(Default)]
pub struct FakeSink {
    delivered: Mutex<HashMap<ChannelRef, Vec<FeedMessage>>>,
    unavailable: Mutex<HashSet<ChannelRef>>,
    failing_ids: Mutex<HashSet<FeedMessageId>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_unavailable(&self, channel: ChannelRef) {
        self.unavailable.lock().unwrap().insert(channel);
    }

    pub fn fail_delivery_of(&self, id: FeedMessageId) {
        self.failing_ids.lock().unwrap().insert(id);
    }

    pub fn delivered_bodies(&self, channel: ChannelRef) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .get(&channel)
            .map(|messages| messages.iter().map(|m| m.body.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DeliverySink for FakeSink {
    async fn channel_available(&self, channel: ChannelRef) -> bool {
        !self.unavailable.lock().unwrap().contains(&channel)
    }

    async fn deliver(&self, channel: ChannelRef, message: &FeedMessage) -> Result<(), DeliveryError> {
        if self.failing_ids.lock().unwrap().contains(&message.id) {
            return Err(DeliveryError::SendFailed {
                message: "missing permissions".to_string(),
            });
        }
        self.delivered
            .lock()
            .unwrap()
            .entry(channel)
            .or_default()
            .push(message.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginAction {
    Suppressed,
    Notified(String, Duration),
    Acknowledged(Ack),
}

/// Origin recording the side effects requested by the relay.
#[derive(Default)]
pub struct FakeOrigin {
    actions: Mutex<Vec<OriginAction>>,
    fail: bool,
}

impl FakeOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every action is recorded but reported as failed.
    pub fn failing() -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn actions(&self) -> Vec<OriginAction> {
        self.actions.lock().unwrap().clone()
    }

    fn record(&self, action: OriginAction) -> Result<(), DeliveryError> {
        self.actions.lock().unwrap().push(action);
        if self.fail {
            Err(DeliveryError::SendFailed {
                message: "missing permissions".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OriginActions for FakeOrigin {
    async fn suppress(&self) -> Result<(), DeliveryError> {
        self.record(OriginAction::Suppressed)
    }

    async fn notify_transient(&self, text: &str, ttl: Duration) -> Result<(), DeliveryError> {
        self.record(OriginAction::Notified(text.to_string(), ttl))
    }

    async fn acknowledge(&self, ack: Ack) -> Result<(), DeliveryError> {
        self.record(OriginAction::Acknowledged(ack))
    }
}
