//! Discord -> website relay.

pub mod outbound;

use std::time::Duration;

use async_trait::async_trait;

use crate::common::error::DeliveryError;

pub use outbound::{LocalMessage, OutboundRelay, RelayOutcome, RelaySettings};

/// Reaction placed on a relayed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Success,
    Failure,
}

impl Ack {
    pub fn emoji(self) -> char {
        match self {
            Ack::Success => '✅',
            Ack::Failure => '❌',
        }
    }
}

/// Side effects the relay can apply to the message it is handling.
///
/// Implementations are bound to one incoming message. Failures are reported
/// back but never change the relay outcome.
#[async_trait]
pub trait OriginActions: Send + Sync {
    /// Remove the message from the channel.
    async fn suppress(&self) -> Result<(), DeliveryError>;

    /// Tell the author something, removing the notice after `ttl`.
    async fn notify_transient(&self, text: &str, ttl: Duration) -> Result<(), DeliveryError>;

    /// Mark the message as relayed or not.
    async fn acknowledge(&self, ack: Ack) -> Result<(), DeliveryError>;
}
