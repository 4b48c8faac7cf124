//! Seams between the exchange logic and a concrete broker client.
//!
//! The Kafka implementation lives in [`crate::kafka`]; tests plug in an
//! in-memory broker.

use std::time::Duration;

use async_trait::async_trait;

use super::envelope::{ReplyEnvelope, RequestEnvelope, Topics};
use super::error::BridgeResult;
use super::settings::ExchangeSettings;

/// Outbound handle, not bound to a topic.
#[async_trait]
pub trait Publisher: Send + Sync + 'static {
    async fn publish(&self, request: &RequestEnvelope) -> BridgeResult<()>;

    /// Block until everything published so far has left the client.
    async fn flush(&self, timeout: Duration) -> BridgeResult<()>;

    /// Flush what is still queued, then refuse further publishes.
    async fn close(&self);
}

/// Inbound handle subscribed to the reply topic.
///
/// `poll` must be callable from several tasks at once: the warmup, the
/// reply reader and the keepalive all share one subscriber.
#[async_trait]
pub trait Subscriber: Send + Sync + 'static {
    /// Wait up to `timeout` for one reply. A zero timeout polls once
    /// without waiting.
    async fn poll(&self, timeout: Duration) -> BridgeResult<Option<ReplyEnvelope>>;

    /// Number of partitions currently assigned to this subscriber.
    fn assignment_size(&self) -> BridgeResult<usize>;

    fn close(&self);
}

/// Builds the publisher/subscriber pair for one connection.
#[async_trait]
pub trait BrokerFactory: Send + Sync {
    type Publisher: Publisher;
    type Subscriber: Subscriber;

    /// Fails with `BrokerUnavailable` when no broker accepts the connection.
    async fn connect(&self) -> BridgeResult<(Self::Publisher, Self::Subscriber)>;

    fn topics(&self) -> &Topics;

    fn settings(&self) -> &ExchangeSettings;
}
