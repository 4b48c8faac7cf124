//! rdkafka-backed publisher and subscriber handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use rdkafka::{
    consumer::Consumer,
    message::{Header, Headers, OwnedHeaders},
    producer::{FutureProducer, FutureRecord, Producer},
    Message,
};

use crate::bridge::{
    BridgeError, BridgeResult, Publisher, ReplyEnvelope, RequestEnvelope, Subscriber,
};
use crate::kafka::LoggingConsumer;

pub struct KafkaPublisher {
    producer: FutureProducer,
    close_timeout: Duration,
    closed: AtomicBool,
}

impl KafkaPublisher {
    /// `close_timeout` bounds the flush done on close.
    pub fn new(producer: FutureProducer, close_timeout: Duration) -> Self {
        Self {
            producer,
            close_timeout,
            closed: AtomicBool::new(false),
        }
    }

    async fn flush_blocking(&self, timeout: Duration) -> BridgeResult<()> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| BridgeError::Internal(format!("flush task failed: {}", e)))?
            .map_err(|e| BridgeError::kafka("flush", e))
    }
}

/// Copy `(key, value)` pairs into rdkafka headers.
pub fn owned_headers<'a, I>(pairs: I) -> OwnedHeaders
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .fold(OwnedHeaders::new(), |headers, (key, value)| {
            headers.insert(Header {
                key,
                value: Some(value),
            })
        })
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn publish(&self, request: &RequestEnvelope) -> BridgeResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::Closed);
        }
        let headers = owned_headers(request.headers());

        let (partition, offset) = self
            .producer
            .send(
                FutureRecord::to(request.topic())
                    .key(request.key().as_str())
                    .payload(request.payload())
                    .headers(headers),
                Duration::from_secs(0),
            )
            .await
            .map_err(|(e, _)| BridgeError::kafka("publish", e))?;

        debug!(
            "Request {} delivered to {} [{}] @ {}",
            request.correlation_id(),
            request.topic(),
            partition,
            offset
        );
        Ok(())
    }

    async fn flush(&self, timeout: Duration) -> BridgeResult<()> {
        self.flush_blocking(timeout).await
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.flush_blocking(self.close_timeout).await {
            warn!("Flush on close failed: {}", e);
        }
        let in_flight = self.producer.in_flight_count();
        if in_flight > 0 {
            warn!("Closing producer with {} undelivered message(s)", in_flight);
        }
    }
}

pub struct KafkaSubscriber {
    consumer: LoggingConsumer,
    closed: AtomicBool,
}

impl KafkaSubscriber {
    pub fn new(consumer: LoggingConsumer) -> Self {
        Self {
            consumer,
            closed: AtomicBool::new(false),
        }
    }
}

/// Decode a received Kafka record into a reply.
pub fn reply_from_message<M: Message>(message: &M) -> ReplyEnvelope {
    let headers: Vec<(&str, Option<&[u8]>)> = message
        .headers()
        .map(|headers| headers.iter().map(|h| (h.key, h.value)).collect())
        .unwrap_or_default();
    ReplyEnvelope::from_raw(message.payload(), headers)
}

#[async_trait]
impl Subscriber for KafkaSubscriber {
    async fn poll(&self, timeout: Duration) -> BridgeResult<Option<ReplyEnvelope>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::Closed);
        }

        match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Err(_) => Ok(None),
            Ok(Err(e)) => Err(BridgeError::kafka("poll", e)),
            Ok(Ok(message)) => Ok(Some(reply_from_message(&message))),
        }
    }

    fn assignment_size(&self) -> BridgeResult<usize> {
        self.consumer
            .assignment()
            .map(|partitions| partitions.count())
            .map_err(|e| BridgeError::kafka("assignment", e))
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.consumer.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdkafka::message::OwnedMessage;
    use rdkafka::message::Timestamp;

    fn received(payload: Option<&str>, headers: Option<OwnedHeaders>) -> OwnedMessage {
        OwnedMessage::new(
            payload.map(|p| p.as_bytes().to_vec()),
            None,
            "phone-lookup-replies".to_string(),
            Timestamp::NotAvailable,
            0,
            42,
            headers,
        )
    }

    #[test]
    fn test_reply_from_message() {
        let headers = owned_headers([("correlationId", "6f1c"), ("repliedAt", "now")]);
        let reply = reply_from_message(&received(Some("+33612345678"), Some(headers)));
        assert_eq!(reply.value.as_deref(), Some("+33612345678"));
        assert_eq!(reply.correlation_id.as_deref(), Some("6f1c"));
    }

    #[tokio::test]
    async fn test_publish_after_close_rejected() {
        let producer: FutureProducer = rdkafka::ClientConfig::new()
            .set("bootstrap.servers", "localhost:9")
            .create()
            .unwrap();
        let publisher = KafkaPublisher::new(producer, Duration::from_millis(100));
        publisher.close().await;
        publisher.close().await;

        let request = RequestEnvelope::new(
            &crate::bridge::Topics::default(),
            &crate::bridge::LookupKey::new("J.DOE"),
            crate::bridge::CorrelationId::generate(),
        );
        assert!(matches!(
            publisher.publish(&request).await,
            Err(BridgeError::Closed)
        ));
    }

    #[test]
    fn test_reply_without_headers() {
        let reply = reply_from_message(&received(Some("+33612345678"), None));
        assert_eq!(reply.correlation_id, None);
    }
}
