//! In-memory broker for exercising the exchange without Kafka.
//!
//! Records every published request and every subscriber poll. A responder
//! closure turns each request into delayed replies, delivered onto the
//! shared reply queue that the subscriber drains.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use phone_lookup_bridge::bridge::{
    BridgeError, BridgeResult, BrokerFactory, ExchangeSettings, Publisher, ReplyEnvelope,
    RequestEnvelope, Subscriber, Topics,
};
use tokio::sync::Notify;
use tokio::time::Instant;

type Responder = Box<dyn Fn(&RequestEnvelope) -> Vec<(Duration, ReplyEnvelope)> + Send + Sync>;

/// What happened on the broker handles, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PollStarted { timeout: Duration },
    PollEnded,
    PublisherClosed,
    SubscriberClosed { polls_in_flight: usize },
}

struct Shared {
    reachable: bool,
    /// Polls after which the subscriber reports a partition; `None` never does.
    assign_after_polls: Option<usize>,
    replies: Mutex<VecDeque<ReplyEnvelope>>,
    arrived: Notify,
    published: Mutex<Vec<RequestEnvelope>>,
    responder: Mutex<Option<Responder>>,
    /// Extra time every poll and publish takes before doing its work.
    poll_latency: Mutex<Duration>,
    publish_latency: Mutex<Duration>,
    events: Mutex<Vec<Event>>,
    polls_in_flight: AtomicUsize,
    connects: AtomicUsize,
    polls: AtomicUsize,
    polls_after_close: AtomicUsize,
    publisher_closed: AtomicBool,
    subscriber_closed: AtomicBool,
}

impl Shared {
    fn deliver(&self, reply: ReplyEnvelope) {
        self.replies.lock().unwrap().push_back(reply);
        self.arrived.notify_waiters();
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

/// Marks a poll finished even when the polling future is dropped.
struct PollGuard<'a> {
    shared: &'a Shared,
}

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        self.shared.polls_in_flight.fetch_sub(1, Ordering::SeqCst);
        self.shared.record(Event::PollEnded);
    }
}

#[derive(Clone)]
pub struct MockBroker {
    shared: Arc<Shared>,
}

impl MockBroker {
    fn with(reachable: bool, assign_after_polls: Option<usize>) -> Self {
        Self {
            shared: Arc::new(Shared {
                reachable,
                assign_after_polls,
                replies: Mutex::new(VecDeque::new()),
                arrived: Notify::new(),
                published: Mutex::new(Vec::new()),
                responder: Mutex::new(None),
                poll_latency: Mutex::new(Duration::ZERO),
                publish_latency: Mutex::new(Duration::ZERO),
                events: Mutex::new(Vec::new()),
                polls_in_flight: AtomicUsize::new(0),
                connects: AtomicUsize::new(0),
                polls: AtomicUsize::new(0),
                polls_after_close: AtomicUsize::new(0),
                publisher_closed: AtomicBool::new(false),
                subscriber_closed: AtomicBool::new(false),
            }),
        }
    }

    /// Reachable broker assigning a partition after the first poll.
    pub fn new() -> Self {
        Self::with(true, Some(1))
    }

    pub fn never_assigned() -> Self {
        Self::with(true, None)
    }

    pub fn unreachable() -> Self {
        Self::with(false, None)
    }

    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&RequestEnvelope) -> Vec<(Duration, ReplyEnvelope)> + Send + Sync + 'static,
    {
        *self.shared.responder.lock().unwrap() = Some(Box::new(responder));
    }

    /// Answer every request once with `value(key)` after `delay(key)`.
    pub fn respond_by_key<V, D>(&self, value: V, delay: D)
    where
        V: Fn(&str) -> Option<String> + Send + Sync + 'static,
        D: Fn(&str) -> Duration + Send + Sync + 'static,
    {
        self.respond_with(move |request| match value(request.key().as_str()) {
            Some(phone) => vec![(delay(request.key().as_str()), reply_to(request, &phone))],
            None => Vec::new(),
        });
    }

    pub fn set_poll_latency(&self, latency: Duration) {
        *self.shared.poll_latency.lock().unwrap() = latency;
    }

    pub fn set_publish_latency(&self, latency: Duration) {
        *self.shared.publish_latency.lock().unwrap() = latency;
    }

    pub fn events(&self) -> Vec<Event> {
        self.shared.events.lock().unwrap().clone()
    }

    pub fn polls_in_flight(&self) -> usize {
        self.shared.polls_in_flight.load(Ordering::SeqCst)
    }

    pub fn push_reply(&self, reply: ReplyEnvelope) {
        self.shared.deliver(reply);
    }

    pub fn handles(&self) -> (MockPublisher, MockSubscriber) {
        (
            MockPublisher {
                shared: Arc::clone(&self.shared),
            },
            MockSubscriber {
                shared: Arc::clone(&self.shared),
            },
        )
    }

    pub fn factory(&self) -> MockFactory {
        self.factory_with(ExchangeSettings::default())
    }

    pub fn factory_with(&self, settings: ExchangeSettings) -> MockFactory {
        MockFactory {
            broker: self.clone(),
            topics: Topics::default(),
            settings,
        }
    }

    pub fn published(&self) -> Vec<RequestEnvelope> {
        self.shared.published.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.shared.polls.load(Ordering::SeqCst)
    }

    pub fn polls_after_close(&self) -> usize {
        self.shared.polls_after_close.load(Ordering::SeqCst)
    }

    pub fn publisher_closed(&self) -> bool {
        self.shared.publisher_closed.load(Ordering::SeqCst)
    }

    pub fn subscriber_closed(&self) -> bool {
        self.shared.subscriber_closed.load(Ordering::SeqCst)
    }
}

/// A reply echoing the request's correlation id.
pub fn reply_to(request: &RequestEnvelope, value: &str) -> ReplyEnvelope {
    ReplyEnvelope::new(Some(value), Some(request.correlation_id().as_str()))
}

pub struct MockPublisher {
    shared: Arc<Shared>,
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, request: &RequestEnvelope) -> BridgeResult<()> {
        let latency = *self.shared.publish_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.shared.publisher_closed.load(Ordering::SeqCst) {
            return Err(BridgeError::Closed);
        }
        self.shared.published.lock().unwrap().push(request.clone());

        let replies = match self.shared.responder.lock().unwrap().as_ref() {
            Some(responder) => responder(request),
            None => Vec::new(),
        };
        for (delay, reply) in replies {
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                shared.deliver(reply);
            });
        }
        Ok(())
    }

    async fn flush(&self, _timeout: Duration) -> BridgeResult<()> {
        Ok(())
    }

    async fn close(&self) {
        if !self.shared.publisher_closed.swap(true, Ordering::SeqCst) {
            self.shared.record(Event::PublisherClosed);
        }
    }
}

pub struct MockSubscriber {
    shared: Arc<Shared>,
}

#[async_trait]
impl Subscriber for MockSubscriber {
    async fn poll(&self, timeout: Duration) -> BridgeResult<Option<ReplyEnvelope>> {
        self.shared.polls.fetch_add(1, Ordering::SeqCst);
        if self.shared.subscriber_closed.load(Ordering::SeqCst) {
            self.shared.polls_after_close.fetch_add(1, Ordering::SeqCst);
            return Err(BridgeError::Closed);
        }

        self.shared.polls_in_flight.fetch_add(1, Ordering::SeqCst);
        self.shared.record(Event::PollStarted { timeout });
        let _guard = PollGuard {
            shared: &self.shared,
        };

        let latency = *self.shared.poll_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let deadline = Instant::now() + timeout;
        loop {
            let arrived = self.shared.arrived.notified();
            let next = self.shared.replies.lock().unwrap().pop_front();
            if let Some(reply) = next {
                return Ok(Some(reply));
            }
            if tokio::time::timeout_at(deadline, arrived).await.is_err() {
                return Ok(None);
            }
        }
    }

    fn assignment_size(&self) -> BridgeResult<usize> {
        let polls = self.shared.polls.load(Ordering::SeqCst);
        match self.shared.assign_after_polls {
            Some(after) if polls >= after => Ok(1),
            _ => Ok(0),
        }
    }

    fn close(&self) {
        if !self.shared.subscriber_closed.swap(true, Ordering::SeqCst) {
            let polls_in_flight = self.shared.polls_in_flight.load(Ordering::SeqCst);
            self.shared.record(Event::SubscriberClosed { polls_in_flight });
        }
    }
}

pub struct MockFactory {
    broker: MockBroker,
    topics: Topics,
    settings: ExchangeSettings,
}

#[async_trait]
impl BrokerFactory for MockFactory {
    type Publisher = MockPublisher;
    type Subscriber = MockSubscriber;

    async fn connect(&self) -> BridgeResult<(MockPublisher, MockSubscriber)> {
        self.broker.shared.connects.fetch_add(1, Ordering::SeqCst);
        if !self.broker.shared.reachable {
            return Err(BridgeError::BrokerUnavailable {
                brokers: "mock:9092".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(self.broker.handles())
    }

    fn topics(&self) -> &Topics {
        &self.topics
    }

    fn settings(&self) -> &ExchangeSettings {
        &self.settings
    }
}
