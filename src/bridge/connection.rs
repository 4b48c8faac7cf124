//! A broker connection and the correlated request/reply exchange on it.
//!
//! # Lifecycle
//!
//! 1. [`BrokerConnection::open`] connects through a [`BrokerFactory`] and
//!    starts the warmup, the reply reader and the keepalive
//! 2. [`BrokerConnection::exchange`] runs one lookup; many may run at once
//! 3. [`BrokerConnection::close`] stops the keepalive first, then the reader
//!    and warmup, and only then closes both broker handles
//!
//! A connection kept for the life of the process pays the warmup once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use tokio::time::Instant;

use super::envelope::{CorrelationId, LookupKey, RequestEnvelope, Topics};
use super::error::{BridgeError, BridgeResult};
use super::keepalive::KeepaliveTask;
use super::reader::spawn_reply_reader;
use super::router::ReplyRouter;
use super::settings::ExchangeSettings;
use super::task::StoppableTask;
use super::transport::{BrokerFactory, Publisher, Subscriber};
use super::warmup::{Warmup, WarmupStatus};

pub struct BrokerConnection<P: Publisher, S: Subscriber> {
    publisher: P,
    subscriber: Arc<S>,
    topics: Topics,
    settings: ExchangeSettings,
    router: Arc<ReplyRouter>,
    warmup: Warmup,
    keepalive: Mutex<Option<KeepaliveTask>>,
    reader: Mutex<Option<StoppableTask>>,
    closed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<P: Publisher, S: Subscriber> BrokerConnection<P, S> {
    pub async fn open<F>(factory: &F) -> BridgeResult<Self>
    where
        F: BrokerFactory<Publisher = P, Subscriber = S>,
    {
        let (publisher, subscriber) = factory.connect().await?;
        Ok(Self::from_parts(
            publisher,
            subscriber,
            factory.topics().clone(),
            factory.settings().clone(),
        ))
    }

    /// Wrap already-connected handles. Must be called inside a Tokio runtime.
    pub fn from_parts(
        publisher: P,
        subscriber: S,
        topics: Topics,
        settings: ExchangeSettings,
    ) -> Self {
        let subscriber = Arc::new(subscriber);
        let router = Arc::new(ReplyRouter::new());

        let warmup = Warmup::spawn(
            Arc::clone(&subscriber),
            Arc::clone(&router),
            &topics.reply_topic,
            settings.warmup_attempts,
            settings.warmup_poll_timeout(),
        );
        let keepalive = settings.keepalive_interval().map(|interval| {
            KeepaliveTask::spawn(Arc::clone(&subscriber), Arc::clone(&router), interval)
        });
        let reader = spawn_reply_reader(
            Arc::clone(&subscriber),
            Arc::clone(&router),
            settings.poll_timeout(),
        );

        Self {
            publisher,
            subscriber,
            topics,
            settings,
            router,
            warmup,
            keepalive: Mutex::new(keepalive),
            reader: Mutex::new(Some(reader)),
            closed: AtomicBool::new(false),
        }
    }

    /// Publish one request and wait for its reply.
    ///
    /// `Ok(None)` means no matching reply arrived within the wait budget.
    /// Fails fast with `AssignmentTimeout` if the warmup never completed.
    pub async fn exchange(&self, key: &LookupKey) -> BridgeResult<Option<String>> {
        if self.is_closed() {
            return Err(BridgeError::Closed);
        }
        self.warmup.wait().await?;
        if self.is_closed() {
            return Err(BridgeError::Closed);
        }

        let correlation_id = CorrelationId::generate();
        let request = RequestEnvelope::new(&self.topics, key, correlation_id.clone());

        // registered before publishing so an immediate reply has a waiter
        let pending = self.router.register(correlation_id);
        if self.is_closed() {
            return Err(BridgeError::Closed);
        }
        let started = Instant::now();
        let deadline = started + self.settings.wait_budget();

        self.publisher.publish(&request).await?;
        self.publisher.flush(self.settings.flush_timeout()).await?;
        debug!(
            "Published lookup {} to {} (correlation id {})",
            key,
            request.topic(),
            request.correlation_id()
        );

        let remaining = deadline.saturating_duration_since(Instant::now());
        let value = pending.wait(remaining).await?;
        match &value {
            Some(_) => info!("Lookup {} answered in {:?}", key, started.elapsed()),
            None => info!(
                "No reply for {} within {:?}",
                key,
                self.settings.wait_budget()
            ),
        }
        Ok(value)
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn settings(&self) -> &ExchangeSettings {
        &self.settings
    }

    /// Wait for the warmup and return the number of assigned partitions.
    pub async fn ready(&self) -> BridgeResult<usize> {
        self.warmup.wait().await
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.warmup.status(), WarmupStatus::Ready { .. })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn pending_lookups(&self) -> usize {
        self.router.pending()
    }

    pub fn has_keepalive(&self) -> bool {
        lock(&self.keepalive)
            .as_ref()
            .map(KeepaliveTask::is_running)
            .unwrap_or(false)
    }

    /// Tear down in order: keepalive, reader, warmup, then the handles.
    /// Waiting lookups fail with `Closed`. Calling twice is a no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let join_timeout = self.settings.join_timeout();

        let keepalive = lock(&self.keepalive).take();
        if let Some(keepalive) = keepalive {
            if !keepalive.stop(join_timeout).await {
                warn!("Keepalive aborted during close");
            }
        }

        let reader = lock(&self.reader).take();
        if let Some(reader) = reader {
            reader.stop(join_timeout).await;
        }
        self.warmup.stop(join_timeout).await;
        self.router.clear();

        self.publisher.close().await;
        self.subscriber.close();
        info!("Closed broker connection for {}", self.topics.reply_topic);
    }
}
