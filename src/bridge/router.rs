//! Demultiplexes replies from the shared reply topic to their waiters.
//!
//! Every lookup registers its correlation id before publishing. The reply
//! reader (and the warmup/keepalive polls) hand each received reply to
//! [`ReplyRouter::dispatch`], which delivers it to the one waiter holding
//! the matching id. Any number of lookups may wait on one connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;
use tokio::sync::{oneshot, Notify};

use super::envelope::{CorrelationId, ReplyEnvelope};
use super::error::{BridgeError, BridgeResult};

/// What happened to a dispatched reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Delivered,
    /// No waiter holds this id (late reply, or one for another process).
    Unmatched,
    /// The reply had no usable `correlationId` header.
    MissingCorrelation,
    /// Matching id but no value; the waiter keeps waiting.
    EmptyValue,
}

#[derive(Default)]
pub struct ReplyRouter {
    waiters: Mutex<HashMap<CorrelationId, oneshot::Sender<String>>>,
    registered: Notify,
}

impl ReplyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    fn waiters(&self) -> MutexGuard<'_, HashMap<CorrelationId, oneshot::Sender<String>>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a waiter. Dropping the returned handle deregisters it.
    pub fn register(self: &Arc<Self>, id: CorrelationId) -> PendingReply {
        let (tx, rx) = oneshot::channel();
        self.waiters().insert(id.clone(), tx);
        self.registered.notify_one();
        PendingReply {
            id,
            rx,
            router: Arc::clone(self),
        }
    }

    pub fn dispatch(&self, reply: ReplyEnvelope) -> Dispatch {
        let Some(correlation_id) = reply.correlation_id else {
            debug!("Discarding reply without correlation id");
            return Dispatch::MissingCorrelation;
        };

        let mut waiters = self.waiters();
        let key = CorrelationId::from_wire(correlation_id);
        if !waiters.contains_key(&key) {
            debug!("Discarding reply for unknown correlation id {}", key);
            return Dispatch::Unmatched;
        }

        let Some(value) = reply.value else {
            debug!("Ignoring empty reply for correlation id {}", key);
            return Dispatch::EmptyValue;
        };

        match waiters.remove(&key) {
            Some(tx) => {
                if tx.send(value).is_ok() {
                    Dispatch::Delivered
                } else {
                    Dispatch::Unmatched
                }
            }
            None => Dispatch::Unmatched,
        }
    }

    /// Number of lookups currently waiting.
    pub fn pending(&self) -> usize {
        self.waiters().len()
    }

    /// Resolves once a waiter has been registered since the last call.
    pub async fn wait_for_waiters(&self) {
        self.registered.notified().await
    }

    /// Drop every waiter; their `wait` returns `Closed`.
    pub fn clear(&self) {
        self.waiters().clear();
    }

    fn remove(&self, id: &CorrelationId) {
        self.waiters().remove(id);
    }
}

/// A registered lookup waiting for its reply.
pub struct PendingReply {
    id: CorrelationId,
    rx: oneshot::Receiver<String>,
    router: Arc<ReplyRouter>,
}

impl PendingReply {
    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    /// `Ok(None)` when the budget elapses, `Closed` when the router was cleared.
    pub async fn wait(mut self, budget: Duration) -> BridgeResult<Option<String>> {
        match tokio::time::timeout(budget, &mut self.rx).await {
            Ok(Ok(value)) => Ok(Some(value)),
            Ok(Err(_)) => Err(BridgeError::Closed),
            Err(_) => Ok(None),
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.router.remove(&self.id);
    }
}
