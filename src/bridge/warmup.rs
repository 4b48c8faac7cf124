//! Forces the subscriber through partition assignment before any request
//! is published, so a fast reply cannot arrive before anyone listens.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;

use super::error::{BridgeError, BridgeResult};
use super::router::ReplyRouter;
use super::task::{stopped, StoppableTask};
use super::transport::Subscriber;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmupStatus {
    Pending,
    Ready { partitions: usize },
    Failed { attempts: u32 },
}

pub struct Warmup {
    topic: String,
    status: watch::Receiver<WarmupStatus>,
    task: Mutex<Option<StoppableTask>>,
}

impl Warmup {
    /// Start polling in the background, at most `attempts` times.
    pub fn spawn<S: Subscriber>(
        subscriber: Arc<S>,
        router: Arc<ReplyRouter>,
        topic: &str,
        attempts: u32,
        poll_timeout: Duration,
    ) -> Self {
        let (status_tx, status) = watch::channel(WarmupStatus::Pending);
        let task = StoppableTask::spawn("warmup", move |stop| {
            run_warmup(subscriber, router, attempts, poll_timeout, status_tx, stop)
        });

        Self {
            topic: topic.to_string(),
            status,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn status(&self) -> WarmupStatus {
        *self.status.borrow()
    }

    /// Wait for the warmup to finish. Safe to call from many tasks.
    pub async fn wait(&self) -> BridgeResult<usize> {
        let mut status = self.status.clone();
        let outcome = *status
            .wait_for(|s| *s != WarmupStatus::Pending)
            .await
            .map_err(|_| BridgeError::Closed)?;

        match outcome {
            WarmupStatus::Ready { partitions } => Ok(partitions),
            WarmupStatus::Failed { attempts } => Err(BridgeError::AssignmentTimeout {
                topic: self.topic.clone(),
                attempts,
            }),
            WarmupStatus::Pending => Err(BridgeError::Closed),
        }
    }

    pub(crate) async fn stop(&self, join_timeout: Duration) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.stop(join_timeout).await;
        }
    }
}

async fn run_warmup<S: Subscriber>(
    subscriber: Arc<S>,
    router: Arc<ReplyRouter>,
    attempts: u32,
    poll_timeout: Duration,
    status: watch::Sender<WarmupStatus>,
    mut stop: watch::Receiver<bool>,
) {
    for attempt in 1..=attempts {
        tokio::select! {
            polled = subscriber.poll(poll_timeout) => match polled {
                Ok(Some(reply)) => {
                    router.dispatch(reply);
                }
                Ok(None) => {}
                Err(e) => warn!("Warmup poll {} failed: {}", attempt, e),
            },
            _ = stopped(&mut stop) => {
                debug!("Warmup stopped after {} attempts", attempt - 1);
                return;
            }
        }

        match subscriber.assignment_size() {
            Ok(0) => debug!("Warmup attempt {}/{}: no assignment yet", attempt, attempts),
            Ok(partitions) => {
                info!(
                    "Reply subscriber assigned {} partition(s) after {} attempt(s)",
                    partitions, attempt
                );
                let _ = status.send(WarmupStatus::Ready { partitions });
                return;
            }
            Err(e) => warn!("Failed to read assignment: {}", e),
        }
    }

    warn!("Reply subscriber still unassigned after {} attempts", attempts);
    let _ = status.send(WarmupStatus::Failed { attempts });
}
