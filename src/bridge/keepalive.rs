//! Periodically touches the reply subscriber so the broker keeps its group
//! membership alive between bursts of lookups.
//!
//! The loop polls without waiting, then sleeps for the interval. Replies it
//! happens to pull are routed like any other. It shares no lock with the
//! exchange.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;

use super::router::ReplyRouter;
use super::task::{stopped, StoppableTask};
use super::transport::Subscriber;

pub struct KeepaliveTask {
    task: StoppableTask,
}

impl KeepaliveTask {
    pub fn spawn<S: Subscriber>(
        subscriber: Arc<S>,
        router: Arc<ReplyRouter>,
        interval: Duration,
    ) -> Self {
        let task = StoppableTask::spawn("keepalive", move |stop| {
            run_keepalive(subscriber, router, interval, stop)
        });
        Self { task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the loop and wait (bounded) for its current cycle to end.
    pub async fn stop(self, join_timeout: Duration) -> bool {
        self.task.stop(join_timeout).await
    }
}

async fn run_keepalive<S: Subscriber>(
    subscriber: Arc<S>,
    router: Arc<ReplyRouter>,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        if *stop.borrow() {
            break;
        }

        match subscriber.poll(Duration::ZERO).await {
            Ok(Some(reply)) => {
                router.dispatch(reply);
            }
            Ok(None) => {}
            Err(e) => warn!("Keepalive poll failed: {}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stopped(&mut stop) => break,
        }
    }
    debug!("Keepalive loop exited");
}
