use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;

use super::router::ReplyRouter;
use super::task::{stopped, StoppableTask};
use super::transport::Subscriber;

/// Single reader of the reply topic. Polls only while lookups are waiting
/// and hands every reply to the router.
pub(crate) fn spawn_reply_reader<S: Subscriber>(
    subscriber: Arc<S>,
    router: Arc<ReplyRouter>,
    poll_timeout: Duration,
) -> StoppableTask {
    StoppableTask::spawn("reply reader", move |stop| {
        run_reader(subscriber, router, poll_timeout, stop)
    })
}

async fn run_reader<S: Subscriber>(
    subscriber: Arc<S>,
    router: Arc<ReplyRouter>,
    poll_timeout: Duration,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        if router.pending() == 0 {
            tokio::select! {
                _ = router.wait_for_waiters() => continue,
                _ = stopped(&mut stop) => break,
            }
        }

        tokio::select! {
            polled = subscriber.poll(poll_timeout) => match polled {
                Ok(Some(reply)) => {
                    router.dispatch(reply);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Reply poll failed: {}", e);
                    // back off one poll period
                    tokio::select! {
                        _ = tokio::time::sleep(poll_timeout) => {}
                        _ = stopped(&mut stop) => break,
                    }
                }
            },
            _ = stopped(&mut stop) => break,
        }
    }
    debug!("Reply reader exited");
}
