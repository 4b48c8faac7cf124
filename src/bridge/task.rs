use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A spawned background loop with a stop flag and a bounded join.
///
/// The loop receives the flag as a `watch::Receiver<bool>`. Dropping the
/// task without calling [`stop`](Self::stop) also releases the loop, since
/// [`stopped`] resolves when the sender goes away.
pub(crate) struct StoppableTask {
    name: &'static str,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl StoppableTask {
    pub(crate) fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(body(stop_rx));
        Self { name, stop, handle }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Raise the flag and wait up to `join_timeout` for the loop to exit.
    /// Returns false if the loop overran and had to be aborted.
    pub(crate) async fn stop(self, join_timeout: Duration) -> bool {
        let Self { name, stop, mut handle } = self;
        let _ = stop.send(true);

        match tokio::time::timeout(join_timeout, &mut handle).await {
            Ok(_) => {
                debug!("{} task joined", name);
                true
            }
            Err(_) => {
                warn!("{} task did not stop within {:?}, aborting", name, join_timeout);
                handle.abort();
                let _ = handle.await;
                false
            }
        }
    }
}

/// Resolves once the stop flag is raised or its sender is dropped.
pub(crate) async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}
