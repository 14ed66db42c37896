//! Lifecycle handle for the background sweeper.

use tokio::{sync::watch, task::JoinHandle};

/// Owns a running sweeper task.
///
/// [`stop`](Self::stop) signals the task and waits for it to finish. Dropping
/// the handle without calling `stop` still signals shutdown; the task exits on
/// its next poll.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    pub fn new(shutdown: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        Self {
            shutdown,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Signal the sweeper and wait for it to exit.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Login attempt sweeper did not shut down cleanly");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::MockClock, config::LockoutConfig, services::LoginAttemptService};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_stop_joins_task() {
        let service =
            LoginAttemptService::with_clock(LockoutConfig::default(), Arc::new(MockClock::default()));
        let handle = service.spawn_sweeper();
        assert!(handle.is_running());
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_drop_signals_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let _ = rx.changed().await;
        });
        let handle = SweeperHandle::new(tx, tokio::spawn(async {}));
        drop(handle);

        task.await.unwrap();
    }
}
