//! Debounced auto-save.
//!
//! Every edit schedules a snapshot; the task writes only after the debounce
//! delay passes with no newer snapshot. Writes go through this one task, so
//! they happen in order and a stale snapshot never lands after a newer one.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use super::DraftStore;

enum SaveCommand {
    Schedule(Vec<u8>),
    Flush(oneshot::Sender<()>),
    Discard,
}

/// Handle to the background save task for one job.
pub struct AutoSaver {
    tx: mpsc::UnboundedSender<SaveCommand>,
    handle: Option<JoinHandle<()>>,
}

impl AutoSaver {
    /// Spawns the save task on the current tokio runtime.
    pub fn spawn(
        job_id: impl Into<String>,
        remote: Arc<dyn DraftStore>,
        local: Arc<dyn DraftStore>,
        delay: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = SaveWorker {
            job_id: job_id.into(),
            remote,
            local,
            delay,
        };
        let handle = tokio::spawn(worker.run(rx));
        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// Schedules a snapshot, restarting the debounce timer.
    pub fn schedule(&self, snapshot: Vec<u8>) {
        if self.tx.send(SaveCommand::Schedule(snapshot)).is_err() {
            warn!("auto-save task has stopped; snapshot dropped");
        }
    }

    /// Writes the pending snapshot now, if any.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(SaveCommand::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Drops the pending snapshot without writing it.
    pub fn discard(&self) {
        let _ = self.tx.send(SaveCommand::Discard);
    }

    /// Flushes and stops the task.
    pub async fn shutdown(mut self) {
        self.flush().await;
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        // Closing the channel makes the task write what is pending and exit.
        self.handle.take();
    }
}

struct SaveWorker {
    job_id: String,
    remote: Arc<dyn DraftStore>,
    local: Arc<dyn DraftStore>,
    delay: Duration,
}

impl SaveWorker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<SaveCommand>) {
        let mut pending: Option<Vec<u8>> = None;
        let mut deadline = Instant::now();

        loop {
            let command = if pending.is_some() {
                tokio::select! {
                    command = rx.recv() => command,
                    _ = sleep_until(deadline) => {
                        if let Some(snapshot) = pending.take() {
                            self.write(&snapshot).await;
                        }
                        continue;
                    }
                }
            } else {
                rx.recv().await
            };

            match command {
                Some(SaveCommand::Schedule(snapshot)) => {
                    pending = Some(snapshot);
                    deadline = Instant::now() + self.delay;
                }
                Some(SaveCommand::Flush(ack)) => {
                    if let Some(snapshot) = pending.take() {
                        self.write(&snapshot).await;
                    }
                    let _ = ack.send(());
                }
                Some(SaveCommand::Discard) => {
                    pending = None;
                }
                None => {
                    if let Some(snapshot) = pending.take() {
                        self.write(&snapshot).await;
                    }
                    break;
                }
            }
        }
    }

    /// Remote first, then the local fallback. Failures are logged only.
    async fn write(&self, snapshot: &[u8]) {
        match self.remote.save(&self.job_id, snapshot).await {
            Ok(()) => debug!(job_id = %self.job_id, store = self.remote.name(), bytes = snapshot.len(), "draft saved"),
            Err(e) => warn!(job_id = %self.job_id, store = self.remote.name(), error = %e, "remote draft save failed; keeping local copy"),
        }
        if let Err(e) = self.local.save(&self.job_id, snapshot).await {
            warn!(job_id = %self.job_id, store = self.local.name(), error = %e, "local draft save failed");
        }
    }
}
