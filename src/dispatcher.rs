/*!
 * Sequential task dispatcher.
 *
 * One worker loop drains the queue: while no task is running, pick the
 * oldest pending task, move it to running and hand it to the pipeline.
 * Exactly one task runs at a time. The loop wakes on submission via a
 * notify handle and additionally polls on an interval, so a missed
 * wakeup only delays a task, never strands it. A failed task is recorded
 * and the loop moves on to the next one.
 */

use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};

use crate::broadcast::ProgressBroadcaster;
use crate::pipeline::Pipeline;
use crate::store::TaskStore;
use crate::task::TaskStatus;

/// Single-worker queue dispatcher
pub struct Dispatcher {
    store: Arc<TaskStore>,
    broadcaster: ProgressBroadcaster,
    pipeline: Pipeline,
    notify: Arc<Notify>,
    poll_interval: Duration,
}

impl Dispatcher {
    /// Create a dispatcher over the shared store and pipeline
    pub fn new(
        store: Arc<TaskStore>,
        broadcaster: ProgressBroadcaster,
        pipeline: Pipeline,
        notify: Arc<Notify>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            broadcaster,
            pipeline,
            notify,
            poll_interval,
        }
    }

    /// Run the dispatch loop until `shutdown` flips to true.
    ///
    /// An in-flight task finishes (or fails) before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Dispatcher started (poll interval {}s)",
            self.poll_interval.as_secs()
        );
        loop {
            self.drain_pending().await;

            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Dispatcher shutting down");
                        return;
                    }
                }
            }
        }
    }

    /// Process pending tasks one at a time until none remain, or until
    /// the store stops accepting writes
    async fn drain_pending(&self) {
        while !self.store.has_running() {
            let Some(task) = self.store.next_pending() else {
                return;
            };
            if !self.process(&task.id).await {
                // Backing off to the poll interval instead of re-selecting
                // the same task in a tight loop
                return;
            }
        }
    }

    /// Run one task through the pipeline, recording the outcome.
    ///
    /// Returns false when the pending-to-running persist failed and the
    /// task was left pending; draining must pause so the same task is
    /// not immediately re-selected.
    async fn process(&self, id: &str) -> bool {
        let update = self.store.update(id, |t| {
            if let Err(e) = t.transition(TaskStatus::Running) {
                warn!("Skipping task {}: {}", id, e);
            }
        });
        let started = match update {
            Ok(Some(task)) if task.status == TaskStatus::Running => task,
            // Deleted or already moved on; nothing to do
            Ok(_) => return true,
            Err(e) => {
                error!("Could not mark task {} as running: {}", id, e);
                return false;
            }
        };
        self.broadcaster.publish(self.store.snapshot());

        let outcome = self.pipeline.run(&started).await;

        let update = self.store.update(id, |t| {
            let result = match &outcome {
                Ok(artifact) => t.complete(artifact.clone()),
                Err(e) => t.fail(e.to_string()),
            };
            if let Err(e) = result {
                warn!("Could not record outcome for task {}: {}", id, e);
            }
        });
        match update {
            Ok(Some(task)) => match task.status {
                TaskStatus::Completed => info!("Task {} completed", id),
                TaskStatus::Error => error!(
                    "Task {} failed: {}",
                    id,
                    task.error_message.as_deref().unwrap_or("unknown error")
                ),
                other => warn!("Task {} ended in unexpected status {}", id, other),
            },
            Ok(None) => warn!("Task {} disappeared while running", id),
            Err(e) => error!("Could not persist outcome for task {}: {}", id, e),
        }
        self.broadcaster.publish(self.store.snapshot());
        true
    }
}
