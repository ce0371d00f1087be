/*!
 * Progress broadcasting to connected observers.
 *
 * Every task-state change publishes a snapshot of the full task list to
 * all subscribed observers over a tokio broadcast channel. Delivery is
 * best-effort and at-most-once per change: a slow observer lags and
 * drops old snapshots, a disconnected one simply misses updates; the
 * pipeline is never blocked by either. Observers that connect mid-run
 * pull the current list from the queue on connect; the channel only
 * carries changes from that point on.
 */

use log::debug;
use tokio::sync::broadcast;

use crate::task::Task;

/// Capacity of the per-observer update buffer; beyond this, the oldest
/// snapshots are dropped for that observer
const CHANNEL_CAPACITY: usize = 64;

/// Fan-out publisher of task-list snapshots
#[derive(Debug, Clone)]
pub struct ProgressBroadcaster {
    sender: broadcast::Sender<Vec<Task>>,
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBroadcaster {
    /// Create a broadcaster with no observers yet
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe a new observer; it receives every snapshot published
    /// after this call
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<Task>> {
        self.sender.subscribe()
    }

    /// Number of currently connected observers
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish a snapshot to every connected observer.
    ///
    /// Best-effort: with no observers connected the snapshot is simply
    /// dropped, and the send never blocks or fails the caller.
    pub fn publish(&self, tasks: Vec<Task>) {
        match self.sender.send(tasks) {
            Ok(observers) => debug!("Published task snapshot to {} observer(s)", observers),
            Err(_) => debug!("No observers connected, snapshot dropped"),
        }
    }
}
