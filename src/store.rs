/*!
 * Durable task store.
 *
 * The store is the single source of truth for queue state: the full
 * ordered task list, persisted as a pretty-printed JSON snapshot that is
 * safe to inspect and hand-edit between runs. Every write serializes the
 * whole list to a temporary file in the same directory and atomically
 * replaces the snapshot, so a concurrent reader or a crash can never
 * observe a torn file. All mutations go through one mutex, the single
 * serialization point for the dispatcher and user-initiated changes.
 */

use log::{info, warn};
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::errors::StoreError;
use crate::task::{Task, TaskStatus};

/// Message recorded on tasks found running at load time
pub const INTERRUPTED_MESSAGE: &str =
    "Task was interrupted by a process restart before it could complete";

/// Durable, mutex-serialized store of the full task list
pub struct TaskStore {
    /// Snapshot file location
    path: PathBuf,

    /// In-memory task list; insertion order is submission order
    tasks: Mutex<Vec<Task>>,
}

impl TaskStore {
    /// Open (or create) a store backed by the given snapshot file.
    ///
    /// Reconstructs the exact queue state as of the last successful save.
    /// Any task found still `running` is evidence of an interrupted run
    /// and is transitioned to `error`, never silently resumed, because
    /// in-flight segment state is not persisted.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let mut tasks: Vec<Task> = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| StoreError::Corrupted(e.to_string()))?
            }
        } else {
            Vec::new()
        };

        let mut interrupted = 0;
        for task in tasks.iter_mut() {
            if task.status == TaskStatus::Running {
                task.status = TaskStatus::Error;
                task.error_message = Some(INTERRUPTED_MESSAGE.to_string());
                interrupted += 1;
            }
        }
        if interrupted > 0 {
            warn!(
                "Marked {} interrupted task(s) as errored while loading {}",
                interrupted,
                path.display()
            );
        }

        let store = TaskStore {
            path,
            tasks: Mutex::new(tasks),
        };
        // Persist immediately so the interruption marks (or the initial
        // empty list) survive a crash right after startup
        {
            let tasks = store.tasks.lock();
            store.save_locked(&tasks)?;
        }
        info!(
            "Task store ready at {} ({} task(s))",
            store.path.display(),
            store.tasks.lock().len()
        );
        Ok(store)
    }

    /// Snapshot file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the full list atomically: temp file in the same directory,
    /// then rename over the snapshot. Called with the lock held.
    fn save_locked(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(tasks)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.flush())
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io {
            path: self.path.clone(),
            source: e.error,
        })?;
        Ok(())
    }

    /// A consistent copy of the full ordered task list
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    /// Look up one task by id
    pub fn get(&self, id: &str) -> Option<Task> {
        self.tasks.lock().iter().find(|t| t.id == id).cloned()
    }

    /// Whether the given task is currently running
    pub fn is_running(&self, id: &str) -> bool {
        self.tasks
            .lock()
            .iter()
            .any(|t| t.id == id && t.status == TaskStatus::Running)
    }

    /// Whether any task is currently running
    pub fn has_running(&self) -> bool {
        self.tasks
            .lock()
            .iter()
            .any(|t| t.status == TaskStatus::Running)
    }

    /// Oldest pending task by creation order (ties broken by id)
    pub fn next_pending(&self) -> Option<Task> {
        self.tasks
            .lock()
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .min_by(|a, b| a.queue_key().cmp(&b.queue_key()))
            .cloned()
    }

    /// Append a new task and persist
    pub fn insert(&self, task: Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock();
        tasks.push(task);
        self.save_locked(&tasks)
    }

    /// Replace a task by id (or append if unknown) and persist
    pub fn upsert(&self, task: Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock();
        match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => tasks.push(task),
        }
        self.save_locked(&tasks)
    }

    /// Mutate one task under the lock and persist; returns the updated
    /// copy, or None when the id is unknown (e.g. deleted mid-run).
    ///
    /// A failed persist rolls the in-memory task back to its previous
    /// state, so memory never disagrees with the snapshot on disk.
    pub fn update<F>(&self, id: &str, mutate: F) -> Result<Option<Task>, StoreError>
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.tasks.lock();
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        let previous = task.clone();
        mutate(task);
        let updated = task.clone();
        if let Err(e) = self.save_locked(&tasks) {
            if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
                *task = previous;
            }
            return Err(e);
        }
        Ok(Some(updated))
    }

    /// Remove a task by id and persist; returns the removed task
    pub fn remove(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let mut tasks = self.tasks.lock();
        let Some(index) = tasks.iter().position(|t| t.id == id) else {
            return Ok(None);
        };
        let removed = tasks.remove(index);
        self.save_locked(&tasks)?;
        Ok(Some(removed))
    }
}
