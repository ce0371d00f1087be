/*!
 * Task queue boundary: submission, query, deletion and result retrieval.
 *
 * `TaskQueue` is the facade the transport layer talks to. Submission
 * validates the document synchronously, stores the upload, creates a
 * pending task and signals the worker; it never blocks on processing.
 * Deletion removes non-running tasks outright and rejects running ones;
 * the worker owns a running task until it reaches a terminal state.
 */

use bytes::Bytes;
use log::{debug, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::broadcast::ProgressBroadcaster;
use crate::errors::QueueError;
use crate::language_utils;
use crate::segment::{IdmlPackage, TabularDocument};
use crate::store::TaskStore;
use crate::task::{Task, TaskConfig, TaskKind, TaskStatus};
use crate::translation::Glossary;

/// A submission received at the boundary
#[derive(Debug, Clone)]
pub struct Submission {
    /// Identity of the submitting user
    pub owner: String,
    /// Document kind
    pub kind: TaskKind,
    /// Raw bytes of the uploaded document
    pub file_bytes: Vec<u8>,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Whether to re-translate rows that already carry a target
    pub overwrite: bool,
    /// Optional glossary CSV bytes
    pub glossary_bytes: Option<Vec<u8>>,
}

/// Facade over the store, worker signal and broadcaster
pub struct TaskQueue {
    store: Arc<TaskStore>,
    broadcaster: ProgressBroadcaster,
    notify: Arc<Notify>,
    uploads_dir: PathBuf,
}

impl TaskQueue {
    /// Create a queue over an opened store
    pub fn new(
        store: Arc<TaskStore>,
        broadcaster: ProgressBroadcaster,
        notify: Arc<Notify>,
        uploads_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            broadcaster,
            notify,
            uploads_dir,
        }
    }

    /// Submit a new translation job.
    ///
    /// Validates the languages, document bytes and optional glossary
    /// synchronously: a task is only created for inputs the pipeline
    /// can actually process. Returns the new task id immediately.
    pub fn submit(&self, submission: Submission) -> Result<String, QueueError> {
        language_utils::validate_language_code(&submission.source_language)
            .map_err(|_| QueueError::UnknownLanguage(submission.source_language.clone()))?;
        language_utils::validate_language_code(&submission.target_language)
            .map_err(|_| QueueError::UnknownLanguage(submission.target_language.clone()))?;

        // Parse once now so structurally broken inputs are rejected at
        // the boundary instead of failing later inside the worker
        let extension = match submission.kind {
            TaskKind::Tabular => {
                TabularDocument::parse(&submission.file_bytes)
                    .map_err(|e| QueueError::InvalidDocument(e.to_string()))?;
                "csv"
            }
            TaskKind::Idml => {
                IdmlPackage::parse(submission.file_bytes.clone())
                    .map_err(|e| QueueError::InvalidDocument(e.to_string()))?;
                "idml"
            }
        };

        if let Some(glossary_bytes) = &submission.glossary_bytes {
            Glossary::parse(glossary_bytes)
                .map_err(|e| QueueError::InvalidDocument(format!("glossary: {}", e)))?;
        }

        let id = Uuid::new_v4().to_string();

        std::fs::create_dir_all(&self.uploads_dir)
            .map_err(|e| QueueError::UploadFailed(e.to_string()))?;
        let input_path = self.uploads_dir.join(format!("{}.{}", id, extension));
        std::fs::write(&input_path, &submission.file_bytes)
            .map_err(|e| QueueError::UploadFailed(e.to_string()))?;

        let glossary_path = match &submission.glossary_bytes {
            Some(glossary_bytes) => {
                let path = self.uploads_dir.join(format!("{}.glossary.csv", id));
                std::fs::write(&path, glossary_bytes)
                    .map_err(|e| QueueError::UploadFailed(e.to_string()))?;
                Some(path)
            }
            None => None,
        };

        let task = Task::new(
            id.clone(),
            submission.owner,
            submission.kind,
            TaskConfig {
                source_language: submission.source_language,
                target_language: submission.target_language,
                overwrite: submission.overwrite,
                glossary_path,
            },
            input_path,
        );
        self.store.insert(task)?;

        debug!("Task {} submitted", id);
        self.broadcaster.publish(self.store.snapshot());
        self.notify.notify_one();
        Ok(id)
    }

    /// The current ordered task list
    pub fn list(&self) -> Vec<Task> {
        self.store.snapshot()
    }

    /// Look up one task
    pub fn get(&self, id: &str) -> Option<Task> {
        self.store.get(id)
    }

    /// Whether the given task is currently being processed
    pub fn is_running(&self, id: &str) -> bool {
        self.store.is_running(id)
    }

    /// Delete a task by id.
    ///
    /// Rejected when the task does not exist or is currently running;
    /// a running task owns in-flight state that must not be torn down.
    pub fn delete(&self, id: &str) -> Result<Task, QueueError> {
        let task = self
            .store
            .get(id)
            .ok_or_else(|| QueueError::TaskNotFound(id.to_string()))?;
        if task.status == TaskStatus::Running {
            return Err(QueueError::TaskRunning(id.to_string()));
        }

        let removed = self
            .store
            .remove(id)?
            .ok_or_else(|| QueueError::TaskNotFound(id.to_string()))?;

        // Best-effort cleanup of files owned by the task
        for path in [Some(&removed.input_path), removed.result_ref.as_ref()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Could not remove {} for deleted task {}: {}", path.display(), id, e);
            }
        }
        if let Some(glossary_path) = &removed.config.glossary_path {
            if let Err(e) = std::fs::remove_file(glossary_path) {
                warn!("Could not remove glossary for deleted task {}: {}", id, e);
            }
        }

        self.broadcaster.publish(self.store.snapshot());
        Ok(removed)
    }

    /// Bytes of the result artifact for a completed task
    pub fn result_bytes(&self, id: &str) -> Result<Bytes, QueueError> {
        let task = self
            .store
            .get(id)
            .ok_or_else(|| QueueError::TaskNotFound(id.to_string()))?;
        let result_ref = match (&task.status, &task.result_ref) {
            (TaskStatus::Completed, Some(result_ref)) => result_ref.clone(),
            _ => {
                return Err(QueueError::ResultNotReady(
                    id.to_string(),
                    task.status.to_string(),
                ));
            }
        };
        let bytes = std::fs::read(&result_ref)
            .map_err(|e| QueueError::ArtifactUnreadable(e.to_string()))?;
        Ok(Bytes::from(bytes))
    }

    /// Subscribe an observer to task-list snapshots; pair with `list()`
    /// on connect so late joiners see the current state
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Vec<Task>> {
        self.broadcaster.subscribe()
    }
}
