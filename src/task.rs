/*!
 * Task model for queued translation jobs.
 *
 * A task tracks one user-submitted job through its lifecycle
 * (pending → running → completed/error) and carries everything
 * the pipeline needs to run it: input location, language pair,
 * overwrite flag and optional glossary.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Document kind for a translation task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Flat CSV file with source/target columns
    Tabular,
    /// IDML container of markup stories
    Idml,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Tabular => write!(f, "tabular"),
            TaskKind::Idml => write!(f, "idml"),
        }
    }
}

impl std::str::FromStr for TaskKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tabular" | "csv" => Ok(TaskKind::Tabular),
            "idml" => Ok(TaskKind::Idml),
            _ => Err(anyhow::anyhow!("Invalid task kind: {}", s)),
        }
    }
}

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Queued, waiting to be picked up by the worker
    Pending,
    /// Currently being processed by the worker
    Running,
    /// Finished successfully with a result artifact
    Completed,
    /// Failed with a recorded error message
    Error,
}

impl TaskStatus {
    /// Whether a transition from this status to `next` is allowed.
    ///
    /// The only forward transitions are pending → running and
    /// running → completed/error; nothing ever moves backward.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Error)
        )
    }

    /// Whether this status is terminal (no further transitions)
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "error" => Ok(TaskStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid task status: {}", s)),
        }
    }
}

/// Progress counters for a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    /// Number of segments translated so far
    pub processed: u64,
    /// Total number of segments selected for translation
    pub total: u64,
}

/// Immutable per-task translation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Source language code
    pub source_language: String,

    /// Target language code
    pub target_language: String,

    /// Whether to re-translate rows that already have a target
    #[serde(default)]
    pub overwrite: bool,

    /// Optional glossary CSV constraining the translation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glossary_path: Option<PathBuf>,
}

/// One queued translation job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique id, generated at submission, immutable
    pub id: String,

    /// Identity of the submitting user (authorization happens at the boundary)
    pub owner: String,

    /// Document kind, fixed at creation
    pub kind: TaskKind,

    /// Lifecycle status
    pub status: TaskStatus,

    /// Progress counters
    #[serde(default)]
    pub progress: TaskProgress,

    /// Translation configuration, immutable once the task starts running
    pub config: TaskConfig,

    /// Location of the stored upload
    pub input_path: PathBuf,

    /// Location of the produced artifact; set only on completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<PathBuf>,

    /// Human-readable failure message; set only on error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Submission timestamp, the FIFO ordering key
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a new pending task
    pub fn new(
        id: String,
        owner: String,
        kind: TaskKind,
        config: TaskConfig,
        input_path: PathBuf,
    ) -> Self {
        Task {
            id,
            owner,
            kind,
            status: TaskStatus::Pending,
            progress: TaskProgress::default(),
            config,
            input_path,
            result_ref: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// Transition the task to a new status, enforcing the lifecycle rules
    pub fn transition(&mut self, next: TaskStatus) -> anyhow::Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(anyhow::anyhow!(
                "Invalid status transition for task {}: {} -> {}",
                self.id,
                self.status,
                next
            ));
        }
        self.status = next;
        Ok(())
    }

    /// Mark the task completed with its result artifact
    pub fn complete(&mut self, result_ref: PathBuf) -> anyhow::Result<()> {
        self.transition(TaskStatus::Completed)?;
        self.result_ref = Some(result_ref);
        Ok(())
    }

    /// Mark the task failed with a recorded message
    pub fn fail(&mut self, message: impl Into<String>) -> anyhow::Result<()> {
        self.transition(TaskStatus::Error)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Update progress counters. `processed` never decreases and `total`
    /// stays fixed once set.
    pub fn set_progress(&mut self, processed: u64, total: u64) {
        self.progress.processed = self.progress.processed.max(processed);
        if self.progress.total == 0 {
            self.progress.total = total;
        }
    }

    /// FIFO ordering key: creation time, ties broken by id
    pub fn queue_key(&self) -> (DateTime<Utc>, &str) {
        (self.created_at, &self.id)
    }
}
