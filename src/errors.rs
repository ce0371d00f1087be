/*!
 * Error types for the doctran application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when talking to a translation provider API
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors that can occur while extracting segments from an input document
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A required column is missing from a tabular input
    #[error("Input is missing the required '{0}' column")]
    MissingColumn(String),

    /// The input could not be parsed as CSV
    #[error("Failed to parse CSV input: {0}")]
    InvalidCsv(String),

    /// The container is not a readable zip archive
    #[error("Invalid IDML file: not a valid zip archive ({0})")]
    InvalidArchive(String),

    /// A story inside the container holds corrupted XML
    #[error("Invalid IDML file: story '{story}' contains corrupted XML: {message}")]
    InvalidXml {
        /// Archive path of the offending story
        story: String,
        /// Parser error detail
        message: String,
    },
}

/// Errors that can occur while merging translated segments back into a document
#[derive(Error, Debug)]
pub enum MergeError {
    /// Translated segment ids refer to runs that do not exist in the original
    #[error("Translated segments refer to unknown runs: {}", ids.join(", "))]
    UnknownSegments {
        /// The offending segment ids, in input order
        ids: Vec<String>,
    },

    /// A segment id string could not be parsed
    #[error("Malformed segment id '{0}'")]
    MalformedId(String),

    /// A required column is missing from a translated tabular artifact
    #[error("Translated input is missing the required '{0}' column")]
    MissingColumn(String),
}

/// Errors that can occur during the translation stage of a task
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider returned a different number of texts than requested
    #[error("Batch count mismatch: requested {requested} translations, received {received}")]
    CountMismatch {
        /// Number of source texts in the batch
        requested: usize,
        /// Number of translations returned
        received: usize,
    },
}

/// Errors that can occur while persisting the task list
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error reading or writing the snapshot file
    #[error("Task store I/O error on {path}: {source}")]
    Io {
        /// Snapshot file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file holds invalid JSON
    #[error("Task store snapshot is corrupted: {0}")]
    Corrupted(String),

    /// Error serializing the task list
    #[error("Failed to serialize task list: {0}")]
    Serialize(String),
}

/// Errors surfaced at the submission/query boundary
#[derive(Error, Debug)]
pub enum QueueError {
    /// The submitted document kind is not supported
    #[error("Unsupported document kind: {0}")]
    UnsupportedKind(String),

    /// The submitted document failed synchronous validation
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// The language code is not recognized
    #[error("Unknown language code: {0}")]
    UnknownLanguage(String),

    /// No task exists with the given id
    #[error("No task with id {0}")]
    TaskNotFound(String),

    /// The task is currently running and cannot be deleted
    #[error("Task {0} is currently running and cannot be deleted")]
    TaskRunning(String),

    /// The task has not produced a result artifact
    #[error("Task {0} has no result (status: {1})")]
    ResultNotReady(String, String),

    /// The uploaded file could not be stored
    #[error("Failed to store uploaded file: {0}")]
    UploadFailed(String),

    /// The result artifact exists in the task record but cannot be read
    #[error("Failed to read result artifact: {0}")]
    ArtifactUnreadable(String),

    /// Error from the task store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error extracting segments from a document
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Error merging translations back into a document
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// Error from the translation stage
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from the task store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error from the queue boundary
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
