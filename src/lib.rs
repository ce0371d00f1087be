/*!
 * # doctran - persistent document translation queue
 *
 * A Rust library for translating tabular (CSV) and structured (IDML)
 * documents with an LLM, behind a durable single-worker task queue.
 *
 * ## Features
 *
 * - Persistent task queue that survives process restarts
 * - Strictly sequential worker: exactly one task runs at a time
 * - CSV translation with source/target columns and pass-through of
 *   untouched rows
 * - IDML translation that rewrites story run text in place, preserving
 *   all packaging and formatting structure
 * - Batch translation with per-batch checkpointing of progress and
 *   partial results
 * - Live task-list broadcasting to connected observers
 * - Optional per-task glossaries constraining the translation
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `task`: Task model and lifecycle rules
 * - `store`: Durable JSON-snapshot task store
 * - `queue`: Submission/query/result boundary
 * - `dispatcher`: Sequential worker loop
 * - `pipeline`: Per-task extract → translate → merge execution
 * - `broadcast`: Task-list fan-out to observers
 * - `segment`: Segment model plus the tabular and IDML document formats
 * - `translation`: Batch driver, glossary and prompt building
 * - `providers`: LLM provider clients (Ollama, plus a test mock)
 * - `language_utils`: ISO language code validation
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod broadcast;
pub mod dispatcher;
pub mod errors;
pub mod language_utils;
pub mod pipeline;
pub mod providers;
pub mod queue;
pub mod segment;
pub mod store;
pub mod task;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use broadcast::ProgressBroadcaster;
pub use dispatcher::Dispatcher;
pub use errors::{AppError, ProviderError, QueueError, StoreError, TranslationError};
pub use pipeline::Pipeline;
pub use queue::{Submission, TaskQueue};
pub use segment::{Segment, SegmentId};
pub use store::TaskStore;
pub use task::{Task, TaskKind, TaskStatus};
