/*!
 * Translation stage: batching, glossaries and prompt construction.
 *
 * This module contains the pipeline's translation stage, split into
 * several submodules:
 *
 * - `batch`: ordered batch processing with per-batch checkpoints
 * - `glossary`: terminology constraints loaded from CSV
 * - `prompts`: prompt templates for the provider boundary
 */

// Re-export main types for easier usage
pub use self::batch::{BatchTranslator, DEFAULT_BATCH_SIZE};
pub use self::glossary::{Glossary, GlossaryTerm};
pub use self::prompts::TranslationPromptBuilder;

// Submodules
pub mod batch;
pub mod glossary;
pub mod prompts;
