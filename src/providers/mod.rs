/*!
 * Provider implementations for the external translation service.
 *
 * This module contains the client boundary to the LLM that performs the
 * actual translation:
 * - Ollama: local LLM server
 * - Mock: configurable in-process provider for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;
use crate::translation::Glossary;

/// Common trait for all translation providers
///
/// This is the single collaborator boundary to the external LLM: given
/// ordered source texts and a language pair, it returns translated texts
/// in the same order and count. Any failure surfaces as one
/// `ProviderError`; the pipeline treats the service as a
/// single-concurrency resource and never dispatches batches in parallel.
#[async_trait]
pub trait TranslationProvider: Send + Sync + Debug {
    /// Translate an ordered batch of texts.
    ///
    /// # Arguments
    /// * `texts` - Source texts, in segment order
    /// * `source_language` - Source language code
    /// * `target_language` - Target language code
    /// * `glossary` - Optional terminology constraints
    ///
    /// # Returns
    /// * Translated texts, positionally matched to `texts`
    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
        glossary: Option<&Glossary>,
    ) -> Result<Vec<String>, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

pub mod mock;
pub mod ollama;
