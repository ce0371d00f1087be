/*!
 * Batch translation processing.
 *
 * This module drives the provider over ordered fixed-size batches of
 * segments, with a checkpoint callback after every batch so progress is
 * persisted and broadcast as the task advances. Batches run strictly in
 * segment order and never in parallel: the external service is treated
 * as a single-concurrency resource.
 */

use anyhow::Result;
use log::{debug, info};
use std::sync::Arc;

use crate::errors::TranslationError;
use crate::providers::TranslationProvider;
use crate::segment::Segment;

use super::glossary::Glossary;

/// Default number of segments per provider call
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Batch translator for processing segments in ordered batches
pub struct BatchTranslator {
    /// The provider performing the actual translation
    provider: Arc<dyn TranslationProvider>,

    /// Number of segments per batch
    batch_size: usize,
}

impl BatchTranslator {
    /// Create a new batch translator
    pub fn new(provider: Arc<dyn TranslationProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            // A zero batch size would never make progress
            batch_size: batch_size.max(1),
        }
    }

    /// Configured batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Translate segments in place, batch by batch.
    ///
    /// After each successful batch the translations are written into the
    /// segment slice and `checkpoint(processed, total, segments)` runs so
    /// the caller can persist and broadcast. When a batch fails (provider
    /// error or a returned-count mismatch) the error propagates with the
    /// failed batch's output discarded; translations from every earlier,
    /// checkpointed batch stay in the slice.
    pub async fn translate_segments<F>(
        &self,
        segments: &mut [Segment],
        source_language: &str,
        target_language: &str,
        glossary: Option<&Glossary>,
        mut checkpoint: F,
    ) -> Result<()>
    where
        F: FnMut(u64, u64, &[Segment]) -> Result<()> + Send,
    {
        let total = segments.len() as u64;
        if total == 0 {
            debug!("No segments selected for translation");
            return Ok(());
        }

        let mut processed: u64 = 0;
        let mut start = 0usize;
        while start < segments.len() {
            let end = (start + self.batch_size).min(segments.len());
            let texts: Vec<String> = segments[start..end]
                .iter()
                .map(|s| s.source_text.clone())
                .collect();

            let translations = self
                .provider
                .translate_batch(&texts, source_language, target_language, glossary)
                .await
                .map_err(TranslationError::Provider)?;

            if translations.len() != texts.len() {
                return Err(TranslationError::CountMismatch {
                    requested: texts.len(),
                    received: translations.len(),
                }
                .into());
            }

            for (segment, translation) in segments[start..end].iter_mut().zip(translations) {
                segment.target_text = Some(translation);
            }

            processed = (processed + (end - start) as u64).min(total);
            info!(
                "Translated batch {}..{} ({}/{} segments)",
                start, end, processed, total
            );
            checkpoint(processed, total, segments)?;

            start = end;
        }

        Ok(())
    }
}
