/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds with translated text
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::short_count()` - Returns one translation too few
 * - `MockProvider::fail_after(n)` - Succeeds for n batches, then fails
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::translation::Glossary;

use super::TranslationProvider;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a deterministic translation
    Working,
    /// Always fails with an error
    Failing,
    /// Returns one fewer translation than requested
    ShortCount,
    /// Succeeds for the first `n` batches, then fails
    FailAfter(usize),
    /// Simulates a slow response before succeeding
    Slow {
        /// Delay before responding, in milliseconds
        delay_ms: u64,
    },
}

/// Mock provider for testing pipeline behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Number of batch calls made so far
    batch_count: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            batch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock provider that always fails
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock provider that returns one translation too few
    pub fn short_count() -> Self {
        Self::new(MockBehavior::ShortCount)
    }

    /// Create a mock provider that fails after `n` successful batches
    pub fn fail_after(n: usize) -> Self {
        Self::new(MockBehavior::FailAfter(n))
    }

    /// Number of batch calls made against this provider
    pub fn batches_seen(&self) -> usize {
        self.batch_count.load(Ordering::SeqCst)
    }

    /// Deterministic fake translation for one text
    fn translate_one(text: &str, target_language: &str, glossary: Option<&Glossary>) -> String {
        if let Some(glossary) = glossary {
            for term in &glossary.terms {
                if text.contains(&term.source) {
                    return format!(
                        "[{}] {}",
                        target_language,
                        text.replace(&term.source, &term.target)
                    );
                }
            }
        }
        format!("[{}] {}", target_language, text)
    }
}

#[async_trait]
impl TranslationProvider for MockProvider {
    async fn translate_batch(
        &self,
        texts: &[String],
        _source_language: &str,
        target_language: &str,
        glossary: Option<&Glossary>,
    ) -> Result<Vec<String>, ProviderError> {
        let seen = self.batch_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => {}
            MockBehavior::Failing => {
                return Err(ProviderError::RequestFailed(
                    "mock provider configured to fail".to_string(),
                ));
            }
            MockBehavior::ShortCount => {
                let mut translations: Vec<String> = texts
                    .iter()
                    .map(|t| Self::translate_one(t, target_language, glossary))
                    .collect();
                translations.pop();
                return Ok(translations);
            }
            MockBehavior::FailAfter(n) => {
                if seen >= n {
                    return Err(ProviderError::RequestFailed(format!(
                        "mock provider failed on batch {}",
                        seen + 1
                    )));
                }
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            }
        }

        Ok(texts
            .iter()
            .map(|t| Self::translate_one(t, target_language, glossary))
            .collect())
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError(
                "mock provider configured to fail".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
