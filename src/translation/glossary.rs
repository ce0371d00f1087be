/*!
 * Glossary loading for terminology-constrained translation.
 *
 * A glossary is a CSV file with `source,target` columns mapping source
 * terms to their required translations. It is loaded once per task and
 * never changes during the run; it constrains the prompt only and never
 * alters segment ids or counts.
 */

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::ExtractError;

/// One fixed source-term to target-term mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    /// Term as it appears in the source language
    pub source: String,
    /// Required translation in the target language
    pub target: String,
}

/// An ordered, immutable set of glossary terms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Glossary {
    /// Terms in file order
    pub terms: Vec<GlossaryTerm>,
}

impl Glossary {
    /// Parse a glossary from CSV bytes with `source,target` columns
    pub fn parse(bytes: &[u8]) -> Result<Self, ExtractError> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ExtractError::InvalidCsv(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let source_idx = headers
            .iter()
            .position(|h| h == "source")
            .ok_or_else(|| ExtractError::MissingColumn("source".to_string()))?;
        let target_idx = headers
            .iter()
            .position(|h| h == "target")
            .ok_or_else(|| ExtractError::MissingColumn("target".to_string()))?;

        let mut terms = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ExtractError::InvalidCsv(e.to_string()))?;
            let source = record.get(source_idx).unwrap_or("").trim();
            let target = record.get(target_idx).unwrap_or("").trim();
            if source.is_empty() || target.is_empty() {
                continue;
            }
            terms.push(GlossaryTerm {
                source: source.to_string(),
                target: target.to_string(),
            });
        }

        Ok(Glossary { terms })
    }

    /// Load a glossary from a CSV file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read glossary file: {:?}", path.as_ref()))?;
        Ok(Self::parse(&bytes)?)
    }

    /// Whether the glossary holds no terms
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }
}
