/*!
 * Segment model and document extract/merge implementations.
 *
 * A segment is one atomic unit of translatable text with a stable id
 * derived from its structural position in the source document:
 *
 * - `tabular`: CSV rows with source/target columns, id = row index
 * - `idml`: IDML story runs, id = (story path, run index)
 *
 * Segment ids are a pure function of position, never of content, so
 * re-extracting the same document always yields the same id sequence.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod idml;
pub mod tabular;

pub use idml::IdmlPackage;
pub use tabular::TabularDocument;

/// Stable identifier for one translatable unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentId {
    /// Zero-based data-row index in a tabular document
    Row(usize),
    /// A formatting run inside an IDML story
    Run {
        /// Archive path of the story, e.g. "Stories/Story_u123.xml"
        story: String,
        /// Zero-based run index in document order within the story
        run: usize,
    },
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentId::Row(index) => write!(f, "row:{}", index),
            SegmentId::Run { story, run } => write!(f, "{}#{}", story, run),
        }
    }
}

impl std::str::FromStr for SegmentId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(index) = s.strip_prefix("row:") {
            let index = index
                .parse::<usize>()
                .map_err(|_| anyhow::anyhow!("Invalid row index in segment id: {}", s))?;
            return Ok(SegmentId::Row(index));
        }
        // Story ids use the last '#' as separator so story names may contain '#'
        let (story, run) = s
            .rsplit_once('#')
            .ok_or_else(|| anyhow::anyhow!("Invalid segment id: {}", s))?;
        if story.is_empty() {
            return Err(anyhow::anyhow!("Invalid segment id: {}", s));
        }
        let run = run
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("Invalid run index in segment id: {}", s))?;
        Ok(SegmentId::Run {
            story: story.to_string(),
            run,
        })
    }
}

/// One translatable unit extracted from a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Stable structural id
    pub id: SegmentId,

    /// Original text
    pub source_text: String,

    /// Translated text, None until translated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_text: Option<String>,
}

impl Segment {
    /// Create an untranslated segment
    pub fn new(id: SegmentId, source_text: impl Into<String>) -> Self {
        Segment {
            id,
            source_text: source_text.into(),
            target_text: None,
        }
    }

    /// Create a segment that already carries a translation
    pub fn translated(
        id: SegmentId,
        source_text: impl Into<String>,
        target_text: impl Into<String>,
    ) -> Self {
        Segment {
            id,
            source_text: source_text.into(),
            target_text: Some(target_text.into()),
        }
    }
}
