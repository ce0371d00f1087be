/*!
 * Tabular (CSV) document extraction and merge.
 *
 * A tabular document carries a required `source` column and a `target`
 * column that is appended when missing. Extraction selects each data row
 * with a non-empty source and (unless overwriting) an empty target; merge
 * writes translations back into the target cell of the originating row,
 * leaving every other cell and the row order untouched.
 */

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::HashMap;
use std::str::FromStr;

use crate::errors::{ExtractError, MergeError};

use super::{Segment, SegmentId};

/// Required source-text column name
pub const SOURCE_COLUMN: &str = "source";
/// Translation column name, appended when absent
pub const TARGET_COLUMN: &str = "target";
/// Segment id column name in exported segment artifacts
pub const SEGMENT_ID_COLUMN: &str = "segment_id";

/// An in-memory tabular document with addressable source/target cells
#[derive(Debug, Clone)]
pub struct TabularDocument {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    source_idx: usize,
    target_idx: usize,
}

impl TabularDocument {
    /// Parse CSV bytes into a tabular document.
    ///
    /// Fails when the input is not readable CSV or lacks a `source`
    /// column; a missing `target` column is appended with empty cells.
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
            .position(|h| h == SOURCE_COLUMN)
            .ok_or_else(|| ExtractError::MissingColumn(SOURCE_COLUMN.to_string()))?;

        let mut headers = headers;
        let target_idx = match headers.iter().position(|h| h == TARGET_COLUMN) {
            Some(idx) => idx,
            None => {
                headers.push(TARGET_COLUMN.to_string());
                headers.len() - 1
            }
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ExtractError::InvalidCsv(e.to_string()))?;
            let mut row: Vec<String> = record.iter().map(|f| f.to_string()).collect();
            // Pad short rows so source/target cells are always addressable
            while row.len() < headers.len() {
                row.push(String::new());
            }
            rows.push(row);
        }

        Ok(TabularDocument {
            headers,
            rows,
            source_idx,
            target_idx,
        })
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Source cell of a row, if the row exists
    pub fn source_at(&self, row: usize) -> Option<&str> {
        self.rows.get(row).map(|r| r[self.source_idx].as_str())
    }

    /// Target cell of a row, if the row exists
    pub fn target_at(&self, row: usize) -> Option<&str> {
        self.rows.get(row).map(|r| r[self.target_idx].as_str())
    }

    /// Extract the segments selected for translation.
    ///
    /// A row becomes a segment when its source is non-empty and either
    /// `overwrite` is set or its target is empty. All other rows pass
    /// through the document unchanged.
    pub fn extract(&self, overwrite: bool) -> Vec<Segment> {
        let mut segments = Vec::new();
        for (index, row) in self.rows.iter().enumerate() {
            let source = row[self.source_idx].trim();
            if source.is_empty() {
                continue;
            }
            if !overwrite && !row[self.target_idx].is_empty() {
                continue;
            }
            segments.push(Segment::new(SegmentId::Row(index), source));
        }
        segments
    }

    /// Write translated segments back into their originating rows.
    ///
    /// Segments without a translation are skipped. Ids that do not name
    /// an existing row fail the merge, listing every offender.
    pub fn apply(&mut self, segments: &[Segment]) -> Result<(), MergeError> {
        let mut unknown = Vec::new();
        for segment in segments {
            let Some(target) = &segment.target_text else {
                continue;
            };
            match &segment.id {
                SegmentId::Row(index) if *index < self.rows.len() => {
                    let target_idx = self.target_idx;
                    self.rows[*index][target_idx] = target.clone();
                }
                other => unknown.push(other.to_string()),
            }
        }
        if !unknown.is_empty() {
            return Err(MergeError::UnknownSegments { ids: unknown });
        }
        Ok(())
    }

    /// Serialize the document back to CSV bytes.
    ///
    /// Flexible like the reader: a row carrying more fields than the
    /// header keeps its extra fields on the way out.
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        Ok(writer.into_inner()?)
    }
}

/// Serialize a segment list as a `segment_id,source,target` CSV artifact
pub fn write_segment_csv(segments: &[Segment]) -> anyhow::Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record([SEGMENT_ID_COLUMN, SOURCE_COLUMN, TARGET_COLUMN])?;
    for segment in segments {
        writer.write_record([
            segment.id.to_string().as_str(),
            segment.source_text.as_str(),
            segment.target_text.as_deref().unwrap_or(""),
        ])?;
    }
    Ok(writer.into_inner()?)
}

/// Read a segment list from a `segment_id,source,target` CSV artifact.
///
/// Rows with an empty target come back untranslated; a malformed id
/// fails the whole read so a rebuild never silently drops rows.
pub fn read_segment_csv(bytes: &[u8]) -> Result<Vec<Segment>, MergeError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| MergeError::MalformedId(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let columns: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();

    let id_idx = *columns
        .get(SEGMENT_ID_COLUMN)
        .ok_or_else(|| MergeError::MissingColumn(SEGMENT_ID_COLUMN.to_string()))?;
    let source_idx = *columns
        .get(SOURCE_COLUMN)
        .ok_or_else(|| MergeError::MissingColumn(SOURCE_COLUMN.to_string()))?;
    let target_idx = *columns
        .get(TARGET_COLUMN)
        .ok_or_else(|| MergeError::MissingColumn(TARGET_COLUMN.to_string()))?;

    let mut segments = Vec::new();
    for record in reader.records() {
        let record: StringRecord =
            record.map_err(|e| MergeError::MalformedId(e.to_string()))?;
        let raw_id = record.get(id_idx).unwrap_or("").trim();
        let id = SegmentId::from_str(raw_id)
            .map_err(|_| MergeError::MalformedId(raw_id.to_string()))?;
        let source = record.get(source_idx).unwrap_or("").to_string();
        let target = record.get(target_idx).unwrap_or("");
        segments.push(if target.is_empty() {
            Segment::new(id, source)
        } else {
            Segment::translated(id, source, target)
        });
    }
    Ok(segments)
}
