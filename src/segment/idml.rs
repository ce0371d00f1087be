/*!
 * IDML container extraction and rebuild.
 *
 * An IDML file is a zip archive whose translatable text lives in
 * `Stories/Story_*.xml` entries, inside `<Content>` runs nested in
 * `<CharacterStyleRange>` elements. Extraction walks stories in sorted
 * name order and runs in document order, so re-extraction of the same
 * container always yields the same id sequence. Rebuild replaces run
 * text in place and streams every other byte of the package through
 * untouched: markup attributes, run boundaries, manifest and embedded
 * resources all survive verbatim.
 */

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::{ExtractError, MergeError};

use super::{Segment, SegmentId};

// Story entries as the original packages name them
static STORY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Stories/Story_.*\.xml$").unwrap());

const CHARACTER_STYLE_RANGE: &[u8] = b"CharacterStyleRange";
const CONTENT: &[u8] = b"Content";

/// An IDML package held in memory with its story list resolved
#[derive(Debug, Clone)]
pub struct IdmlPackage {
    bytes: Vec<u8>,
    stories: Vec<String>,
}

impl IdmlPackage {
    /// Open an IDML container from raw bytes.
    ///
    /// Validates that the bytes form a readable zip archive and resolves
    /// the story list; story XML is validated lazily during extraction.
    pub fn parse(bytes: Vec<u8>) -> Result<Self, ExtractError> {
        let archive = ZipArchive::new(Cursor::new(&bytes))
            .map_err(|e| ExtractError::InvalidArchive(e.to_string()))?;

        let mut stories: Vec<String> = archive
            .file_names()
            .filter(|name| STORY_NAME.is_match(name))
            .map(|name| name.to_string())
            .collect();
        // Sorted name order keeps extraction deterministic regardless of
        // the archive's physical entry order
        stories.sort();

        Ok(IdmlPackage { bytes, stories })
    }

    /// Story entry names in extraction order
    pub fn story_names(&self) -> &[String] {
        &self.stories
    }

    /// Extract one segment per text-bearing run across all stories.
    ///
    /// Run indices count every `<Content>` element inside a
    /// `<CharacterStyleRange>`, including empty ones, so ids stay stable
    /// whether or not a run currently holds text; empty runs simply
    /// produce no segment.
    pub fn extract(&self) -> Result<Vec<Segment>, ExtractError> {
        let mut archive = ZipArchive::new(Cursor::new(&self.bytes))
            .map_err(|e| ExtractError::InvalidArchive(e.to_string()))?;

        let mut segments = Vec::new();
        for story in &self.stories {
            let xml = read_entry(&mut archive, story)?;
            extract_story_runs(story, &xml, &mut segments)?;
        }
        Ok(segments)
    }

    /// Rebuild the package with translated run text.
    ///
    /// Segments without a translation leave their run as-is. Every id
    /// that names a story or run the package does not contain fails the
    /// rebuild, listing all offenders.
    pub fn rebuild(&self, segments: &[Segment]) -> Result<Vec<u8>> {
        let mut unknown: Vec<String> = Vec::new();
        let mut translations: HashMap<&str, HashMap<usize, &str>> = HashMap::new();
        for segment in segments {
            let Some(target) = segment.target_text.as_deref() else {
                continue;
            };
            match &segment.id {
                SegmentId::Run { story, run } if self.stories.iter().any(|s| s == story) => {
                    translations
                        .entry(story.as_str())
                        .or_default()
                        .insert(*run, target);
                }
                other => unknown.push(other.to_string()),
            }
        }

        let mut archive = ZipArchive::new(Cursor::new(&self.bytes))
            .context("Failed to reopen IDML archive for rebuild")?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for index in 0..archive.len() {
            let name = archive
                .by_index_raw(index)
                .context("Failed to read IDML archive entry")?
                .name()
                .to_string();

            if !STORY_NAME.is_match(&name) {
                // Non-story packaging is copied through unchanged
                let entry = archive
                    .by_index_raw(index)
                    .context("Failed to read IDML archive entry")?;
                writer
                    .raw_copy_file(entry)
                    .context("Failed to copy IDML archive entry")?;
                continue;
            }

            let mut xml = String::new();
            archive
                .by_name(&name)
                .with_context(|| format!("Failed to open story '{}'", name))?
                .read_to_string(&mut xml)
                .with_context(|| format!("Failed to read story '{}'", name))?;

            let story_translations = translations.remove(name.as_str()).unwrap_or_default();
            let (rewritten, leftover) = rewrite_story_runs(&name, &xml, story_translations)?;
            unknown.extend(leftover);

            writer
                .start_file(&name, options)
                .with_context(|| format!("Failed to start story entry '{}'", name))?;
            writer
                .write_all(&rewritten)
                .with_context(|| format!("Failed to write story entry '{}'", name))?;
        }

        if !unknown.is_empty() {
            unknown.sort();
            return Err(MergeError::UnknownSegments { ids: unknown }.into());
        }

        let cursor = writer
            .finish()
            .context("Failed to finalize rebuilt IDML archive")?;
        Ok(cursor.into_inner())
    }
}

/// Read one archive entry to a string
fn read_entry(
    archive: &mut ZipArchive<Cursor<&Vec<u8>>>,
    name: &str,
) -> Result<String, ExtractError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::InvalidArchive(e.to_string()))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::InvalidXml {
            story: name.to_string(),
            message: e.to_string(),
        })?;
    Ok(xml)
}

/// Walk one story and append a segment per text-bearing run
fn extract_story_runs(
    story: &str,
    xml: &str,
    segments: &mut Vec<Segment>,
) -> Result<(), ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut in_range = false;
    let mut in_content = false;
    let mut run_index: usize = 0;
    let mut current_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                if name.as_ref() == CHARACTER_STYLE_RANGE {
                    in_range = true;
                } else if name.as_ref() == CONTENT && in_range {
                    in_content = true;
                    current_text.clear();
                }
            }
            Ok(Event::Empty(e)) => {
                // An empty <Content/> still occupies a run slot
                if e.local_name().as_ref() == CONTENT && in_range {
                    run_index += 1;
                }
            }
            Ok(Event::Text(e)) => {
                if in_content {
                    let text = e.unescape().map_err(|err| ExtractError::InvalidXml {
                        story: story.to_string(),
                        message: err.to_string(),
                    })?;
                    current_text.push_str(&text);
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == CONTENT && in_content {
                    let trimmed = current_text.trim();
                    if !trimmed.is_empty() {
                        segments.push(Segment::new(
                            SegmentId::Run {
                                story: story.to_string(),
                                run: run_index,
                            },
                            trimmed,
                        ));
                    }
                    in_content = false;
                    run_index += 1;
                } else if name.as_ref() == CHARACTER_STYLE_RANGE {
                    in_range = false;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractError::InvalidXml {
                    story: story.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Rewrite one story, replacing run text where a translation exists.
///
/// Returns the rewritten XML plus the ids of translations whose run
/// index never appeared in the story.
fn rewrite_story_runs(
    story: &str,
    xml: &str,
    mut translations: HashMap<usize, &str>,
) -> Result<(Vec<u8>, Vec<String>)> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut in_range = false;
    let mut in_content = false;
    let mut run_index: usize = 0;
    let mut replacement: Option<&str> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| anyhow!("Corrupted XML in story '{}': {}", story, e))?;
        match event {
            Event::Start(e) => {
                let is_range = e.local_name().as_ref() == CHARACTER_STYLE_RANGE;
                let is_content = e.local_name().as_ref() == CONTENT;
                writer.write_event(Event::Start(e))?;
                if is_range {
                    in_range = true;
                } else if is_content && in_range {
                    in_content = true;
                    replacement = translations.remove(&run_index);
                }
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == CONTENT && in_range {
                    // Expand <Content/> when a translation lands in it
                    if let Some(target) = translations.remove(&run_index) {
                        let end = e.to_end().into_owned();
                        writer.write_event(Event::Start(e))?;
                        writer.write_event(Event::Text(BytesText::new(target)))?;
                        writer.write_event(Event::End(end))?;
                    } else {
                        writer.write_event(Event::Empty(e))?;
                    }
                    run_index += 1;
                } else {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::Text(e) => {
                if in_content && replacement.is_some() {
                    // Original run text is dropped; the translation is
                    // written just before the closing tag
                } else {
                    writer.write_event(Event::Text(e))?;
                }
            }
            Event::End(e) => {
                let is_range = e.local_name().as_ref() == CHARACTER_STYLE_RANGE;
                let is_content = e.local_name().as_ref() == CONTENT;
                if is_content && in_content {
                    if let Some(target) = replacement.take() {
                        writer.write_event(Event::Text(BytesText::new(target)))?;
                    }
                    in_content = false;
                    run_index += 1;
                } else if is_range {
                    in_range = false;
                }
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    let leftover = translations
        .keys()
        .map(|run| {
            SegmentId::Run {
                story: story.to_string(),
                run: *run,
            }
            .to_string()
        })
        .collect();

    Ok((writer.into_inner().into_inner(), leftover))
}
