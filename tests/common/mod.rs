/*!
 * Common test utilities for the doctran test suite
 */

use anyhow::Result;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use doctran::providers::TranslationProvider;
use doctran::{Dispatcher, Pipeline, ProgressBroadcaster, TaskQueue, TaskStore};

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A small CSV document with one untranslated and one translated row
pub fn sample_csv() -> Vec<u8> {
    b"source,target,note\nHello,,greeting\nBye,x,farewell\n".to_vec()
}

/// Builds a minimal IDML package with two stories (3 + 2 runs)
pub fn sample_idml() -> Vec<u8> {
    const STORY_A: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Story Self="ua">
  <CharacterStyleRange AppliedCharacterStyle="CharacterStyle/Plain">
    <Content>Hello</Content>
    <Br/>
    <Content>world</Content>
  </CharacterStyleRange>
  <CharacterStyleRange AppliedCharacterStyle="CharacterStyle/Bold">
    <Content>bold run</Content>
  </CharacterStyleRange>
</Story>"#;
    const STORY_B: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Story Self="ub">
  <CharacterStyleRange AppliedCharacterStyle="CharacterStyle/Italic">
    <Content>first</Content>
    <Content>second</Content>
  </CharacterStyleRange>
</Story>"#;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file("mimetype", options).unwrap();
    writer
        .write_all(b"application/vnd.adobe.indesign-idml-package")
        .unwrap();
    writer.start_file("Stories/Story_ua.xml", options).unwrap();
    writer.write_all(STORY_A.as_bytes()).unwrap();
    writer.start_file("Stories/Story_ub.xml", options).unwrap();
    writer.write_all(STORY_B.as_bytes()).unwrap();
    writer.start_file("designmap.xml", options).unwrap();
    writer.write_all(b"<Document/>").unwrap();
    writer.finish().unwrap().into_inner()
}

/// A fully wired queue, dispatcher and store over a temp data directory
pub struct TestHarness {
    pub queue: TaskQueue,
    pub dispatcher: Dispatcher,
    pub store: Arc<TaskStore>,
    pub results_dir: PathBuf,
}

/// Wires a queue and dispatcher over `dir` with the given provider
pub fn build_harness(
    dir: &Path,
    provider: Arc<dyn TranslationProvider>,
    batch_size: usize,
) -> TestHarness {
    let store = Arc::new(TaskStore::open(dir.join("tasks.json")).unwrap());
    let broadcaster = ProgressBroadcaster::new();
    let notify = Arc::new(Notify::new());
    let results_dir = dir.join("results");

    let queue = TaskQueue::new(
        store.clone(),
        broadcaster.clone(),
        notify.clone(),
        dir.join("uploads"),
    );
    let pipeline = Pipeline::new(
        store.clone(),
        broadcaster.clone(),
        provider,
        batch_size,
        results_dir.clone(),
    );
    let dispatcher = Dispatcher::new(
        store.clone(),
        broadcaster.clone(),
        pipeline,
        notify,
        Duration::from_millis(50),
    );

    TestHarness {
        queue,
        dispatcher,
        store,
        results_dir,
    }
}
