/*!
 * Per-task translation pipeline.
 *
 * Runs one task from stored upload to result artifact: parse the
 * document, extract the segments selected for translation, drive the
 * provider over ordered batches, and merge the translations back into
 * the original structure. After every batch a checkpoint persists the
 * progress counters, writes a partial artifact and broadcasts the new
 * task list, so an interrupted run leaves an inspectable trail.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;

use crate::broadcast::ProgressBroadcaster;
use crate::providers::TranslationProvider;
use crate::segment::tabular::write_segment_csv;
use crate::segment::{IdmlPackage, TabularDocument};
use crate::store::TaskStore;
use crate::task::{Task, TaskKind};
use crate::translation::{BatchTranslator, Glossary};

/// Pipeline wiring shared by every task run
pub struct Pipeline {
    store: Arc<TaskStore>,
    broadcaster: ProgressBroadcaster,
    translator: BatchTranslator,
    results_dir: PathBuf,
}

impl Pipeline {
    /// Create a pipeline over the given store, broadcaster and provider
    pub fn new(
        store: Arc<TaskStore>,
        broadcaster: ProgressBroadcaster,
        provider: Arc<dyn TranslationProvider>,
        batch_size: usize,
        results_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            broadcaster,
            translator: BatchTranslator::new(provider, batch_size),
            results_dir,
        }
    }

    /// Run one task to completion; returns the result artifact path.
    ///
    /// Errors at any stage propagate to the dispatcher, which records
    /// them on the task. Progress persisted by earlier checkpoints is
    /// never rolled back.
    pub async fn run(&self, task: &Task) -> Result<PathBuf> {
        info!(
            "Processing task {} ({} {} -> {})",
            task.id, task.kind, task.config.source_language, task.config.target_language
        );

        let glossary = match &task.config.glossary_path {
            Some(path) => {
                let glossary = Glossary::load(path)
                    .with_context(|| format!("Failed to load glossary for task {}", task.id))?;
                debug!("Loaded glossary with {} term(s)", glossary.len());
                Some(glossary)
            }
            None => None,
        };

        std::fs::create_dir_all(&self.results_dir).with_context(|| {
            format!(
                "Failed to create results directory {}",
                self.results_dir.display()
            )
        })?;

        let input = std::fs::read(&task.input_path)
            .with_context(|| format!("Failed to read input file {}", task.input_path.display()))?;

        match task.kind {
            TaskKind::Tabular => self.run_tabular(task, &input, glossary.as_ref()).await,
            TaskKind::Idml => self.run_idml(task, input, glossary.as_ref()).await,
        }
    }

    /// Record progress, write the partial artifact and broadcast
    fn checkpoint(
        &self,
        task_id: &str,
        processed: u64,
        total: u64,
        artifact: &PathBuf,
        artifact_bytes: &[u8],
    ) -> Result<()> {
        std::fs::write(artifact, artifact_bytes)
            .with_context(|| format!("Failed to write artifact {}", artifact.display()))?;
        self.store
            .update(task_id, |t| t.set_progress(processed, total))?;
        self.broadcaster.publish(self.store.snapshot());
        Ok(())
    }

    /// Record the segment total before the first batch runs
    fn record_total(&self, task_id: &str, total: u64) -> Result<()> {
        self.store.update(task_id, |t| t.set_progress(0, total))?;
        self.broadcaster.publish(self.store.snapshot());
        Ok(())
    }

    async fn run_tabular(
        &self,
        task: &Task,
        input: &[u8],
        glossary: Option<&Glossary>,
    ) -> Result<PathBuf> {
        let mut document = TabularDocument::parse(input)?;
        let mut segments = document.extract(task.config.overwrite);
        info!(
            "Task {}: {} of {} row(s) selected for translation",
            task.id,
            segments.len(),
            document.row_count()
        );
        self.record_total(&task.id, segments.len() as u64)?;

        let artifact = self.results_dir.join(format!("{}.csv", task.id));

        // Checkpoint artifact is the document itself with translations
        // merged so far, valid CSV at every point
        let mut checkpoint_doc = document.clone();
        self.translator
            .translate_segments(
                &mut segments,
                &task.config.source_language,
                &task.config.target_language,
                glossary,
                |processed, total, done| {
                    checkpoint_doc.apply(done)?;
                    let bytes = checkpoint_doc.to_bytes()?;
                    self.checkpoint(&task.id, processed, total, &artifact, &bytes)
                },
            )
            .await?;

        document.apply(&segments)?;
        let bytes = document.to_bytes()?;
        std::fs::write(&artifact, &bytes)
            .with_context(|| format!("Failed to write artifact {}", artifact.display()))?;
        Ok(artifact)
    }

    async fn run_idml(
        &self,
        task: &Task,
        input: Vec<u8>,
        glossary: Option<&Glossary>,
    ) -> Result<PathBuf> {
        let package = IdmlPackage::parse(input)?;
        let mut segments = package.extract()?;
        info!(
            "Task {}: {} run(s) selected across {} story file(s)",
            task.id,
            segments.len(),
            package.story_names().len()
        );
        self.record_total(&task.id, segments.len() as u64)?;

        // Partial progress is checkpointed as a segment CSV; the final
        // container is only rebuilt once every batch has come back
        let segments_artifact = self.results_dir.join(format!("{}.segments.csv", task.id));
        self.translator
            .translate_segments(
                &mut segments,
                &task.config.source_language,
                &task.config.target_language,
                glossary,
                |processed, total, done| {
                    let bytes = write_segment_csv(done)?;
                    self.checkpoint(&task.id, processed, total, &segments_artifact, &bytes)
                },
            )
            .await?;

        let artifact = self.results_dir.join(format!("{}.idml", task.id));
        let rebuilt = package.rebuild(&segments)?;
        std::fs::write(&artifact, &rebuilt)
            .with_context(|| format!("Failed to write artifact {}", artifact.display()))?;
        Ok(artifact)
    }
}
