// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};

use doctran::app_config::{Config, LogLevel};
use doctran::language_utils::get_language_name;
use doctran::providers::ollama::Ollama;
use doctran::providers::TranslationProvider;
use doctran::segment::tabular::{read_segment_csv, write_segment_csv};
use doctran::segment::{IdmlPackage, TabularDocument};
use doctran::translation::{BatchTranslator, Glossary};
use doctran::{
    Dispatcher, Pipeline, ProgressBroadcaster, Submission, TaskKind, TaskQueue, TaskStore,
};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// CLI wrapper for TaskKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTaskKind {
    Tabular,
    Idml,
}

impl From<CliTaskKind> for TaskKind {
    fn from(kind: CliTaskKind) -> Self {
        match kind {
            CliTaskKind::Tabular => TaskKind::Tabular,
            CliTaskKind::Idml => TaskKind::Idml,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the queue worker over the persisted task store
    Serve,

    /// Submit a document to the queue and print its task id
    Submit(SubmitArgs),

    /// List all queued tasks
    List,

    /// Delete a task (rejected while it is running)
    Delete {
        /// Task id to delete
        id: String,
    },

    /// Translate a CSV file in one shot, without the queue
    Translate(TranslateArgs),

    /// Extract translatable runs from an IDML file into a segment CSV
    Extract {
        /// Input IDML file
        input: PathBuf,

        /// Output CSV path (defaults to the input with a .csv extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rebuild an IDML file from a translated segment CSV
    Rebuild {
        /// Original IDML file
        input: PathBuf,

        /// Translated segment CSV
        segments: PathBuf,

        /// Output IDML path
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct SubmitArgs {
    /// Document to translate (.csv or .idml)
    input: PathBuf,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: String,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: String,

    /// Document kind; inferred from the file extension when omitted
    #[arg(short, long, value_enum)]
    kind: Option<CliTaskKind>,

    /// Re-translate rows that already have a translation
    #[arg(short, long)]
    overwrite: bool,

    /// Glossary CSV with source,target columns
    #[arg(short, long)]
    glossary: Option<PathBuf>,

    /// Submitting user recorded on the task
    #[arg(long, default_value = "cli", env = "USER")]
    owner: String,
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input CSV file with a 'source' column
    input: PathBuf,

    /// Output CSV path (defaults to overwriting the input)
    #[arg(short = 'O', long)]
    output: Option<PathBuf>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: String,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: String,

    /// Re-translate rows that already have a translation
    #[arg(short, long)]
    overwrite: bool,

    /// Glossary CSV with source,target columns
    #[arg(short, long)]
    glossary: Option<PathBuf>,

    /// Model name, overriding the configured one
    #[arg(short, long)]
    model: Option<String>,
}

/// doctran - persistent document translation queue
///
/// Translates CSV and IDML documents with a local LLM, either directly
/// or through a durable task queue processed by a single worker.
#[derive(Parser, Debug)]
#[command(name = "doctran")]
#[command(version = "1.0.0")]
#[command(about = "LLM-powered document translation queue")]
#[command(long_about = "doctran translates tabular (CSV) and structured (IDML) documents using a
local Ollama server, either in one shot or through a persistent task queue.

EXAMPLES:
    doctran serve                                   # Run the queue worker
    doctran submit -s en -t fr report.csv           # Queue a CSV translation
    doctran submit -s en -t de brochure.idml        # Queue an IDML translation
    doctran list                                    # Show all tasks
    doctran translate -s en -t fr report.csv        # Translate without the queue
    doctran extract brochure.idml -o segments.csv   # IDML runs to CSV
    doctran rebuild brochure.idml segments.csv -o out.idml

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a
    different file with --config. If the config file doesn't exist, defaults
    are used (Ollama on http://localhost:11434, model llama3.2:3b).")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::color_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:5} {}\x1B[0m",
                color,
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default;
    // the level is adjusted after the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    let config = Config::from_file(&cli.config_path)?;

    let level = match &cli.log_level {
        Some(cmd_level) => cmd_level.clone().into(),
        None => match config.log_level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        },
    };
    log::set_max_level(level);

    match cli.command {
        Commands::Serve => run_serve(config).await,
        Commands::Submit(args) => run_submit(config, args),
        Commands::List => run_list(config),
        Commands::Delete { id } => run_delete(config, &id),
        Commands::Translate(args) => run_translate(config, args).await,
        Commands::Extract { input, output } => run_extract(&input, output),
        Commands::Rebuild {
            input,
            segments,
            output,
        } => run_rebuild(&input, &segments, &output),
    }
}

fn open_store(config: &Config) -> Result<Arc<TaskStore>> {
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.data_dir.display()
        )
    })?;
    Ok(Arc::new(TaskStore::open(config.tasks_file())?))
}

fn make_provider(config: &Config) -> Ollama {
    Ollama::new(
        &config.provider.endpoint,
        &config.provider.model,
        config.provider.timeout_secs,
    )
}

async fn run_serve(config: Config) -> Result<()> {
    config.validate()?;
    let store = open_store(&config)?;
    let broadcaster = ProgressBroadcaster::new();
    let notify = Arc::new(Notify::new());

    let provider = Arc::new(make_provider(&config));
    if let Err(e) = provider.test_connection().await {
        warn!(
            "Translation service at {} is not reachable yet: {}",
            config.provider.endpoint, e
        );
    }

    let pipeline = Pipeline::new(
        store.clone(),
        broadcaster.clone(),
        provider,
        config.batch_size,
        config.results_dir(),
    );
    let dispatcher = Dispatcher::new(
        store,
        broadcaster,
        pipeline,
        notify,
        Duration::from_secs(config.poll_interval_secs),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(async move { dispatcher.run(shutdown_rx).await });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested, finishing current task");
    let _ = shutdown_tx.send(true);
    worker.await.context("Worker task panicked")?;
    Ok(())
}

fn make_queue(config: &Config) -> Result<TaskQueue> {
    let store = open_store(config)?;
    Ok(TaskQueue::new(
        store,
        ProgressBroadcaster::new(),
        Arc::new(Notify::new()),
        config.uploads_dir(),
    ))
}

fn run_submit(config: Config, args: SubmitArgs) -> Result<()> {
    let kind = match args.kind {
        Some(kind) => kind.into(),
        None => match args.input.extension().and_then(|e| e.to_str()) {
            Some("csv") => TaskKind::Tabular,
            Some("idml") => TaskKind::Idml,
            other => {
                return Err(doctran::QueueError::UnsupportedKind(
                    other.unwrap_or("<none>").to_string(),
                )
                .into())
            }
        },
    };

    let file_bytes = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let glossary_bytes = match &args.glossary {
        Some(path) => Some(
            std::fs::read(path)
                .with_context(|| format!("Failed to read glossary {}", path.display()))?,
        ),
        None => None,
    };

    let queue = make_queue(&config)?;
    let id = queue.submit(Submission {
        owner: args.owner,
        kind,
        file_bytes,
        source_language: args.source_language,
        target_language: args.target_language,
        overwrite: args.overwrite,
        glossary_bytes,
    })?;
    // A running `serve` process picks the task up on its next poll
    println!("{}", id);
    Ok(())
}

fn run_list(config: Config) -> Result<()> {
    let queue = make_queue(&config)?;
    let tasks = queue.list();
    if tasks.is_empty() {
        println!("No tasks");
        return Ok(());
    }
    println!(
        "{:<36}  {:<7}  {:<9}  {:>9}  {}",
        "ID", "KIND", "STATUS", "PROGRESS", "DETAIL"
    );
    for task in tasks {
        let detail = match (&task.result_ref, &task.error_message) {
            (Some(result_ref), _) => result_ref.display().to_string(),
            (None, Some(message)) => message.clone(),
            _ => String::new(),
        };
        println!(
            "{:<36}  {:<7}  {:<9}  {:>4}/{:<4}  {}",
            task.id, task.kind, task.status, task.progress.processed, task.progress.total, detail
        );
    }
    Ok(())
}

fn run_delete(config: Config, id: &str) -> Result<()> {
    let queue = make_queue(&config)?;
    let removed = queue.delete(id)?;
    println!("Deleted task {} ({})", removed.id, removed.status);
    Ok(())
}

/// Human-readable language label: "French (fr)" when the code is known,
/// the raw code otherwise
fn display_language(code: &str) -> String {
    match get_language_name(code) {
        Ok(name) => format!("{} ({})", name, code),
        Err(_) => code.to_string(),
    }
}

async fn run_translate(config: Config, args: TranslateArgs) -> Result<()> {
    let mut config = config;
    if let Some(model) = &args.model {
        config.provider.model = model.clone();
    }
    config.validate()?;

    let input = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let mut document = TabularDocument::parse(&input)?;
    let mut segments = document.extract(args.overwrite);
    if segments.is_empty() {
        info!("Nothing to translate in {}", args.input.display());
        return Ok(());
    }

    let glossary = match &args.glossary {
        Some(path) => Some(Glossary::load(path)?),
        None => None,
    };

    info!(
        "Translating {} segment(s) {} -> {} with {}",
        segments.len(),
        display_language(&args.source_language),
        display_language(&args.target_language),
        config.provider.model
    );

    let progress_bar = ProgressBar::new(segments.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let translator = BatchTranslator::new(Arc::new(make_provider(&config)), config.batch_size);
    translator
        .translate_segments(
            &mut segments,
            &args.source_language,
            &args.target_language,
            glossary.as_ref(),
            |processed, _, _| {
                progress_bar.set_position(processed);
                Ok(())
            },
        )
        .await?;
    progress_bar.finish();

    document.apply(&segments)?;
    let output = args.output.unwrap_or(args.input);
    std::fs::write(&output, document.to_bytes()?)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Success: {}", output.display());
    Ok(())
}

fn run_extract(input: &PathBuf, output: Option<PathBuf>) -> Result<()> {
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let package = IdmlPackage::parse(bytes)?;
    let segments = package.extract()?;
    info!(
        "Extracted {} run(s) from {} story file(s)",
        segments.len(),
        package.story_names().len()
    );

    let output = output.unwrap_or_else(|| input.with_extension("csv"));
    std::fs::write(&output, write_segment_csv(&segments)?)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Success: {}", output.display());
    Ok(())
}

fn run_rebuild(input: &PathBuf, segments_path: &PathBuf, output: &PathBuf) -> Result<()> {
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let package = IdmlPackage::parse(bytes)?;

    let segment_bytes = std::fs::read(segments_path)
        .with_context(|| format!("Failed to read {}", segments_path.display()))?;
    let segments = read_segment_csv(&segment_bytes)?;

    let rebuilt = package.rebuild(&segments)?;
    std::fs::write(output, rebuilt)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Success: {}", output.display());
    Ok(())
}
