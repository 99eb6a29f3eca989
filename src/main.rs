//! `docrouter` batch CLI: classify every document under a directory and file
//! it into the archive.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;

use docrouter_lib::config::{self, AppConfig, ConfigError};
use docrouter_lib::db::{DatabaseError, RecordStore};
use docrouter_lib::pipeline::analysis::{create_analyzer_or_regex, AnalysisError, MetadataAnalyzer};
use docrouter_lib::pipeline::batch::{BatchError, BatchProcessor, BatchSummary};
use docrouter_lib::pipeline::extraction::PlainTextExtractor;

#[derive(Parser, Debug)]
#[command(name = "docrouter")]
#[command(about = "Classify documents and file them into a person/category archive")]
#[command(version)]
struct Args {
    /// Directory to scan for documents
    input_dir: PathBuf,

    /// Only plan: nothing is moved or created, records are stored for review
    #[arg(long)]
    dry_run: bool,

    /// Archive root to file documents into
    #[arg(short, long, visible_alias = "output", env = "DOCROUTER_ARCHIVE")]
    dest: Option<PathBuf>,

    /// SQLite record store
    #[arg(long, env = "DOCROUTER_DB")]
    db: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "DOCROUTER_CONFIG")]
    config: Option<PathBuf>,

    /// Metadata analyzer (openrouter, ollama, regex)
    #[arg(long)]
    analyzer: Option<String>,

    /// Drop and recreate the record table before the run
    #[arg(long)]
    reset_db: bool,

    /// Files processed in parallel
    #[arg(long)]
    concurrency: Option<usize>,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot open record store: {0}")]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("Cannot start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

fn main() -> ExitCode {
    docrouter_lib::init_tracing();
    let args = Args::parse();

    tracing::info!("DocRouter v{}", config::APP_VERSION);

    match run(args) {
        Ok(summary) => {
            println!(
                "Processed {} file(s): {} succeeded, {} failed, {} pending",
                summary.total, summary.succeeded, summary.failed, summary.pending
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            eprintln!("docrouter: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<BatchSummary, CliError> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(dest) = args.dest {
        config.archive_root = dest;
    }
    if let Some(db) = args.db {
        config.database_path = db;
    }
    if let Some(analyzer) = args.analyzer {
        config.analyzer = analyzer;
    }
    if let Some(concurrency) = args.concurrency {
        config.max_concurrency = concurrency;
    }
    config.reset_db |= args.reset_db;

    let store = Arc::new(RecordStore::open(&config.database_path, config.reset_db)?);
    // Blocking HTTP clients are built outside the runtime
    let analyzer: Arc<dyn MetadataAnalyzer> =
        Arc::from(create_analyzer_or_regex(&config.analyzer, &config)?);
    tracing::info!(
        analyzer = analyzer.name(),
        archive = %config.archive_root.display(),
        database = %config.database_path.display(),
        "Configuration loaded"
    );

    let processor = BatchProcessor::new(config, store, Arc::new(PlainTextExtractor), analyzer);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let summary = runtime.block_on(processor.run(&args.input_dir, args.dry_run))?;
    Ok(summary)
}
