//! Application entry point shared by the binary and the CLI tests.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bytesize::ByteSize;

use crate::cli::{Cli, Commands, CompareArgs, Pass};
use crate::compare::{CompareConfig, ConnectionPolicy, InventoryComparator};
use crate::config::Config;
use crate::duplicates::DuplicateFinder;
use crate::error::ExitCode;
use crate::ingest::{IngestConfig, Ingestor};
use crate::logging::init_logging;
use crate::output::{
    bad_paths_path, duplicate_report_path, write_bad_paths, DuplicateReport, JsonCompareOutput,
};
use crate::pipeline::{HashPipeline, PipelineConfig};
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::{load_excludes, WalkerConfig};
use crate::signal::{install_handler, ShutdownHandler};
use crate::store::{InventoryStore, PendingFilter};

/// Settings shared by every command of one invocation.
struct Runtime {
    config: Config,
    shutdown: ShutdownHandler,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl Runtime {
    fn pipeline_config(&self, target: PendingFilter) -> PipelineConfig {
        let mut config = PipelineConfig::default()
            .with_batch_size(self.config.hash_batch_size)
            .with_prefetch_depth(self.config.prefetch_depth)
            .with_target(target)
            .with_path_style(self.config.path_style())
            .with_shutdown_flag(self.shutdown.get_flag());
        if let Some(progress) = &self.progress {
            config = config.with_progress_callback(Arc::clone(progress));
        }
        config
    }

    fn exit_code(&self, interrupted: bool) -> ExitCode {
        if interrupted || self.shutdown.is_shutdown_requested() {
            ExitCode::Interrupted
        } else {
            ExitCode::Success
        }
    }
}

/// Run one invocation of the `inventory` binary.
///
/// # Errors
///
/// Returns an error naming the pass or command and the resource that
/// failed: configuration, excludes file, inventory database or report file.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    log::debug!("Configuration: {:?}", config);
    let shutdown = install_handler().context("Failed to install Ctrl+C handler")?;
    let progress: Option<Arc<dyn ProgressCallback>> = if cli.quiet || cli.no_progress {
        None
    } else {
        Some(Arc::new(Progress::new(false)))
    };
    let runtime = Runtime {
        config,
        shutdown,
        progress,
    };

    match cli.command {
        Some(Commands::Compare(args)) => run_compare(&runtime, &args),
        Some(Commands::PurgeFailed(args)) => run_purge_failed(&args.database),
        Some(Commands::RetryFailed(args)) => run_retry_failed(&runtime, &args.database),
        None => {
            let (Some(database), Some(scan_root), Some(pass)) =
                (cli.database, cli.scan_root, cli.pass)
            else {
                bail!("DATABASE, SCAN_ROOT and PASS are required");
            };
            run_pass(&runtime, pass, &database, &scan_root, cli.excludes.as_deref())
        }
    }
}

fn run_pass(
    runtime: &Runtime,
    pass: Pass,
    database: &Path,
    scan_root: &Path,
    excludes: Option<&Path>,
) -> Result<ExitCode> {
    let n = pass.number();
    let excludes = match excludes {
        Some(path) => load_excludes(path)
            .with_context(|| format!("Pass {n}: cannot load excludes file {}", path.display()))?,
        None => Vec::new(),
    };

    let mut store = InventoryStore::open(database)
        .with_context(|| format!("Pass {n}: cannot open inventory {}", database.display()))?
        .with_max_insert_batch(runtime.config.insert_batch_size);

    match pass {
        Pass::Ingest => {
            if !scan_root.is_dir() {
                bail!("Pass 1: scan root {} is not a directory", scan_root.display());
            }
            let interrupted = ingest(runtime, &mut store, scan_root, excludes)?;
            if interrupted {
                return Ok(ExitCode::Interrupted);
            }
            hash(runtime, &store, PendingFilter::Unhashed, n)
        }
        Pass::Hash => hash(runtime, &store, PendingFilter::Unhashed, n),
        Pass::Report => report(runtime, &store),
    }
}

fn ingest(
    runtime: &Runtime,
    store: &mut InventoryStore,
    scan_root: &Path,
    excludes: Vec<std::path::PathBuf>,
) -> Result<bool> {
    let database = store.path().to_path_buf();
    let mut config = IngestConfig {
        batch_size: runtime.config.insert_batch_size,
        walker: WalkerConfig {
            follow_symlinks: runtime.config.follow_symlinks,
            excludes,
        },
        count_first: runtime.progress.is_some(),
        ..IngestConfig::default()
    }
    .with_shutdown_flag(runtime.shutdown.get_flag());
    if let Some(progress) = &runtime.progress {
        config = config.with_progress_callback(Arc::clone(progress));
    }

    let stats = Ingestor::new(config)
        .ingest(store, scan_root)
        .with_context(|| format!("Pass 1: cannot record files into {}", database.display()))?;

    let bad_paths_file = bad_paths_path(&database);
    write_bad_paths(&bad_paths_file, &stats.bad_paths).with_context(|| {
        format!("Pass 1: cannot write bad paths to {}", bad_paths_file.display())
    })?;
    Ok(stats.interrupted)
}

fn hash(runtime: &Runtime, store: &InventoryStore, target: PendingFilter, n: u8) -> Result<ExitCode> {
    let stats = HashPipeline::new(store, runtime.pipeline_config(target))
        .run()
        .with_context(|| format!("Pass {n}: hashing {} failed", store.path().display()))?;
    if stats.failed_files > 0 {
        log::warn!(
            "{} files could not be hashed and were stored with an empty hash",
            stats.failed_files
        );
    }
    Ok(runtime.exit_code(stats.interrupted))
}

fn report(runtime: &Runtime, store: &InventoryStore) -> Result<ExitCode> {
    let database = store.path();
    let finder = DuplicateFinder::new(store).with_page_size(runtime.config.duplicate_page_size);
    let totals = finder
        .summary()
        .with_context(|| format!("Pass 3: cannot read duplicates from {}", database.display()))?;
    log::info!(
        "{} duplicate groups, {} files, {} reclaimable",
        totals.groups,
        totals.duplicate_files,
        ByteSize::b(totals.reclaimable_bytes)
    );

    let mut report = DuplicateReport::new(finder);
    if let Some(progress) = &runtime.progress {
        report = report.with_progress_callback(Arc::clone(progress));
    }
    let target = duplicate_report_path(database);
    report
        .write_file(&target)
        .with_context(|| format!("Pass 3: cannot write report {}", target.display()))?;
    Ok(ExitCode::Success)
}

fn run_compare(runtime: &Runtime, args: &CompareArgs) -> Result<ExitCode> {
    let policy = if args.persistent {
        ConnectionPolicy::Persistent
    } else {
        ConnectionPolicy::PerLookup
    };
    let mut config = CompareConfig::default()
        .with_example_limit(args.examples.unwrap_or(runtime.config.example_limit))
        .with_page_size(runtime.config.duplicate_page_size)
        .with_policy(policy);
    if let Some(progress) = &runtime.progress {
        config = config.with_progress_callback(Arc::clone(progress));
    }

    let report = InventoryComparator::new(&args.first, &args.second, config)
        .compare()
        .context("Compare failed")?;
    let output = JsonCompareOutput::new(&args.first, &args.second, &report);

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Compare: cannot create {}", path.display()))?;
            output
                .write_to(BufWriter::new(file))
                .with_context(|| format!("Compare: cannot write {}", path.display()))?;
            log::info!("Wrote {} matches to {}", report.len(), path.display());
        }
        None => output
            .write_to(io::stdout().lock())
            .context("Compare: cannot write to stdout")?,
    }
    Ok(ExitCode::Success)
}

fn open_existing_for_write(database: &Path, command: &str) -> Result<InventoryStore> {
    if !database.is_file() {
        bail!("{command}: inventory {} does not exist", database.display());
    }
    InventoryStore::open(database)
        .with_context(|| format!("{command}: cannot open inventory {}", database.display()))
}

fn run_purge_failed(database: &Path) -> Result<ExitCode> {
    let mut store = open_existing_for_write(database, "purge-failed")?;
    let removed = store
        .purge_failed()
        .with_context(|| format!("purge-failed: cannot delete from {}", database.display()))?;
    log::info!("Removed {} records of failed paths", removed);
    Ok(ExitCode::Success)
}

fn run_retry_failed(runtime: &Runtime, database: &Path) -> Result<ExitCode> {
    let store = open_existing_for_write(database, "retry-failed")?;
    let stats = HashPipeline::new(&store, runtime.pipeline_config(PendingFilter::EmptyHash))
        .run()
        .with_context(|| format!("retry-failed: hashing {} failed", database.display()))?;
    log::info!(
        "Recovered {} of {} failed records",
        stats.hashed_files,
        stats.processed()
    );
    Ok(runtime.exit_code(stats.interrupted))
}
