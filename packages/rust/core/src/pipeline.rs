//! End-to-end dataset build: archives → records → enriched, translated rows.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use herdbook_ingest::{ArchiveOutcome, LoadObserver, LoadOptions};
use herdbook_reference::{ReferenceTables, SpeciesFilter};
use herdbook_shared::{AppConfig, FieldLabels, HerdbookError, RegistryDataset, Result, SchemaConfig};

/// Everything a dataset build needs, loaded once per process and passed
/// explicitly to every query.
#[derive(Debug, Clone)]
pub struct RegistryContext {
    /// Directory holding the registry archives.
    pub archive_dir: PathBuf,
    /// Extension identifying an archive.
    pub archive_extension: String,
    /// Native column names of the extract.
    pub schema: SchemaConfig,
    /// The four reference tables.
    pub tables: ReferenceTables,
    /// Payload parsing options.
    pub load: LoadOptions,
}

impl RegistryContext {
    /// Build a context from the application config, reading every
    /// reference table.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let delimiter = config.registry.delimiter_byte()?;

        Ok(Self {
            archive_dir: PathBuf::from(&config.registry.archive_dir),
            archive_extension: config.registry.archive_extension.clone(),
            schema: config.schema.clone(),
            tables: ReferenceTables::load(&config.reference)?,
            load: LoadOptions {
                delimiter,
                parse_timeout: Duration::from_secs(config.registry.parse_timeout_secs),
            },
        })
    }
}

/// Summary of one dataset build.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Per-archive outcome, in discovery order.
    pub archives: Vec<ArchiveOutcome>,
    /// Records read before resolution.
    pub records_loaded: usize,
    /// Rows in the final dataset.
    pub rows: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl LoadReport {
    /// Archives that were rejected, with the reason.
    pub fn skipped(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.archives.iter().filter_map(|o| match o {
            ArchiveOutcome::Skipped { path, reason } => Some((path.as_path(), reason.as_str())),
            ArchiveOutcome::Loaded { .. } => None,
        })
    }
}

/// Progress callback for reporting build status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each archive has been read or rejected.
    fn archive_done(&self, path: &str, current: usize, total: usize);
    /// Called when the build completes.
    fn done(&self, report: &LoadReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn archive_done(&self, _path: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &LoadReport) {}
}

/// Build the registry dataset from scratch.
///
/// 1. Locate archives
/// 2. Load and normalize records (broken archives are skipped)
/// 3. Resolve breed, sire, dam, province, and species references
/// 4. Drop unresolved-species rows when `filter` asks for it
/// 5. Translate column names
#[instrument(skip_all, fields(dir = %ctx.archive_dir.display(), ?filter))]
pub fn build_dataset(
    ctx: &RegistryContext,
    filter: SpeciesFilter,
    progress: &dyn ProgressReporter,
) -> Result<(RegistryDataset, LoadReport)> {
    let start = Instant::now();

    // --- Phase 1: Load ---
    progress.phase("Loading registry archives");
    let observer = PipelineLoadObserver {
        inner: progress,
        position: Cell::new((0, 0)),
    };
    let loaded = herdbook_ingest::load_registry(
        &ctx.archive_dir,
        &ctx.archive_extension,
        &ctx.schema,
        &ctx.load,
        &observer,
    )?;
    let records_loaded = loaded.records.len();

    // --- Phase 2: Resolve ---
    progress.phase("Resolving reference codes");
    let labels = FieldLabels::native(&ctx.schema);
    let mut dataset = herdbook_reference::resolve(loaded.records, &ctx.tables, labels, filter);

    // --- Phase 3: Translate ---
    progress.phase("Translating column names");
    herdbook_reference::translate(&mut dataset, &ctx.tables.translations);

    let report = LoadReport {
        archives: loaded.outcomes,
        records_loaded,
        rows: dataset.len(),
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        archives = report.archives.len(),
        skipped = report.skipped().count(),
        records = report.records_loaded,
        rows = report.rows,
        elapsed_ms = report.elapsed.as_millis(),
        "dataset build complete"
    );

    Ok((dataset, report))
}

// ---------------------------------------------------------------------------
// Load progress adapter
// ---------------------------------------------------------------------------

/// Adapts a `ProgressReporter` to the loader's `LoadObserver` interface.
struct PipelineLoadObserver<'a> {
    inner: &'a dyn ProgressReporter,
    position: Cell<(usize, usize)>,
}

impl LoadObserver for PipelineLoadObserver<'_> {
    fn archive_started(&self, path: &Path, current: usize, total: usize) {
        self.position.set((current, total));
        self.inner.phase(&format!("[{current}/{total}] {}", path.display()));
    }

    fn archive_finished(&self, outcome: &ArchiveOutcome) {
        let (current, total) = self.position.get();
        self.inner
            .archive_done(&outcome.path().display().to_string(), current, total);
    }
}
