//! Archive payload loading.
//!
//! Each archive is a zip file whose entries are delimited tables with a
//! header row. Every field is read as a raw string. A failure anywhere in
//! an archive rejects that archive only; the rest of the load continues.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use herdbook_shared::{AnimalRecord, HerdbookError, NativeLayout, Result, SchemaConfig};

use crate::normalize::{parse_birth_date, parse_date_part};

/// Rows between two deadline checks.
const DEADLINE_CHECK_INTERVAL: usize = 256;

/// Options controlling how payloads are parsed.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Maximum time spent on a single archive before it is rejected.
    pub parse_timeout: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            parse_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of reading one archive.
#[derive(Debug, Clone)]
pub enum ArchiveOutcome {
    Loaded { path: PathBuf, rows: usize },
    Skipped { path: PathBuf, reason: String },
}

impl ArchiveOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Loaded { path, .. } | Self::Skipped { path, .. } => path,
        }
    }
}

/// Records from every readable archive plus a per-archive outcome list.
#[derive(Debug, Default)]
pub struct LoadedRecords {
    pub records: Vec<AnimalRecord>,
    pub outcomes: Vec<ArchiveOutcome>,
}

impl LoadedRecords {
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ArchiveOutcome::Skipped { .. }))
            .count()
    }
}

/// Observer notified as archives are processed.
pub trait LoadObserver {
    /// Called before an archive is opened.
    fn archive_started(&self, path: &Path, current: usize, total: usize);
    /// Called once the archive was loaded or rejected.
    fn archive_finished(&self, outcome: &ArchiveOutcome);
}

/// Observer that ignores every notification.
pub struct NoopObserver;

impl LoadObserver for NoopObserver {
    fn archive_started(&self, _path: &Path, _current: usize, _total: usize) {}
    fn archive_finished(&self, _outcome: &ArchiveOutcome) {}
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load every archive in `paths`, concatenating rows in archive order.
///
/// Rejected archives are logged and reported in
/// [`LoadedRecords::outcomes`]; they never abort the load.
#[instrument(skip_all, fields(archives = paths.len()))]
pub fn load_archives(
    paths: &[PathBuf],
    schema: &SchemaConfig,
    options: &LoadOptions,
    observer: &dyn LoadObserver,
) -> LoadedRecords {
    let mut loaded = LoadedRecords::default();
    let total = paths.len();

    for (i, path) in paths.iter().enumerate() {
        observer.archive_started(path, i + 1, total);

        let outcome = match read_archive(path, schema, options) {
            Ok(records) => {
                let rows = records.len();
                loaded.records.extend(records);
                debug!(path = %path.display(), rows, "archive loaded");
                ArchiveOutcome::Loaded {
                    path: path.clone(),
                    rows,
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "archive rejected, skipping");
                ArchiveOutcome::Skipped {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            }
        };

        observer.archive_finished(&outcome);
        loaded.outcomes.push(outcome);
    }

    info!(
        rows = loaded.records.len(),
        skipped = loaded.skipped(),
        "archive load complete"
    );

    loaded
}

/// Read every payload entry of one archive.
///
/// Either all entries parse or the archive is rejected as a whole.
pub fn read_archive(
    path: &Path,
    schema: &SchemaConfig,
    options: &LoadOptions,
) -> Result<Vec<AnimalRecord>> {
    let started = Instant::now();
    let file = File::open(path).map_err(|e| HerdbookError::archive(path, e.to_string()))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| HerdbookError::archive(path, format!("not a readable zip archive: {e}")))?;

    let mut records = Vec::new();
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| HerdbookError::archive(path, format!("entry {index}: {e}")))?;
        let name = entry.name().to_string();
        if entry.is_dir() || name.starts_with("__MACOSX/") {
            continue;
        }
        let parsed = parse_table(entry, schema, options, started)
            .map_err(|e| HerdbookError::archive(path, format!("{name}: {e}")))?;
        debug!(entry = %name, rows = parsed.len(), "payload parsed");
        records.extend(parsed);
    }

    Ok(records)
}

/// Parse one delimited table into records.
///
/// `started` is when work on the enclosing archive began; the table is
/// abandoned once the archive's time budget is spent.
pub fn parse_table<R: Read>(
    reader: R,
    schema: &SchemaConfig,
    options: &LoadOptions,
    started: Instant,
) -> Result<Vec<AnimalRecord>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| HerdbookError::parse(format!("unreadable header: {e}")))?
        .clone();
    let columns = ColumnIndex::resolve(&headers, schema)?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        if i % DEADLINE_CHECK_INTERVAL == 0 && started.elapsed() >= options.parse_timeout {
            return Err(HerdbookError::parse(format!(
                "parse exceeded {}s budget after {i} rows",
                options.parse_timeout.as_secs()
            )));
        }
        let row = row.map_err(|e| HerdbookError::parse(format!("row {}: {e}", i + 1)))?;
        records.push(columns.record(&row));
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Header positions of the schema columns within one payload.
struct ColumnIndex {
    animal_id: usize,
    species_code: usize,
    breed_code: usize,
    sire_breed_code: usize,
    dam_breed_code: usize,
    birth_date: usize,
    event_year: usize,
    event_month: usize,
    event_day: usize,
    province_code: usize,
    municipality_code: Option<usize>,
    extra: Vec<(usize, String)>,
    layout: NativeLayout,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, schema: &SchemaConfig) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|h| h == name);
        let required = |name: &str| {
            position(name)
                .ok_or_else(|| HerdbookError::parse(format!("missing required column '{name}'")))
        };

        let extra: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty() && !schema.is_known(h))
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        let animal_id = required(schema.animal_id.as_str())?;
        let birth_date = required(schema.birth_date.as_str())?;
        let municipality_code = position(schema.municipality_code.as_str());

        // Slots over the columns that keep their own name in the output.
        let mut layout = NativeLayout::default();
        let mut slot = 0;
        for i in 0..headers.len() {
            if i == animal_id {
                layout.animal_id = slot;
            } else if i == birth_date {
                layout.birth_date = slot;
            } else if municipality_code == Some(i) {
                layout.municipality_code = slot;
            } else if !extra.iter().any(|(p, _)| *p == i) {
                continue;
            }
            slot += 1;
        }
        if municipality_code.is_none() {
            layout.municipality_code = slot;
        }

        Ok(Self {
            animal_id,
            species_code: required(schema.species_code.as_str())?,
            breed_code: required(schema.breed_code.as_str())?,
            sire_breed_code: required(schema.sire_breed_code.as_str())?,
            dam_breed_code: required(schema.dam_breed_code.as_str())?,
            birth_date,
            event_year: required(schema.event_year.as_str())?,
            event_month: required(schema.event_month.as_str())?,
            event_day: required(schema.event_day.as_str())?,
            province_code: required(schema.province_code.as_str())?,
            municipality_code,
            extra,
            layout,
        })
    }

    fn record(&self, row: &StringRecord) -> AnimalRecord {
        let field = |i: usize| row.get(i).unwrap_or_default().to_string();

        AnimalRecord {
            animal_id: field(self.animal_id),
            species_code: field(self.species_code),
            breed_code: field(self.breed_code),
            sire_breed_code: field(self.sire_breed_code),
            dam_breed_code: field(self.dam_breed_code),
            birth_date: parse_birth_date(&field(self.birth_date)),
            event_year: parse_date_part(&field(self.event_year)),
            event_month: parse_date_part(&field(self.event_month)),
            event_day: parse_date_part(&field(self.event_day)),
            analysis_date: None,
            province_code: field(self.province_code),
            municipality_code: self
                .municipality_code
                .map(field)
                .filter(|v| !v.is_empty()),
            extra: self
                .extra
                .iter()
                .map(|(i, name)| (name.clone(), field(*i)))
                .collect(),
            layout: self.layout,
        }
    }
}
