//! Registry extract ingestion: archive discovery, payload loading, and
//! record normalization.
//!
//! [`load_registry`] chains the three steps and is what the pipeline calls;
//! the individual modules are public for callers that need one step alone.

pub mod loader;
pub mod locator;
pub mod normalize;

use std::path::Path;

use tracing::instrument;

use herdbook_shared::{Result, SchemaConfig};

pub use loader::{
    ArchiveOutcome, LoadObserver, LoadOptions, LoadedRecords, NoopObserver, load_archives,
    read_archive,
};
pub use locator::locate_archives;
pub use normalize::{normalize_records, strip_leading_zeros};

/// Locate, load, and normalize every archive under `dir`.
///
/// Only a missing or unreadable directory fails; broken archives are
/// skipped and listed in the returned outcomes.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_registry(
    dir: &Path,
    extension: &str,
    schema: &SchemaConfig,
    options: &LoadOptions,
    observer: &dyn LoadObserver,
) -> Result<LoadedRecords> {
    let archives = locate_archives(dir, extension)?;
    let mut loaded = load_archives(&archives, schema, options, observer);
    normalize_records(&mut loaded.records);
    Ok(loaded)
}
