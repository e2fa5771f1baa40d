//! Read-through dataset cache keyed by an archive-directory fingerprint.
//!
//! The fingerprint hashes the name, size, and modification time of every
//! archive. Any change to the directory produces a new fingerprint and the
//! next request rebuilds. Cached and uncached builds return the same rows.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};
use tracing::debug;

use herdbook_ingest::locate_archives;
use herdbook_reference::SpeciesFilter;
use herdbook_shared::{HerdbookError, RegistryDataset, Result};

use crate::pipeline::{ProgressReporter, RegistryContext, build_dataset};

/// SHA-256 over the archive listing of `dir`.
pub fn fingerprint(dir: &Path, extension: &str) -> Result<String> {
    let mut hasher = Sha256::new();

    for path in locate_archives(dir, extension)? {
        let meta = std::fs::metadata(&path).map_err(|e| HerdbookError::io(&path, e))?;
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(meta.len().to_le_bytes());
        hasher.update(modified.to_le_bytes());
    }

    Ok(format!("{:x}", hasher.finalize()))
}

struct CachedDataset {
    fingerprint: String,
    dataset: RegistryDataset,
}

/// One cached dataset per species-filter mode.
#[derive(Default)]
pub struct DatasetCache {
    entries: HashMap<SpeciesFilter, CachedDataset>,
    builds: usize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dataset for `filter`, rebuilding it first when the
    /// archive directory changed since it was built.
    pub fn get_or_build(
        &mut self,
        ctx: &RegistryContext,
        filter: SpeciesFilter,
        progress: &dyn ProgressReporter,
    ) -> Result<&RegistryDataset> {
        let current = fingerprint(&ctx.archive_dir, &ctx.archive_extension)?;

        match self.entries.entry(filter) {
            Entry::Occupied(entry) if entry.get().fingerprint == current => {
                debug!(?filter, "dataset cache hit");
                Ok(&entry.into_mut().dataset)
            }
            entry => {
                debug!(?filter, "dataset cache miss, rebuilding");
                let (dataset, _) = build_dataset(ctx, filter, progress)?;
                self.builds += 1;
                let fresh = CachedDataset {
                    fingerprint: current,
                    dataset,
                };
                let slot = match entry {
                    Entry::Occupied(mut occupied) => {
                        occupied.insert(fresh);
                        occupied.into_mut()
                    }
                    Entry::Vacant(vacant) => vacant.insert(fresh),
                };
                Ok(&slot.dataset)
            }
        }
    }

    /// Drop every cached dataset.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    /// Number of full builds performed so far.
    pub fn builds(&self) -> usize {
        self.builds
    }
}
