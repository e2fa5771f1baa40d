//! Reference table loading.
//!
//! Four small CSV tables are joined into the registry: breeds, provinces,
//! species, and column-name translations. They are read once per process
//! and never mutated afterwards.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use herdbook_ingest::strip_leading_zeros;
use herdbook_shared::{HerdbookError, ReferenceConfig, Result};

const TRANSLATION_COLUMNS: [&str; 2] = ["italian", "english"];
const BREED_COLUMNS: [&str; 3] = ["BreedAIACode", "BreedCodeAIASpecies", "BreedName"];
const PROVINCE_COLUMNS: [&str; 2] = ["Abbreviation", "ProvinceName"];
const SPECIES_COLUMNS: [&str; 3] = ["SpeciesCode", "SpeciesName", "SpeciesCategory"];

// ---------------------------------------------------------------------------
// BreedMapping
// ---------------------------------------------------------------------------

/// Breed names keyed two ways.
///
/// The animal's own breed resolves by (breed code, species code). Sire and
/// dam breeds resolve by breed code alone because parentage may cross
/// species in the source data.
#[derive(Debug, Clone, Default)]
pub struct BreedMapping {
    by_species: HashMap<(String, String), String>,
    by_code: HashMap<String, String>,
}

impl BreedMapping {
    /// Build from `(breed code, species code, breed name)` rows.
    ///
    /// A repeated (code, species) pair is an error. For the code-only
    /// variant the first name seen wins.
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String, String)>,
    {
        let mut mapping = Self::default();
        for (code, species, name) in rows {
            let code = strip_leading_zeros(&code);
            if code.is_empty() {
                continue;
            }
            let key = (code.clone(), species);
            if mapping.by_species.contains_key(&key) {
                return Err(HerdbookError::config(format!(
                    "duplicate breed key (code '{}', species '{}')",
                    key.0, key.1
                )));
            }
            mapping.by_species.insert(key, name.clone());

            match mapping.by_code.entry(code) {
                Entry::Occupied(existing) if *existing.get() != name => {
                    warn!(
                        code = %existing.key(),
                        kept = %existing.get(),
                        ignored = %name,
                        "conflicting parentage breed name"
                    );
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(name);
                }
            }
        }
        Ok(mapping)
    }

    /// Breed name of an animal by its (already stripped) code and species.
    pub fn breed(&self, code: &str, species_code: &str) -> Option<&str> {
        if code.is_empty() {
            return None;
        }
        self.by_species
            .get(&(code.to_string(), species_code.to_string()))
            .map(String::as_str)
    }

    /// Breed name for a sire or dam code, any species.
    pub fn parent_breed(&self, code: &str) -> Option<&str> {
        if code.is_empty() {
            return None;
        }
        self.by_code.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_species.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ProvinceMapping
// ---------------------------------------------------------------------------

/// Province abbreviation → province name. Abbreviations compare
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ProvinceMapping(HashMap<String, String>);

impl ProvinceMapping {
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = HashMap::new();
        for (abbreviation, name) in rows {
            let key = abbreviation.to_uppercase();
            if map.insert(key.clone(), name).is_some() {
                return Err(HerdbookError::config(format!(
                    "duplicate province abbreviation '{key}'"
                )));
            }
        }
        Ok(Self(map))
    }

    pub fn name(&self, abbreviation: &str) -> Option<&str> {
        self.0
            .get(&abbreviation.trim().to_uppercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SpeciesMapping
// ---------------------------------------------------------------------------

/// A resolved species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesInfo {
    pub name: String,
    pub category: String,
}

/// Species code → species name and category.
#[derive(Debug, Clone, Default)]
pub struct SpeciesMapping(HashMap<String, SpeciesInfo>);

impl SpeciesMapping {
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String, String)>,
    {
        let mut map = HashMap::new();
        for (code, name, category) in rows {
            if map
                .insert(code.clone(), SpeciesInfo { name, category })
                .is_some()
            {
                return Err(HerdbookError::config(format!(
                    "duplicate species code '{code}'"
                )));
            }
        }
        Ok(Self(map))
    }

    pub fn get(&self, code: &str) -> Option<&SpeciesInfo> {
        self.0.get(code.trim())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TranslationMapping
// ---------------------------------------------------------------------------

/// Native column name → public column name.
#[derive(Debug, Clone, Default)]
pub struct TranslationMapping(HashMap<String, String>);

impl TranslationMapping {
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = HashMap::new();
        for (native, english) in rows {
            if map.insert(native.clone(), english).is_some() {
                return Err(HerdbookError::config(format!(
                    "duplicate translation for column '{native}'"
                )));
            }
        }
        Ok(Self(map))
    }

    /// Public name for the native `column`, or `None` when it keeps its
    /// name. Lookups never chain: one call is one rename.
    pub fn rename(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ReferenceTables
// ---------------------------------------------------------------------------

/// All four reference tables.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub translations: TranslationMapping,
    pub breeds: BreedMapping,
    pub provinces: ProvinceMapping,
    pub species: SpeciesMapping,
}

impl ReferenceTables {
    /// Load every table named in `config`. Any missing file, missing header,
    /// or duplicate key is a configuration error.
    #[instrument(skip_all)]
    pub fn load(config: &ReferenceConfig) -> Result<Self> {
        let translations = TranslationMapping::from_rows(
            read_table(Path::new(&config.translations), &TRANSLATION_COLUMNS)?
                .into_iter()
                .map(|r| (r[0].clone(), r[1].clone())),
        )?;
        let breeds = BreedMapping::from_rows(
            read_table(Path::new(&config.breeds), &BREED_COLUMNS)?
                .into_iter()
                .map(|r| (r[0].clone(), r[1].clone(), r[2].clone())),
        )?;
        let provinces = ProvinceMapping::from_rows(
            read_table(Path::new(&config.provinces), &PROVINCE_COLUMNS)?
                .into_iter()
                .map(|r| (r[0].clone(), r[1].clone())),
        )?;
        let species = SpeciesMapping::from_rows(
            read_table(Path::new(&config.species), &SPECIES_COLUMNS)?
                .into_iter()
                .map(|r| (r[0].clone(), r[1].clone(), r[2].clone())),
        )?;

        info!(
            translations = translations.len(),
            breeds = breeds.len(),
            provinces = provinces.len(),
            species = species.len(),
            "reference tables loaded"
        );

        Ok(Self {
            translations,
            breeds,
            provinces,
            species,
        })
    }
}

/// Read a CSV table, projecting each row onto `columns` in that order.
///
/// Extra columns are ignored; blank lines are skipped.
pub fn read_table(path: &Path, columns: &[&str]) -> Result<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| {
            HerdbookError::config(format!(
                "reference table '{}' unreadable: {e}",
                path.display()
            ))
        })?;

    let headers = reader
        .headers()
        .map_err(|e| {
            HerdbookError::config(format!(
                "reference table '{}' has no header: {e}",
                path.display()
            ))
        })?
        .clone();

    let positions = columns
        .iter()
        .map(|name| {
            headers.iter().position(|h| h == *name).ok_or_else(|| {
                HerdbookError::config(format!(
                    "reference table '{}' lacks column '{name}'",
                    path.display()
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            HerdbookError::config(format!(
                "reference table '{}' row {}: {e}",
                path.display(),
                i + 1
            ))
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(
            positions
                .iter()
                .map(|&p| record.get(p).unwrap_or_default().to_string())
                .collect(),
        );
    }

    debug!(path = %path.display(), rows = rows.len(), "reference table read");
    Ok(rows)
}
