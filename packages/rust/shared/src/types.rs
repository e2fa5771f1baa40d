//! Core domain types for the livestock registry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::SchemaConfig;

/// Display format for every date surfaced to callers.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// AnimalRecord
// ---------------------------------------------------------------------------

/// One raw registry row as read from an archive payload.
///
/// A physical animal usually appears in several rows (one per registered
/// event), so `animal_id` is not a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalRecord {
    pub animal_id: String,
    pub species_code: String,
    pub breed_code: String,
    pub sire_breed_code: String,
    pub dam_breed_code: String,
    pub birth_date: Option<NaiveDate>,
    pub event_year: Option<i32>,
    pub event_month: Option<u32>,
    pub event_day: Option<u32>,
    /// Composed from the event parts during normalization.
    pub analysis_date: Option<NaiveDate>,
    pub province_code: String,
    pub municipality_code: Option<String>,
    /// Native columns outside the fixed schema, in header order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,
    /// Where the surfaced typed columns sat among `extra` in the header.
    #[serde(default)]
    pub layout: NativeLayout,
}

// ---------------------------------------------------------------------------
// NativeLayout
// ---------------------------------------------------------------------------

/// Output slots of the native columns a row keeps under their own name.
///
/// Slots count the header columns that survive enrichment (identifier,
/// birth date, municipality code, and the extra columns). The three typed
/// columns take the slots recorded here; extra columns fill the rest in
/// order. A municipality column absent from the header takes the last slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeLayout {
    pub animal_id: usize,
    pub birth_date: usize,
    pub municipality_code: usize,
}

impl Default for NativeLayout {
    fn default() -> Self {
        Self {
            animal_id: 0,
            birth_date: 1,
            municipality_code: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// RegistryRow
// ---------------------------------------------------------------------------

/// An enriched registry row: reference codes are resolved to names and the
/// raw code and date-part columns are gone.
///
/// Unresolved references stay `None`; the row itself is never dropped by a
/// join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRow {
    pub animal_id: String,
    pub birth_date: Option<NaiveDate>,
    pub analysis_date: Option<NaiveDate>,
    pub breed: Option<String>,
    pub sire_breed: Option<String>,
    pub dam_breed: Option<String>,
    pub province: Option<String>,
    pub species: Option<String>,
    pub species_category: Option<String>,
    pub municipality_code: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,
    #[serde(default)]
    pub layout: NativeLayout,
}

impl RegistryRow {
    /// Flatten the row into `(label, value)` pairs, skipping null and empty
    /// values. The row itself keeps every field.
    ///
    /// Native columns come first in header order, followed by the
    /// enrichment columns.
    pub fn pairs(&self, labels: &FieldLabels) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut push = |label: &str, value: Option<String>| {
            if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
                out.push((label.to_string(), v));
            }
        };

        let typed = [
            (
                self.layout.animal_id,
                labels.animal_id.as_str(),
                Some(self.animal_id.clone()),
            ),
            (
                self.layout.birth_date,
                labels.birth_date.as_str(),
                self.birth_date.map(|d| d.format(DATE_FORMAT).to_string()),
            ),
            (
                self.layout.municipality_code,
                labels.municipality_code.as_str(),
                self.municipality_code.clone(),
            ),
        ];
        let mut extra = self.extra.iter();
        for slot in 0..self.extra.len() + typed.len() {
            match typed.iter().find(|(s, _, _)| *s == slot) {
                Some((_, label, value)) => push(*label, value.clone()),
                None => {
                    if let Some((key, value)) = extra.next() {
                        push(key.as_str(), Some(value.clone()));
                    }
                }
            }
        }

        push(
            labels.analysis_date.as_str(),
            self.analysis_date.map(|d| d.format(DATE_FORMAT).to_string()),
        );
        push(labels.breed.as_str(), self.breed.clone());
        push(labels.sire_breed.as_str(), self.sire_breed.clone());
        push(labels.dam_breed.as_str(), self.dam_breed.clone());
        push(labels.province.as_str(), self.province.clone());
        push(labels.species.as_str(), self.species.clone());
        push(labels.species_category.as_str(), self.species_category.clone());

        out
    }

    /// Whether the species reference resolved to a non-empty name.
    pub fn has_species(&self) -> bool {
        self.species.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// FieldLabels
// ---------------------------------------------------------------------------

/// Column names under which the typed fields of a [`RegistryRow`] are shown.
///
/// Starts out with the native names of the extract plus the names of the
/// enrichment columns, and is rewritten by the schema translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLabels {
    pub animal_id: String,
    pub birth_date: String,
    pub analysis_date: String,
    pub breed: String,
    pub sire_breed: String,
    pub dam_breed: String,
    pub province: String,
    pub species: String,
    pub species_category: String,
    pub municipality_code: String,
}

impl FieldLabels {
    /// Labels before translation.
    pub fn native(schema: &SchemaConfig) -> Self {
        Self {
            animal_id: schema.animal_id.clone(),
            birth_date: schema.birth_date.clone(),
            analysis_date: "Analysis Date".into(),
            breed: "Breed".into(),
            sire_breed: "Sire Breed".into(),
            dam_breed: "Dam Breed".into(),
            province: "Province".into(),
            species: "Species".into(),
            species_category: "Species Category".into(),
            municipality_code: schema.municipality_code.clone(),
        }
    }

    /// Mutable access to every label, for bulk renames.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut String> {
        [
            &mut self.animal_id,
            &mut self.birth_date,
            &mut self.analysis_date,
            &mut self.breed,
            &mut self.sire_breed,
            &mut self.dam_breed,
            &mut self.province,
            &mut self.species,
            &mut self.species_category,
            &mut self.municipality_code,
        ]
        .into_iter()
    }
}

impl Default for FieldLabels {
    fn default() -> Self {
        Self::native(&SchemaConfig::default())
    }
}

// ---------------------------------------------------------------------------
// RegistryDataset
// ---------------------------------------------------------------------------

/// The enriched, queryable record collection built for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDataset {
    pub labels: FieldLabels,
    pub rows: Vec<RegistryRow>,
    /// Set once column names have been translated to the public vocabulary.
    #[serde(default)]
    pub translated: bool,
}

impl RegistryDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> RegistryRow {
        RegistryRow {
            animal_id: "IT123".into(),
            birth_date: NaiveDate::from_ymd_opt(2020, 1, 15),
            analysis_date: None,
            breed: Some("Holstein".into()),
            sire_breed: Some(String::new()),
            dam_breed: None,
            province: Some("Milano".into()),
            species: Some("Cattle".into()),
            species_category: Some("Bovine".into()),
            municipality_code: None,
            extra: vec![("Sesso".into(), "F".into()), ("Note".into(), " ".into())],
            layout: NativeLayout::default(),
        }
    }

    #[test]
    fn pairs_skip_null_and_empty_values() {
        let labels = FieldLabels::default();
        let pairs = sample_row().pairs(&labels);

        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            [
                "idAnimale",
                "DataNascita",
                "Sesso",
                "Breed",
                "Province",
                "Species",
                "Species Category"
            ]
        );
        assert!(pairs.contains(&("DataNascita".into(), "2020-01-15".into())));
    }

    #[test]
    fn pairs_follow_header_order() {
        // Sesso,idAnimale,...,DataNascita,codiceIstat,Colore
        let row = RegistryRow {
            animal_id: "IT123".into(),
            birth_date: NaiveDate::from_ymd_opt(2020, 1, 15),
            municipality_code: Some("015146".into()),
            breed: Some("Holstein".into()),
            extra: vec![("Sesso".into(), "F".into()), ("Colore".into(), "Pezzata".into())],
            layout: NativeLayout {
                animal_id: 1,
                birth_date: 2,
                municipality_code: 3,
            },
            ..Default::default()
        };

        let keys: Vec<String> = row
            .pairs(&FieldLabels::default())
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(
            keys,
            ["Sesso", "idAnimale", "DataNascita", "codiceIstat", "Colore", "Breed"]
        );
    }

    #[test]
    fn species_presence() {
        let mut row = sample_row();
        assert!(row.has_species());
        row.species = Some("  ".into());
        assert!(!row.has_species());
        row.species = None;
        assert!(!row.has_species());
    }

    #[test]
    fn record_serialization() {
        let record = AnimalRecord {
            animal_id: "IT123".into(),
            breed_code: "005".into(),
            event_year: Some(2024),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(!json.contains("extra"));
        let parsed: AnimalRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, record);
    }
}
