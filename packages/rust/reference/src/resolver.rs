//! Reference resolution: turns normalized records into enriched rows.
//!
//! Every join is a left join. A code that does not resolve leaves its
//! enrichment field empty and the row in place, so output row count equals
//! input row count until the optional species filter runs.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use herdbook_shared::{AnimalRecord, FieldLabels, RegistryDataset, RegistryRow};

use crate::tables::ReferenceTables;

/// Whether rows with an unresolved species survive resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeciesFilter {
    /// Keep every row (identifier lookups).
    KeepAll,
    /// Drop rows whose species code is not in the species table
    /// (aggregations and listings).
    DropUnresolved,
}

/// Resolve every record against the reference tables.
#[instrument(skip_all, fields(records = records.len(), ?filter))]
pub fn resolve(
    records: Vec<AnimalRecord>,
    tables: &ReferenceTables,
    labels: FieldLabels,
    filter: SpeciesFilter,
) -> RegistryDataset {
    let input = records.len();
    let mut rows: Vec<RegistryRow> = records
        .into_iter()
        .map(|record| resolve_record(record, tables))
        .collect();

    if filter == SpeciesFilter::DropUnresolved {
        rows.retain(RegistryRow::has_species);
    }

    debug!(input, output = rows.len(), "records resolved");
    RegistryDataset {
        labels,
        rows,
        translated: false,
    }
}

/// Resolve one record: breed, sire breed, dam breed, province, species.
///
/// The raw codes and event date parts are consumed here and do not appear
/// on the returned row.
pub fn resolve_record(record: AnimalRecord, tables: &ReferenceTables) -> RegistryRow {
    let breed = tables
        .breeds
        .breed(&record.breed_code, &record.species_code)
        .map(str::to_string);
    let sire_breed = tables
        .breeds
        .parent_breed(&record.sire_breed_code)
        .map(str::to_string);
    let dam_breed = tables
        .breeds
        .parent_breed(&record.dam_breed_code)
        .map(str::to_string);
    let province = tables
        .provinces
        .name(&record.province_code)
        .map(str::to_string);
    let (species, species_category) = match tables.species.get(&record.species_code) {
        Some(info) => (Some(info.name.clone()), Some(info.category.clone())),
        None => (None, None),
    };

    RegistryRow {
        animal_id: record.animal_id,
        birth_date: record.birth_date,
        analysis_date: record.analysis_date,
        breed,
        sire_breed,
        dam_breed,
        province,
        species,
        species_category,
        municipality_code: record.municipality_code,
        extra: record.extra,
        layout: record.layout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::tests::write_reference_fixture;

    fn tables() -> ReferenceTables {
        let dir = tempfile::tempdir().expect("tempdir");
        ReferenceTables::load(&write_reference_fixture(dir.path())).expect("load")
    }

    fn record(id: &str, species: &str, breed: &str, sire: &str, dam: &str) -> AnimalRecord {
        AnimalRecord {
            animal_id: id.into(),
            species_code: species.into(),
            breed_code: breed.into(),
            sire_breed_code: sire.into(),
            dam_breed_code: dam.into(),
            province_code: "MI".into(),
            ..Default::default()
        }
    }

    #[test]
    fn joins_never_change_row_count() {
        let tables = tables();
        let records = vec![
            record("IT1", "01", "5", "31", "5"),
            record("IT2", "01", "", "", ""),
            record("IT3", "99", "5", "77", "31"),
            record("IT4", "02", "5", "5", "5"),
        ];

        let dataset = resolve(records, &tables, FieldLabels::default(), SpeciesFilter::KeepAll);
        assert_eq!(dataset.len(), 4);

        let first = &dataset.rows[0];
        assert_eq!(first.breed.as_deref(), Some("Holstein"));
        assert_eq!(first.sire_breed.as_deref(), Some("Brown Swiss"));
        assert_eq!(first.dam_breed.as_deref(), Some("Holstein"));
        assert_eq!(first.province.as_deref(), Some("Milano"));
        assert_eq!(first.species.as_deref(), Some("Cattle"));
        assert_eq!(first.species_category.as_deref(), Some("Bovine"));

        let empty_codes = &dataset.rows[1];
        assert_eq!(empty_codes.breed, None);
        assert_eq!(empty_codes.sire_breed, None);

        // Own breed is species-scoped, parentage is not.
        let unknown_species = &dataset.rows[2];
        assert_eq!(unknown_species.breed, None);
        assert_eq!(unknown_species.sire_breed, None);
        assert_eq!(unknown_species.dam_breed.as_deref(), Some("Brown Swiss"));
        assert_eq!(unknown_species.species, None);

        assert_eq!(dataset.rows[3].breed.as_deref(), Some("Sarda"));
    }

    #[test]
    fn species_filter_drops_only_unresolved_species() {
        let tables = tables();
        let records = vec![
            record("IT1", "01", "5", "", ""),
            record("IT3", "99", "5", "", ""),
            record("IT4", "02", "404", "", ""),
        ];

        let dataset = resolve(
            records,
            &tables,
            FieldLabels::default(),
            SpeciesFilter::DropUnresolved,
        );
        let ids: Vec<&str> = dataset.rows.iter().map(|r| r.animal_id.as_str()).collect();
        assert_eq!(ids, ["IT1", "IT4"]);
        assert!(dataset.rows.iter().all(RegistryRow::has_species));
    }
}
