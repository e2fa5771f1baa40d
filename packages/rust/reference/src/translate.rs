//! Schema translation: native column names → public names.

use tracing::debug;

use herdbook_shared::RegistryDataset;

use crate::tables::TranslationMapping;

/// Rename every label and extra column of `dataset` through `mapping`.
///
/// Runs after resolution, so it only ever sees final column names. All
/// columns are renamed in one pass from their native names; a column whose
/// public name is another column's native name is not renamed twice.
/// Columns missing from the mapping keep their name. A dataset that is
/// already translated is left alone.
pub fn translate(dataset: &mut RegistryDataset, mapping: &TranslationMapping) {
    if dataset.translated {
        debug!("dataset already translated");
        return;
    }

    let mut renamed = 0usize;

    for label in dataset.labels.iter_mut() {
        if let Some(public) = mapping.rename(label) {
            *label = public.to_string();
            renamed += 1;
        }
    }

    for row in &mut dataset.rows {
        for (key, _) in &mut row.extra {
            if let Some(public) = mapping.rename(key) {
                *key = public.to_string();
            }
        }
    }

    dataset.translated = true;
    debug!(labels_renamed = renamed, "schema translated");
}

#[cfg(test)]
mod tests {
    use super::*;
    use herdbook_shared::{FieldLabels, RegistryRow};

    fn mapping() -> TranslationMapping {
        TranslationMapping::from_rows([
            ("idAnimale".to_string(), "Animal ID".to_string()),
            ("Sesso".to_string(), "Sex".to_string()),
            ("Breed".to_string(), "Razza".to_string()),
            ("Razza".to_string(), "Breed".to_string()),
        ])
        .expect("mapping")
    }

    fn dataset() -> RegistryDataset {
        RegistryDataset {
            labels: FieldLabels::default(),
            rows: vec![RegistryRow {
                animal_id: "IT1".into(),
                extra: vec![
                    ("Sesso".into(), "F".into()),
                    ("Colore".into(), "Pezzata".into()),
                ],
                ..Default::default()
            }],
            translated: false,
        }
    }

    #[test]
    fn renames_known_columns_only() {
        let mut ds = dataset();
        translate(&mut ds, &mapping());

        assert!(ds.translated);
        assert_eq!(ds.labels.animal_id, "Animal ID");
        assert_eq!(ds.labels.birth_date, "DataNascita");
        assert_eq!(ds.labels.breed, "Razza");
        assert_eq!(ds.rows[0].extra[0].0, "Sex");
        assert_eq!(ds.rows[0].extra[1].0, "Colore");
    }

    #[test]
    fn translation_is_idempotent() {
        let mapping = mapping();
        let mut once = dataset();
        translate(&mut once, &mapping);
        let mut twice = once.clone();
        translate(&mut twice, &mapping);

        assert_eq!(once, twice);
    }

    #[test]
    fn chained_names_rename_once_from_native() {
        let mapping = TranslationMapping::from_rows([
            ("Sesso".to_string(), "Sex".to_string()),
            ("Sex".to_string(), "Gender".to_string()),
        ])
        .expect("mapping");
        let mut ds = RegistryDataset {
            rows: vec![RegistryRow {
                animal_id: "IT1".into(),
                extra: vec![("Sesso".into(), "F".into()), ("Sex".into(), "F".into())],
                ..Default::default()
            }],
            ..Default::default()
        };

        translate(&mut ds, &mapping);
        let keys: Vec<&str> = ds.rows[0].extra.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["Sex", "Gender"]);

        translate(&mut ds, &mapping);
        let keys: Vec<&str> = ds.rows[0].extra.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["Sex", "Gender"]);
    }
}
