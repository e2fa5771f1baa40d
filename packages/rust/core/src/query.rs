//! Query engine: requests, outcomes, and the pure functions answering them.
//!
//! Every answer is a function of the request and a freshly built (or
//! cached) [`RegistryDataset`]. Failures a caller can cause (missing
//! parameters, unknown codes, empty results) are ordinary outcomes; only
//! configuration problems surface as errors.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use herdbook_ingest::strip_leading_zeros;
use herdbook_reference::{ProvinceMapping, ReferenceTables, SpeciesFilter};
use herdbook_shared::{DATE_FORMAT, RegistryDataset, Result};

use crate::cache::DatasetCache;
use crate::pipeline::{ProgressReporter, RegistryContext, build_dataset};

/// Breeds shown in a distribution before truncation.
pub const MAX_BREEDS: usize = 10;

/// Bucket for rows whose breed did not resolve.
pub const UNKNOWN_BREED: &str = "Unknown";

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A query as handed over by the dialogue front end.
///
/// Parameters are plain strings and may be absent or blank; that is a valid
/// request answered with [`QueryOutcome::MissingParameter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryRequest {
    Lookup {
        #[serde(default)]
        identifier: Option<String>,
    },
    Age {
        #[serde(default)]
        identifier: Option<String>,
    },
    BreedDistribution {
        #[serde(default)]
        species: Option<String>,
    },
    ListSpecies,
    Region {
        #[serde(default)]
        province: Option<String>,
        #[serde(default)]
        istat_code: Option<String>,
    },
    Breeding {
        #[serde(default)]
        species_code: Option<String>,
        #[serde(default)]
        breed_code: Option<String>,
    },
}

impl QueryRequest {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lookup { .. } => "lookup",
            Self::Age { .. } => "age",
            Self::BreedDistribution { .. } => "breed_distribution",
            Self::ListSpecies => "list_species",
            Self::Region { .. } => "region",
            Self::Breeding { .. } => "breeding",
        }
    }

    /// Whether this kind of query runs on the species-filtered dataset.
    pub fn species_filter(&self) -> SpeciesFilter {
        match self {
            Self::Lookup { .. } | Self::Age { .. } => SpeciesFilter::KeepAll,
            _ => SpeciesFilter::DropUnresolved,
        }
    }

    /// The first required parameter that is absent or blank.
    pub fn missing_parameter(&self) -> Option<Parameter> {
        match self {
            Self::Lookup { identifier } | Self::Age { identifier } => {
                present(identifier).is_none().then_some(Parameter::Identifier)
            }
            Self::BreedDistribution { species } => {
                present(species).is_none().then_some(Parameter::Species)
            }
            Self::ListSpecies => None,
            Self::Region { province, .. } => {
                present(province).is_none().then_some(Parameter::Province)
            }
            Self::Breeding {
                species_code,
                breed_code,
            } => {
                if present(species_code).is_none() {
                    Some(Parameter::SpeciesCode)
                } else if present(breed_code).is_none() {
                    Some(Parameter::BreedCode)
                } else {
                    None
                }
            }
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// A request parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Identifier,
    Species,
    Province,
    SpeciesCode,
    BreedCode,
}

/// What a no-data outcome searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Animal,
    Species,
    Province,
    Breed,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// One breed's share of a species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreedShare {
    pub breed: String,
    pub count: usize,
    pub percentage: f64,
}

/// Breeds of one species ranked by row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreedDistribution {
    pub species: String,
    /// Rows of the species, before truncation.
    pub total: usize,
    pub entries: Vec<BreedShare>,
    /// Set when more than [`MAX_BREEDS`] breeds were present.
    pub truncated: bool,
}

impl BreedDistribution {
    /// Notice shown alongside a truncated distribution.
    pub fn notice(&self) -> Option<String> {
        self.truncated
            .then(|| format!("Too many breeds to display, showing the top {MAX_BREEDS}."))
    }
}

/// Rows per species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCount {
    pub species: String,
    pub count: usize,
}

/// Registry activity in one province, optionally one municipality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub abbreviation: String,
    pub province: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub istat_code: Option<String>,
    pub rows: usize,
    pub animals: usize,
    pub species: Vec<SpeciesCount>,
}

/// How a breed appears in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreedingSummary {
    pub species: String,
    pub species_category: String,
    pub breed: String,
    /// Rows whose own breed is `breed`.
    pub rows: usize,
    /// Distinct animals among those rows.
    pub animals: usize,
    /// Rows of any species with `breed` as sire breed.
    pub as_sire: usize,
    /// Rows of any species with `breed` as dam breed.
    pub as_dam: usize,
}

/// The answer to a [`QueryRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueryOutcome {
    MissingParameter {
        parameter: Parameter,
    },
    NoData {
        subject: Subject,
        value: String,
    },
    UnresolvableSpecies {
        code: String,
    },
    BirthDateUnknown {
        identifier: String,
    },
    Lookup {
        identifier: String,
        rows: Vec<Vec<(String, String)>>,
    },
    Age {
        identifier: String,
        months: i32,
        birth_date: NaiveDate,
    },
    Distribution(BreedDistribution),
    Species {
        names: Vec<String>,
    },
    Region(RegionSummary),
    Breeding(BreedingSummary),
}

impl QueryOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter { .. }
                | Self::NoData { .. }
                | Self::UnresolvableSpecies { .. }
                | Self::BirthDateUnknown { .. }
        )
    }

    /// One human sentence describing the outcome. Success variants get a
    /// heading sentence; their payload is rendered by the caller.
    pub fn message(&self) -> String {
        match self {
            Self::MissingParameter { parameter } => match parameter {
                Parameter::Identifier => "Please provide a valid Animal ID.".into(),
                Parameter::Species => "Please provide a species name.".into(),
                Parameter::Province => "Please provide a province abbreviation.".into(),
                Parameter::SpeciesCode => "Please provide a species code.".into(),
                Parameter::BreedCode => "Please provide a breed code.".into(),
            },
            Self::NoData { subject, value } => match subject {
                Subject::Animal => "No data found for the given animal ID.".into(),
                Subject::Species => format!("No data found for species {value}."),
                Subject::Province => {
                    format!("I couldn't find regional data for {value}.")
                }
                Subject::Breed => {
                    format!("I couldn't find breeding information for breed code {value}.")
                }
            },
            Self::UnresolvableSpecies { code } => {
                format!("Species code {code} does not match any known species.")
            }
            Self::BirthDateUnknown { identifier } => {
                format!("The birth date of animal {identifier} is not recorded.")
            }
            Self::Lookup { identifier, .. } => {
                format!("Here is the information for animal {identifier}:")
            }
            Self::Age {
                identifier,
                months,
                birth_date,
            } => format!(
                "The animal with ID {identifier} is {months} months old (born {}).",
                birth_date.format(DATE_FORMAT)
            ),
            Self::Distribution(d) => format!("Breed distribution for {}:", d.species),
            Self::Species { names } => {
                format!("Species in the registry: {}.", names.join(", "))
            }
            Self::Region(r) => {
                let place = match &r.istat_code {
                    Some(code) => format!("ISTAT code {code} in {}", r.province),
                    None => r.province.clone(),
                };
                format!(
                    "Regional data for {place}: {} records covering {} animals.",
                    r.rows, r.animals
                )
            }
            Self::Breeding(b) => format!(
                "{} ({}): {} records covering {} animals; sire breed in {} records, dam breed in {}.",
                b.breed, b.species, b.rows, b.animals, b.as_sire, b.as_dam
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Query functions
// ---------------------------------------------------------------------------

/// Every row of `identifier`, flattened to non-empty field/value pairs.
pub fn lookup(dataset: &RegistryDataset, identifier: &str) -> QueryOutcome {
    let identifier = identifier.trim();
    let rows: Vec<_> = dataset
        .rows
        .iter()
        .filter(|r| r.animal_id == identifier)
        .map(|r| r.pairs(&dataset.labels))
        .collect();

    if rows.is_empty() {
        return QueryOutcome::NoData {
            subject: Subject::Animal,
            value: identifier.to_string(),
        };
    }
    QueryOutcome::Lookup {
        identifier: identifier.to_string(),
        rows,
    }
}

/// Age of `identifier` in whole months on `today`, from the first matching
/// row that records a birth date.
pub fn age(dataset: &RegistryDataset, identifier: &str, today: NaiveDate) -> QueryOutcome {
    let identifier = identifier.trim();
    let mut matched = dataset.rows.iter().filter(|r| r.animal_id == identifier).peekable();

    if matched.peek().is_none() {
        return QueryOutcome::NoData {
            subject: Subject::Animal,
            value: identifier.to_string(),
        };
    }

    match matched.find_map(|r| r.birth_date) {
        Some(birth_date) => QueryOutcome::Age {
            identifier: identifier.to_string(),
            months: age_in_months(birth_date, today),
            birth_date,
        },
        None => QueryOutcome::BirthDateUnknown {
            identifier: identifier.to_string(),
        },
    }
}

/// Month difference between two dates, ignoring the day of month.
///
/// Negative when `birth` lies in a later month than `today`.
pub fn age_in_months(birth: NaiveDate, today: NaiveDate) -> i32 {
    (today.year() - birth.year()) * 12 + (today.month() as i32 - birth.month() as i32)
}

/// Breed shares of `species`, matched trimmed and case-insensitively.
pub fn breed_distribution(dataset: &RegistryDataset, species: &str) -> QueryOutcome {
    let wanted = species.trim().to_lowercase();
    let matched: Vec<_> = dataset
        .rows
        .iter()
        .filter(|r| {
            r.species
                .as_deref()
                .is_some_and(|s| s.trim().to_lowercase() == wanted)
        })
        .collect();

    let Some(first) = matched.first() else {
        return QueryOutcome::NoData {
            subject: Subject::Species,
            value: species.trim().to_string(),
        };
    };
    let display = first.species.clone().unwrap_or_default();

    // First-seen order, so the stable sort below keeps ties in that order.
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in &matched {
        let breed = row
            .breed
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(UNKNOWN_BREED);
        match index.get(breed) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(breed.to_string(), counts.len());
                counts.push((breed.to_string(), 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let total = matched.len();
    let truncated = counts.len() > MAX_BREEDS;
    let entries = counts
        .into_iter()
        .take(MAX_BREEDS)
        .map(|(breed, count)| BreedShare {
            breed,
            count,
            percentage: count as f64 / total as f64 * 100.0,
        })
        .collect();

    QueryOutcome::Distribution(BreedDistribution {
        species: display,
        total,
        entries,
        truncated,
    })
}

/// Distinct non-empty species names in first-occurrence order.
pub fn list_species(dataset: &RegistryDataset) -> QueryOutcome {
    let mut seen = HashSet::new();
    let names = dataset
        .rows
        .iter()
        .filter_map(|r| r.species.as_deref())
        .filter(|s| !s.trim().is_empty())
        .filter(|s| seen.insert(*s))
        .map(str::to_string)
        .collect();
    QueryOutcome::Species { names }
}

/// Rows in a province, optionally narrowed to one ISTAT municipality.
pub fn region(
    dataset: &RegistryDataset,
    provinces: &ProvinceMapping,
    province: &str,
    istat_code: Option<&str>,
) -> QueryOutcome {
    let abbreviation = province.trim().to_uppercase();
    let istat_code = istat_code.map(str::trim).filter(|c| !c.is_empty());
    let no_data = || QueryOutcome::NoData {
        subject: Subject::Province,
        value: match istat_code {
            Some(code) => format!("ISTAT code {code} in {abbreviation}"),
            None => abbreviation.clone(),
        },
    };

    let Some(name) = provinces.name(&abbreviation) else {
        return no_data();
    };

    let matched: Vec<_> = dataset
        .rows
        .iter()
        .filter(|r| r.province.as_deref() == Some(name))
        .filter(|r| match istat_code {
            Some(code) => r.municipality_code.as_deref().map(str::trim) == Some(code),
            None => true,
        })
        .collect();
    if matched.is_empty() {
        return no_data();
    }

    let animals = matched
        .iter()
        .map(|r| r.animal_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let mut species: Vec<SpeciesCount> = Vec::new();
    for seen in matched.iter().filter_map(|r| r.species.as_deref()) {
        match species.iter_mut().find(|s| s.species == seen) {
            Some(entry) => entry.count += 1,
            None => species.push(SpeciesCount {
                species: seen.to_string(),
                count: 1,
            }),
        }
    }

    QueryOutcome::Region(RegionSummary {
        abbreviation,
        province: name.to_string(),
        istat_code: istat_code.map(str::to_string),
        rows: matched.len(),
        animals,
        species,
    })
}

/// How one breed of one species appears in the registry, both as the
/// animal's own breed and in parentage.
pub fn breeding(
    dataset: &RegistryDataset,
    tables: &ReferenceTables,
    species_code: &str,
    breed_code: &str,
) -> QueryOutcome {
    let species_code = species_code.trim();
    let Some(species) = tables.species.get(species_code) else {
        return QueryOutcome::UnresolvableSpecies {
            code: species_code.to_string(),
        };
    };

    let Some(breed) = tables
        .breeds
        .breed(&strip_leading_zeros(breed_code.trim()), species_code)
    else {
        return QueryOutcome::NoData {
            subject: Subject::Breed,
            value: breed_code.trim().to_string(),
        };
    };

    let own: Vec<_> = dataset
        .rows
        .iter()
        .filter(|r| r.species.as_deref() == Some(species.name.as_str()))
        .filter(|r| r.breed.as_deref() == Some(breed))
        .collect();
    let animals = own
        .iter()
        .map(|r| r.animal_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let as_sire = dataset
        .rows
        .iter()
        .filter(|r| r.sire_breed.as_deref() == Some(breed))
        .count();
    let as_dam = dataset
        .rows
        .iter()
        .filter(|r| r.dam_breed.as_deref() == Some(breed))
        .count();

    QueryOutcome::Breeding(BreedingSummary {
        species: species.name.clone(),
        species_category: species.category.clone(),
        breed: breed.to_string(),
        rows: own.len(),
        animals,
        as_sire,
        as_dam,
    })
}

/// Answer `request` against an already built dataset.
pub fn answer(
    request: &QueryRequest,
    dataset: &RegistryDataset,
    tables: &ReferenceTables,
    today: NaiveDate,
) -> QueryOutcome {
    if let Some(parameter) = request.missing_parameter() {
        return QueryOutcome::MissingParameter { parameter };
    }

    let text = |v: &Option<String>| v.as_deref().unwrap_or_default().trim().to_string();
    match request {
        QueryRequest::Lookup { identifier } => lookup(dataset, &text(identifier)),
        QueryRequest::Age { identifier } => age(dataset, &text(identifier), today),
        QueryRequest::BreedDistribution { species } => breed_distribution(dataset, &text(species)),
        QueryRequest::ListSpecies => list_species(dataset),
        QueryRequest::Region {
            province,
            istat_code,
        } => region(
            dataset,
            &tables.provinces,
            &text(province),
            istat_code.as_deref(),
        ),
        QueryRequest::Breeding {
            species_code,
            breed_code,
        } => breeding(dataset, tables, &text(species_code), &text(breed_code)),
    }
}

// ---------------------------------------------------------------------------
// QueryEngine
// ---------------------------------------------------------------------------

/// Runs requests end to end: parameter check, dataset build, answer.
pub struct QueryEngine<'a> {
    ctx: &'a RegistryContext,
    cache: Option<DatasetCache>,
}

impl<'a> QueryEngine<'a> {
    /// An engine that rebuilds the dataset for every request.
    pub fn new(ctx: &'a RegistryContext) -> Self {
        Self { ctx, cache: None }
    }

    /// An engine that reuses datasets until the archive directory changes.
    pub fn with_cache(ctx: &'a RegistryContext) -> Self {
        Self {
            ctx,
            cache: Some(DatasetCache::new()),
        }
    }

    pub fn context(&self) -> &RegistryContext {
        self.ctx
    }

    /// Execute one request. Missing parameters are answered without
    /// touching the archives.
    #[instrument(skip_all, fields(kind = request.kind()))]
    pub fn execute(
        &mut self,
        request: &QueryRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<QueryOutcome> {
        if let Some(parameter) = request.missing_parameter() {
            debug!(?parameter, "missing parameter");
            return Ok(QueryOutcome::MissingParameter { parameter });
        }

        let today = Local::now().date_naive();
        let filter = request.species_filter();
        let ctx = self.ctx;

        let outcome = match &mut self.cache {
            Some(cache) => {
                let dataset = cache.get_or_build(ctx, filter, progress)?;
                answer(request, dataset, &ctx.tables, today)
            }
            None => {
                let (dataset, _) = build_dataset(ctx, filter, progress)?;
                answer(request, &dataset, &ctx.tables, today)
            }
        };

        debug!(failure = outcome.is_failure(), "query answered");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use crate::pipeline::tests::fixture;
    use herdbook_shared::{FieldLabels, RegistryRow};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn built(filter: SpeciesFilter) -> (crate::pipeline::tests::Fixture, RegistryDataset) {
        let fx = fixture();
        let (dataset, _) = build_dataset(&fx.ctx, filter, &SilentProgress).expect("build");
        (fx, dataset)
    }

    fn cattle(breeds: &[&str]) -> RegistryDataset {
        RegistryDataset {
            labels: FieldLabels::default(),
            rows: breeds
                .iter()
                .enumerate()
                .map(|(i, b)| RegistryRow {
                    animal_id: format!("IT{i}"),
                    breed: (!b.is_empty()).then(|| b.to_string()),
                    species: Some("Cattle".into()),
                    ..Default::default()
                })
                .collect(),
            translated: true,
        }
    }

    #[test]
    fn age_ignores_day_of_month() {
        assert_eq!(age_in_months(date(2020, 1, 15), date(2024, 3, 1)), 50);
        assert_eq!(age_in_months(date(2020, 3, 15), date(2024, 3, 1)), 48);
        assert_eq!(age_in_months(date(2024, 5, 1), date(2024, 3, 1)), -2);
    }

    #[test]
    fn age_of_fixture_animal() {
        let (_fx, dataset) = built(SpeciesFilter::KeepAll);
        let outcome = age(&dataset, "IT123", date(2024, 3, 1));
        assert_eq!(
            outcome,
            QueryOutcome::Age {
                identifier: "IT123".into(),
                months: 50,
                birth_date: date(2020, 1, 15),
            }
        );
        assert!(outcome.message().contains("50 months"));
    }

    #[test]
    fn age_without_birth_date() {
        let dataset = cattle(&["Holstein"]);
        let outcome = age(&dataset, "IT0", date(2024, 3, 1));
        assert!(matches!(outcome, QueryOutcome::BirthDateUnknown { .. }));
        assert!(outcome.is_failure());
    }

    #[test]
    fn lookup_returns_every_enriched_row() {
        let (_fx, dataset) = built(SpeciesFilter::KeepAll);
        let QueryOutcome::Lookup { rows, .. } = lookup(&dataset, " IT123 ") else {
            panic!("expected lookup rows");
        };

        assert_eq!(rows.len(), 3);
        for pairs in &rows {
            assert!(pairs.contains(&("Breed".into(), "Holstein".into())));
            assert!(pairs.contains(&("Sire Breed".into(), "Brown Swiss".into())));
            assert!(pairs.iter().all(|(_, v)| v != "005"));
            assert!(!pairs.iter().any(|(k, _)| k == "Dam Breed"));
        }
        assert!(rows[0].contains(&("Animal ID".into(), "IT123".into())));
        assert!(rows[0].contains(&("Sex".into(), "F".into())));
    }

    #[test]
    fn lookup_unknown_identifier_is_no_data() {
        let (_fx, dataset) = built(SpeciesFilter::KeepAll);
        let outcome = lookup(&dataset, "IT999");
        assert_eq!(outcome.message(), "No data found for the given animal ID.");
    }

    #[test]
    fn missing_identifier_is_not_no_data() {
        let dataset = RegistryDataset::default();
        let tables = ReferenceTables::default();
        for identifier in [None, Some(String::new()), Some("   ".into())] {
            let outcome = answer(
                &QueryRequest::Lookup { identifier },
                &dataset,
                &tables,
                date(2024, 3, 1),
            );
            assert_eq!(
                outcome,
                QueryOutcome::MissingParameter {
                    parameter: Parameter::Identifier
                }
            );
            assert_eq!(outcome.message(), "Please provide a valid Animal ID.");
        }
    }

    #[test]
    fn distribution_percentages_sum_to_hundred() {
        let (_fx, dataset) = built(SpeciesFilter::DropUnresolved);
        let QueryOutcome::Distribution(d) = breed_distribution(&dataset, "  CATTLE ") else {
            panic!("expected distribution");
        };

        assert_eq!(d.species, "Cattle");
        assert_eq!(d.total, 4);
        assert!(!d.truncated);
        assert_eq!(d.notice(), None);
        assert_eq!(d.entries[0].breed, "Holstein");
        assert_eq!(d.entries[0].count, 3);
        let sum: f64 = d.entries.iter().map(|e| e.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn distribution_counts_unresolved_breeds() {
        let dataset = cattle(&["Holstein", "", "Holstein"]);
        let QueryOutcome::Distribution(d) = breed_distribution(&dataset, "cattle") else {
            panic!("expected distribution");
        };
        assert_eq!(d.entries[1].breed, UNKNOWN_BREED);
        let sum: f64 = d.entries.iter().map(|e| e.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn distribution_truncates_to_top_ten() {
        let mut breeds: Vec<String> = (0..12).map(|i| format!("Breed {i}")).collect();
        breeds.push("Breed 11".into());
        let refs: Vec<&str> = breeds.iter().map(String::as_str).collect();
        let QueryOutcome::Distribution(d) = breed_distribution(&cattle(&refs), "Cattle") else {
            panic!("expected distribution");
        };

        assert!(d.truncated);
        assert_eq!(d.entries.len(), MAX_BREEDS);
        assert_eq!(d.entries[0].breed, "Breed 11");
        assert_eq!(d.total, 13);
        assert!(d.notice().is_some_and(|n| n.contains("top 10")));
    }

    #[test]
    fn distribution_ties_keep_first_seen_order() {
        let dataset = cattle(&["Sarda", "Holstein", "Jersey", "Holstein", "Jersey", "Sarda"]);
        let QueryOutcome::Distribution(d) = breed_distribution(&dataset, "Cattle") else {
            panic!("expected distribution");
        };
        let order: Vec<&str> = d.entries.iter().map(|e| e.breed.as_str()).collect();
        assert_eq!(order, ["Sarda", "Holstein", "Jersey"]);
    }

    #[test]
    fn distribution_of_absent_species() {
        let (_fx, dataset) = built(SpeciesFilter::DropUnresolved);
        let outcome = breed_distribution(&dataset, "Goat");
        assert_eq!(outcome.message(), "No data found for species Goat.");
    }

    #[test]
    fn species_listing_is_distinct_and_ordered() {
        let (_fx, dataset) = built(SpeciesFilter::DropUnresolved);
        assert!(dataset.rows.iter().all(|r| r.has_species()));
        assert_eq!(
            list_species(&dataset),
            QueryOutcome::Species {
                names: vec!["Cattle".into(), "Sheep".into()]
            }
        );
    }

    #[test]
    fn region_summaries() {
        let (fx, dataset) = built(SpeciesFilter::DropUnresolved);
        let provinces = &fx.ctx.tables.provinces;

        let QueryOutcome::Region(r) = region(&dataset, provinces, "ss", None) else {
            panic!("expected region");
        };
        assert_eq!(r.province, "Sassari");
        assert_eq!(r.rows, 2);
        assert_eq!(r.animals, 2);
        assert_eq!(r.species.len(), 2);

        let QueryOutcome::Region(r) = region(&dataset, provinces, "MI", Some("015146")) else {
            panic!("expected region");
        };
        assert_eq!((r.rows, r.animals), (3, 1));

        assert!(matches!(
            region(&dataset, provinces, "MI", Some("999999")),
            QueryOutcome::NoData {
                subject: Subject::Province,
                ..
            }
        ));
        assert!(region(&dataset, provinces, "XX", None).is_failure());
    }

    #[test]
    fn breeding_counts_parentage_across_species() {
        let (fx, dataset) = built(SpeciesFilter::DropUnresolved);
        let tables = &fx.ctx.tables;

        let QueryOutcome::Breeding(b) = breeding(&dataset, tables, "01", "005") else {
            panic!("expected breeding summary");
        };
        assert_eq!(b.breed, "Holstein");
        assert_eq!(b.species_category, "Bovine");
        assert_eq!((b.rows, b.animals), (3, 1));
        assert_eq!(b.as_sire, 2);
        assert_eq!(b.as_dam, 1);

        assert_eq!(
            breeding(&dataset, tables, "77", "005"),
            QueryOutcome::UnresolvableSpecies { code: "77".into() }
        );
        assert!(matches!(
            breeding(&dataset, tables, "01", "99"),
            QueryOutcome::NoData {
                subject: Subject::Breed,
                ..
            }
        ));
    }

    #[test]
    fn requests_parse_from_json() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"kind":"breeding","species_code":"01"}"#).expect("parse");
        assert_eq!(request.missing_parameter(), Some(Parameter::BreedCode));

        let request: QueryRequest =
            serde_json::from_str(r#"{"kind":"list_species"}"#).expect("parse");
        assert_eq!(request.species_filter(), SpeciesFilter::DropUnresolved);

        let outcome = QueryOutcome::MissingParameter {
            parameter: Parameter::Species,
        };
        let json = serde_json::to_string(&outcome).expect("serialize");
        assert_eq!(json, r#"{"outcome":"missing_parameter","parameter":"species"}"#);
    }

    #[test]
    fn engine_answers_missing_parameters_without_loading() {
        let mut fx = fixture();
        fx.ctx.archive_dir = fx.dir.path().join("gone");
        let mut engine = QueryEngine::new(&fx.ctx);

        let outcome = engine
            .execute(&QueryRequest::Age { identifier: None }, &SilentProgress)
            .expect("no load needed");
        assert!(matches!(outcome, QueryOutcome::MissingParameter { .. }));

        let err = engine
            .execute(
                &QueryRequest::Age {
                    identifier: Some("IT123".into()),
                },
                &SilentProgress,
            )
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn cached_engine_matches_uncached() {
        let fx = fixture();
        let requests = [
            QueryRequest::Lookup {
                identifier: Some("IT500".into()),
            },
            QueryRequest::BreedDistribution {
                species: Some("sheep".into()),
            },
            QueryRequest::ListSpecies,
            QueryRequest::Lookup {
                identifier: Some("IT900".into()),
            },
        ];

        let mut plain = QueryEngine::new(&fx.ctx);
        let mut cached = QueryEngine::with_cache(&fx.ctx);
        for request in &requests {
            let a = plain.execute(request, &SilentProgress).expect("plain");
            let b = cached.execute(request, &SilentProgress).expect("cached");
            assert_eq!(a, b);
            assert!(!a.is_failure(), "{request:?} failed: {}", a.message());
        }
    }
}
