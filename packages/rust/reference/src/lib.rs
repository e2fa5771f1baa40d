//! Reference tables and enrichment for herdbook.
//!
//! Loads the breed, province, species, and translation tables, resolves
//! normalized registry records against them, and renames the result into
//! the public column vocabulary.

pub mod resolver;
pub mod tables;
pub mod translate;

pub use resolver::{SpeciesFilter, resolve, resolve_record};
pub use tables::{
    BreedMapping, ProvinceMapping, ReferenceTables, SpeciesInfo, SpeciesMapping,
    TranslationMapping,
};
pub use translate::translate;
