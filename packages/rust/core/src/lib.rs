//! Dataset pipeline and query engine for herdbook.
//!
//! This crate ties together archive loading, reference resolution, and
//! schema translation into one dataset build, and answers lookup, age,
//! distribution, species, region, and breeding queries against it.

pub mod cache;
pub mod pipeline;
pub mod query;

pub use cache::{DatasetCache, fingerprint};
pub use pipeline::{LoadReport, ProgressReporter, RegistryContext, SilentProgress, build_dataset};
pub use query::{
    BreedDistribution, BreedShare, BreedingSummary, MAX_BREEDS, Parameter, QueryEngine,
    QueryOutcome, QueryRequest, RegionSummary, SpeciesCount, Subject, UNKNOWN_BREED, answer,
};
