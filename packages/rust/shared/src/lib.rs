//! Shared types, error model, and configuration for herdbook.
//!
//! This crate is the foundation depended on by all other herdbook crates.
//! It provides:
//! - [`HerdbookError`] — the unified error type
//! - Domain types ([`AnimalRecord`], [`RegistryRow`], [`RegistryDataset`], [`FieldLabels`])
//! - Configuration ([`AppConfig`], [`SchemaConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ReferenceConfig, RegistryConfig, SchemaConfig, config_dir, config_file_path,
    init_config, init_config_at, load_config, load_config_from,
};
pub use error::{HerdbookError, Result};
pub use types::{
    AnimalRecord, DATE_FORMAT, FieldLabels, NativeLayout, RegistryDataset, RegistryRow,
};
