//! Application configuration for herdbook.
//!
//! User config lives at `~/.herdbook/herdbook.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HerdbookError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "herdbook.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".herdbook";

// ---------------------------------------------------------------------------
// Config structs (matching herdbook.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Registry extract location and load options.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Reference table locations.
    #[serde(default)]
    pub reference: ReferenceConfig,

    /// Native column names of the registry extract.
    #[serde(default)]
    pub schema: SchemaConfig,
}

/// `[registry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory holding the registry archives.
    #[serde(default = "default_archive_dir")]
    pub archive_dir: String,

    /// File extension identifying an archive (without the dot).
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,

    /// Field delimiter of the embedded tables.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Upper bound on the time spent parsing a single archive.
    #[serde(default = "default_parse_timeout")]
    pub parse_timeout_secs: u64,

    /// Reuse the built dataset while the archive directory is unchanged.
    #[serde(default)]
    pub cache: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            archive_dir: default_archive_dir(),
            archive_extension: default_archive_extension(),
            delimiter: default_delimiter(),
            parse_timeout_secs: default_parse_timeout(),
            cache: false,
        }
    }
}

impl RegistryConfig {
    /// The delimiter as a byte. Only ASCII delimiters are accepted.
    pub fn delimiter_byte(&self) -> Result<u8> {
        if !self.delimiter.is_ascii() {
            return Err(HerdbookError::config(format!(
                "delimiter {:?} must be a single ASCII character",
                self.delimiter
            )));
        }
        Ok(self.delimiter as u8)
    }
}

fn default_archive_dir() -> String {
    "files/registry".into()
}
fn default_archive_extension() -> String {
    "zip".into()
}
fn default_delimiter() -> char {
    ','
}
fn default_parse_timeout() -> u64 {
    30
}

/// `[reference]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Native → public column name table.
    #[serde(default = "default_translations")]
    pub translations: String,

    /// Breed code × species code → breed name table.
    #[serde(default = "default_breeds")]
    pub breeds: String,

    /// Province abbreviation → province name table.
    #[serde(default = "default_provinces")]
    pub provinces: String,

    /// Species code → species name and category table.
    #[serde(default = "default_species")]
    pub species: String,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            translations: default_translations(),
            breeds: default_breeds(),
            provinces: default_provinces(),
            species: default_species(),
        }
    }
}

fn default_translations() -> String {
    "files/translations.csv".into()
}
fn default_breeds() -> String {
    "files/breed_mapping.csv".into()
}
fn default_provinces() -> String {
    "files/provinces.csv".into()
}
fn default_species() -> String {
    "files/species.csv".into()
}

/// `[schema]` section — the versioned column set of the registry extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default = "default_animal_id")]
    pub animal_id: String,
    #[serde(default = "default_species_code")]
    pub species_code: String,
    #[serde(default = "default_breed_code")]
    pub breed_code: String,
    #[serde(default = "default_sire_breed_code")]
    pub sire_breed_code: String,
    #[serde(default = "default_dam_breed_code")]
    pub dam_breed_code: String,
    #[serde(default = "default_birth_date")]
    pub birth_date: String,
    #[serde(default = "default_event_year")]
    pub event_year: String,
    #[serde(default = "default_event_month")]
    pub event_month: String,
    #[serde(default = "default_event_day")]
    pub event_day: String,
    #[serde(default = "default_province_code")]
    pub province_code: String,
    #[serde(default = "default_municipality_code")]
    pub municipality_code: String,

    /// Raw columns that are read but never surfaced.
    #[serde(default = "default_dropped")]
    pub dropped: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            animal_id: default_animal_id(),
            species_code: default_species_code(),
            breed_code: default_breed_code(),
            sire_breed_code: default_sire_breed_code(),
            dam_breed_code: default_dam_breed_code(),
            birth_date: default_birth_date(),
            event_year: default_event_year(),
            event_month: default_event_month(),
            event_day: default_event_day(),
            province_code: default_province_code(),
            municipality_code: default_municipality_code(),
            dropped: default_dropped(),
        }
    }
}

impl SchemaConfig {
    /// Columns every payload must carry.
    pub fn required_columns(&self) -> [&str; 10] {
        [
            self.animal_id.as_str(),
            self.species_code.as_str(),
            self.breed_code.as_str(),
            self.sire_breed_code.as_str(),
            self.dam_breed_code.as_str(),
            self.birth_date.as_str(),
            self.event_year.as_str(),
            self.event_month.as_str(),
            self.event_day.as_str(),
            self.province_code.as_str(),
        ]
    }

    /// Whether `column` is mapped to a typed field or explicitly dropped.
    pub fn is_known(&self, column: &str) -> bool {
        self.required_columns().contains(&column)
            || column == self.municipality_code
            || self.dropped.iter().any(|d| d == column)
    }
}

fn default_animal_id() -> String {
    "idAnimale".into()
}
fn default_species_code() -> String {
    "codiceSpecieAIA".into()
}
fn default_breed_code() -> String {
    "codiceRazzaAIA".into()
}
fn default_sire_breed_code() -> String {
    "RazzaPadre".into()
}
fn default_dam_breed_code() -> String {
    "RazzaMadreGenetica".into()
}
fn default_birth_date() -> String {
    "DataNascita".into()
}
fn default_event_year() -> String {
    "anno".into()
}
fn default_event_month() -> String {
    "mese".into()
}
fn default_event_day() -> String {
    "giorno".into()
}
fn default_province_code() -> String {
    "siglaProvincia".into()
}
fn default_municipality_code() -> String {
    "codiceIstat".into()
}
fn default_dropped() -> Vec<String> {
    vec!["RazzaSoggetto".into(), "Specie".into()]
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.herdbook/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| HerdbookError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.herdbook/herdbook.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| HerdbookError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        HerdbookError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    config.registry.delimiter_byte()?;

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_dir()?.join(CONFIG_FILE_NAME);
    init_config_at(&path)?;
    Ok(path)
}

/// Write a default config file to `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| HerdbookError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| HerdbookError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| HerdbookError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}
