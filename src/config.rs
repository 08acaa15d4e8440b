use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::clean::CleanFilters;
use crate::domain::Species;
use crate::error::SyncError;
use crate::wikipathways::DEFAULT_LISTING_URL;

pub const DEFAULT_CONFIG_FILE: &str = "pfocr-sync.json";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_PROGRESS_FILE: &str = "done.txt";
pub const DEFAULT_OUTPUT_FILE: &str = "output.gmt";
pub const DATA_DIR_ENV: &str = "PFOCR_DATA_DIR";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub listing_url: Option<String>,
    #[serde(default)]
    pub species: Option<Species>,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub progress_file: Option<String>,
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub filters: Option<FiltersConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FiltersConfig {
    #[serde(default)]
    pub min_genes: Option<usize>,
    #[serde(default)]
    pub max_genes: Option<usize>,
    #[serde(default)]
    pub max_term_len: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub listing_url: String,
    pub species: Species,
    pub data_dir: String,
    pub progress_file: String,
    pub output_file: String,
    pub filters: CleanFilters,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SyncError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Self::resolve_config(Config::default()));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| SyncError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| SyncError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        let mut filters = CleanFilters::default();
        if let Some(overrides) = config.filters {
            if let Some(value) = overrides.min_genes {
                filters.min_genes = value;
            }
            if let Some(value) = overrides.max_genes {
                filters.max_genes = value;
            }
            if let Some(value) = overrides.max_term_len {
                filters.max_term_len = value;
            }
        }

        ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            listing_url: config
                .listing_url
                .unwrap_or_else(|| DEFAULT_LISTING_URL.to_string()),
            species: config.species.unwrap_or(Species::Human),
            data_dir: config
                .data_dir
                .or_else(env_data_dir)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            progress_file: config
                .progress_file
                .unwrap_or_else(|| DEFAULT_PROGRESS_FILE.to_string()),
            output_file: config
                .output_file
                .unwrap_or_else(|| DEFAULT_OUTPUT_FILE.to_string()),
            filters,
        }
    }
}

fn env_data_dir() -> Option<String> {
    env::var(DATA_DIR_ENV).ok().filter(|value| !value.is_empty())
}
