//! Runtime configuration: dataset column names, search tuning, paths.
//! Defaults live here; `CRASHMAP_CONFIG` may point at a YAML file overriding any subset,
//! and `CRASHMAP_SNAPSHOT` / `CRASHMAP_SHEET_URL` override the paths last.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_SNAPSHOT_PATH: &str = "assets/data.json";
pub const DEFAULT_SHEET_ID: &str = "1OFRKPoFwA7UrX6yTVrtidbzLWIcFrJVStu8aOq0PnDc";
pub const DEFAULT_SHEET_GID: &str = "1792731114";

pub const CONFIG_PATH_ENV: &str = "CRASHMAP_CONFIG";
pub const SNAPSHOT_PATH_ENV: &str = "CRASHMAP_SNAPSHOT";
pub const SHEET_URL_ENV: &str = "CRASHMAP_SHEET_URL";

/// Queries shorter than this (in characters, after trimming) are not executed.
pub const DEFAULT_MIN_QUERY_LEN: usize = 3;

pub fn default_sheet_url() -> String {
    format!(
        "https://docs.google.com/spreadsheets/d/{DEFAULT_SHEET_ID}/export?format=csv&gid={DEFAULT_SHEET_GID}"
    )
}

/// Source column names. The upstream spreadsheet owns these, so none of them
/// is hard-coded outside this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSchema {
    pub longitude_column: String,
    pub latitude_column: String,
    pub id_column: String,
    pub date_column: String,
    pub municipality_column: String,
    pub location_column: String,
    pub description_column: String,
    pub photo_column: String,
    pub photo_caption_column: String,
    pub news_column: String,
    pub deaths_column: String,
    pub injuries_column: String,
}

impl Default for DatasetSchema {
    fn default() -> Self {
        Self {
            longitude_column: "Coorddata.Table3.X".to_string(),
            latitude_column: "Coorddata.Table3.Y".to_string(),
            id_column: "ID".to_string(),
            date_column: "Date (DD/MM/YY)".to_string(),
            municipality_column: "Municipality".to_string(),
            location_column: "Intersection or street block".to_string(),
            description_column: "VZ Tweet Description ( * = Corrected/Edited)".to_string(),
            photo_column: "Photo link".to_string(),
            photo_caption_column: "Photo caption".to_string(),
            news_column: "Example news source".to_string(),
            deaths_column: "Deaths".to_string(),
            injuries_column: "Injuries".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub min_query_len: usize,
    /// Edit-distance tolerance as a fraction of the query term length.
    pub fuzzy: f64,
    pub prefix: bool,
    pub location_boost: f64,
    pub municipality_boost: f64,
    pub description_boost: f64,
    pub max_results: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: DEFAULT_MIN_QUERY_LEN,
            fuzzy: 0.2,
            prefix: true,
            location_boost: 3.0,
            municipality_boost: 2.0,
            description_boost: 1.0,
            max_results: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub snapshot_path: PathBuf,
    pub sheet_url: String,
    pub schema: DatasetSchema,
    pub search: SearchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            sheet_url: default_sheet_url(),
            schema: DatasetSchema::default(),
            search: SearchConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the YAML file named by `CRASHMAP_CONFIG`, then path overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_yaml_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(path) = env::var(SNAPSHOT_PATH_ENV) {
            if !path.trim().is_empty() {
                config.snapshot_path = PathBuf::from(path);
            }
        }
        if let Ok(url) = env::var(SHEET_URL_ENV) {
            if !url.trim().is_empty() {
                config.sheet_url = url;
            }
        }

        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml_str(
            "snapshot_path: out/crashes.json\nschema:\n  longitude_column: X\nsearch:\n  min_query_len: 2\n",
        )
        .expect("yaml should parse");

        assert_eq!(config.snapshot_path, PathBuf::from("out/crashes.json"));
        assert_eq!(config.schema.longitude_column, "X");
        assert_eq!(config.schema.latitude_column, "Coorddata.Table3.Y");
        assert_eq!(config.search.min_query_len, 2);
        assert_eq!(config.search.location_boost, 3.0);
        assert_eq!(config.sheet_url, default_sheet_url());
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(AppConfig::from_yaml_str("  \n").unwrap(), AppConfig::default());
    }

    #[test]
    fn default_sheet_url_exports_csv() {
        let url = default_sheet_url();
        assert!(url.contains(DEFAULT_SHEET_ID));
        assert!(url.contains("format=csv"));
        assert!(url.ends_with(DEFAULT_SHEET_GID));
    }
}
