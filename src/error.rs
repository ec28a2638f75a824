//! Error types for the offline pipeline and the snapshot store.
//!
//! Data-quality problems are never errors here: they are recorded as
//! validation tags on the record (see `data::record::ValidationTag`).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("workbook has no sheet named '{0}'")]
    MissingSheet(String),
    #[error("input contained no data rows")]
    NoRows,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse snapshot '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize snapshot: {0}")]
    Serialize(serde_json::Error),
    #[error("failed to write snapshot '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("error downloading file: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to download sheet, status code: {0}")]
    Status(u16),
    #[error("downloaded sheet is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("failed to read input file '{path}': {source}")]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("{field} '{value}' is not a YYYY-MM-DD date")]
    UnsortableDate { field: &'static str, value: String },
}
