//! Offline preparation: fetch the sheet export (or read a local export), convert it
//! to validated records, and write the snapshot the runtime loads.

use std::fs;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::redirect::{Attempt, Policy};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, DatasetSchema};
use crate::data::ingest::is_workbook_path;
use crate::data::record::{CrashRecord, ValidationTag};
use crate::data::{csv_to_records, finalize_records, read_workbook, write_snapshot};
use crate::error::{IngestError, PrepareError};

pub const MAX_REDIRECTS: usize = 10;

/// Summary printed after a successful preparation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrepareReport {
    pub source: String,
    pub output_path: PathBuf,
    pub total_records: usize,
    pub missing_coords: usize,
    pub positive_longitude: usize,
    pub with_deaths: usize,
    pub with_injuries: usize,
}

impl PrepareReport {
    pub fn from_records(source: impl Into<String>, output_path: &Path, records: &[CrashRecord]) -> Self {
        Self {
            source: source.into(),
            output_path: output_path.to_path_buf(),
            total_records: records.len(),
            missing_coords: count_where(records, |r| r.has_tag(ValidationTag::MissingCoords)),
            positive_longitude: count_where(records, |r| r.has_tag(ValidationTag::PositiveLongitude)),
            with_deaths: count_where(records, |r| r.has_deaths),
            with_injuries: count_where(records, |r| r.has_injuries),
        }
    }
}

fn count_where(records: &[CrashRecord], predicate: impl Fn(&CrashRecord) -> bool) -> usize {
    records.iter().filter(|record| predicate(record)).count()
}

fn follow_redirect(attempt: Attempt) -> reqwest::redirect::Action {
    if attempt.previous().len() >= MAX_REDIRECTS {
        warn!(url = %attempt.url(), "too many redirects");
        return attempt.error("too many redirects");
    }
    info!(status = attempt.status().as_u16(), url = %attempt.url(), "redirecting");
    attempt.follow()
}

pub fn http_client() -> Result<Client, PrepareError> {
    Client::builder()
        .redirect(Policy::custom(follow_redirect))
        .build()
        .map_err(PrepareError::Client)
}

/// Download the CSV export body. Anything but `200 OK` after redirects is an error.
pub async fn download_sheet(client: &Client, url: &str) -> Result<String, PrepareError> {
    info!(url, "downloading sheet");
    let response = client.get(url).send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(PrepareError::Status(status.as_u16()));
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk?);
    }
    debug!(bytes = body.len(), "download finished");
    Ok(String::from_utf8(body)?)
}

/// CSV text to snapshot records. Input that yields no rows is an error here, so a
/// broken export never replaces a good snapshot.
pub fn convert_csv(text: &str, schema: &DatasetSchema) -> Result<Vec<CrashRecord>, IngestError> {
    let records = csv_to_records(text, schema)?;
    if records.is_empty() {
        return Err(IngestError::NoRows);
    }
    Ok(records)
}

/// Records from a local `.csv` or workbook export.
pub fn convert_file(path: &Path, schema: &DatasetSchema) -> Result<Vec<CrashRecord>, PrepareError> {
    if is_workbook_path(path) {
        let mut records = read_workbook(path, None, schema)?;
        if records.is_empty() {
            return Err(IngestError::NoRows.into());
        }
        finalize_records(&mut records, schema);
        return Ok(records);
    }

    let text = fs::read_to_string(path).map_err(|source| PrepareError::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(convert_csv(&text, schema)?)
}

/// Download the configured sheet and write the snapshot.
pub async fn prepare_snapshot(config: &AppConfig) -> Result<PrepareReport, PrepareError> {
    let client = http_client()?;
    let text = download_sheet(&client, &config.sheet_url).await?;
    let records = convert_csv(&text, &config.schema)?;
    write_snapshot(&config.snapshot_path, &records)?;
    Ok(PrepareReport::from_records(
        config.sheet_url.clone(),
        &config.snapshot_path,
        &records,
    ))
}

/// Convert a local export and write the snapshot to `output`.
pub fn prepare_from_file(
    input: &Path,
    output: &Path,
    schema: &DatasetSchema,
) -> Result<PrepareReport, PrepareError> {
    let records = convert_file(input, schema)?;
    write_snapshot(output, &records)?;
    Ok(PrepareReport::from_records(
        input.display().to_string(),
        output,
        &records,
    ))
}
