//! Offline data pipeline: ingestion → coordinate validation → severity flags → snapshot.

pub mod ingest;
pub mod record;
pub mod severity;
pub mod snapshot;
pub mod validate;

pub use ingest::{coerce_field, parse_csv, read_workbook};
pub use record::{value_text, Columns, CrashRecord, ValidationTag};
pub use severity::annotate_severity;
pub use snapshot::{load_snapshot, write_snapshot};
pub use validate::{audit_snapshot, validate_coordinates, ValidationReport, ValidationSeverity};

use crate::config::DatasetSchema;
use crate::error::IngestError;

/// Validate and annotate raw records in place, turning them into snapshot records.
pub fn finalize_records(records: &mut [CrashRecord], schema: &DatasetSchema) {
    for record in records.iter_mut() {
        validate_coordinates(record);
        annotate_severity(record, schema);
    }
}

/// CSV text straight to snapshot records.
pub fn csv_to_records(text: &str, schema: &DatasetSchema) -> Result<Vec<CrashRecord>, IngestError> {
    let mut records = parse_csv(text, schema)?;
    finalize_records(&mut records, schema);
    Ok(records)
}
