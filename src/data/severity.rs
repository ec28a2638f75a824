use crate::config::DatasetSchema;
use crate::data::record::CrashRecord;

/// Set `hasDeaths` / `hasInjuries` from the casualty columns.
/// Absent or non-numeric counts compare as zero.
pub fn annotate_severity(record: &mut CrashRecord, schema: &DatasetSchema) {
    record.has_deaths = is_positive(record.number(&schema.deaths_column));
    record.has_injuries = is_positive(record.number(&schema.injuries_column));
}

fn is_positive(count: Option<f64>) -> bool {
    count.map(|value| value > 0.0).unwrap_or(false)
}
