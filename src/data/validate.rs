use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;

use crate::config::DatasetSchema;
use crate::data::record::{CrashRecord, ValidationTag};

/// Tag coordinate problems on a record. Recomputes from the current coordinates,
/// so running it twice never duplicates or keeps a stale tag.
pub fn validate_coordinates(record: &mut CrashRecord) {
    record.clear_tags();
    match record.coordinates() {
        None => record.push_tag(ValidationTag::MissingCoords),
        Some((longitude, _)) if longitude > 0.0 => record.push_tag(ValidationTag::PositiveLongitude),
        Some(_) => {}
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.count(ValidationSeverity::Error) > 0
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }
}

/// True when `value` is a `YYYY-MM-DD` date, i.e. text order equals date order.
pub fn is_sortable_date(value: &str) -> bool {
    value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Check a loaded snapshot for problems the map would otherwise hide:
/// tags that no longer match the coordinates, untagged sign errors, dates that
/// cannot be range-filtered as text, and repeated identifiers.
pub fn audit_snapshot(records: &[CrashRecord], schema: &DatasetSchema) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut seen_ids: HashMap<String, usize> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        let id = record.text(&schema.id_column).unwrap_or_default();
        let context = if id.is_empty() {
            format!("record[{index}]")
        } else {
            format!("record[{index}] id='{id}'")
        };

        let tagged_missing = record.has_tag(ValidationTag::MissingCoords);
        match record.coordinates() {
            None if !tagged_missing => report.push(
                ValidationSeverity::Error,
                context.clone(),
                "coordinates missing but record is not tagged MISSING_COORDS",
            ),
            Some(_) if tagged_missing => report.push(
                ValidationSeverity::Error,
                context.clone(),
                "record tagged MISSING_COORDS has numeric coordinates",
            ),
            Some((longitude, _))
                if longitude > 0.0 && !record.has_tag(ValidationTag::PositiveLongitude) =>
            {
                report.push(
                    ValidationSeverity::Warning,
                    context.clone(),
                    format!("positive longitude {longitude} without POSITIVE_LONGITUDE tag"),
                )
            }
            _ => {}
        }

        match record.text(&schema.date_column) {
            Some(date) if !date.trim().is_empty() && !is_sortable_date(&date) => report.push(
                ValidationSeverity::Warning,
                format!("{context}.{}", schema.date_column),
                format!("date '{date}' is not YYYY-MM-DD; date range filters compare it as text"),
            ),
            _ => {}
        }

        if !id.is_empty() {
            if let Some(first) = seen_ids.get(&id) {
                report.push(
                    ValidationSeverity::Info,
                    context.clone(),
                    format!("identifier also used by record[{first}]"),
                );
            } else {
                seen_ids.insert(id, index);
            }
        }
    }

    report
}
