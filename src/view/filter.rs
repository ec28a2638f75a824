//! Municipality / severity / date-range filtering of the loaded records.
//!
//! Date bounds compare as text against the stored date column, so they are only
//! correct for `YYYY-MM-DD` values. `validate` rejects unsortable bounds; unsortable
//! record dates are reported by the snapshot audit rather than rewritten here.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::DatasetSchema;
use crate::data::record::CrashRecord;
use crate::data::validate::is_sortable_date;
use crate::error::FilterError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityFilter {
    #[default]
    All,
    Deaths,
    Injuries,
}

impl SeverityFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Some(Self::All),
            "deaths" | "has-deaths" | "fatal" => Some(Self::Deaths),
            "injuries" | "has-injuries" | "injury" => Some(Self::Injuries),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Deaths => "deaths",
            Self::Injuries => "injuries",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    /// `None` means every municipality.
    pub municipality: Option<String>,
    pub severity: SeverityFilter,
    /// Inclusive lower bound, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`.
    pub end_date: Option<String>,
}

impl FilterState {
    pub fn is_modified(&self) -> bool {
        self.municipality().is_some()
            || self.severity != SeverityFilter::All
            || self.start_date().is_some()
            || self.end_date().is_some()
    }

    /// Active municipality; "All" and blank count as no filter.
    pub fn municipality(&self) -> Option<&str> {
        self.municipality
            .as_deref()
            .filter(|name| !name.trim().is_empty() && !name.eq_ignore_ascii_case("all"))
    }

    pub fn start_date(&self) -> Option<&str> {
        active_bound(self.start_date.as_deref())
    }

    pub fn end_date(&self) -> Option<&str> {
        active_bound(self.end_date.as_deref())
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        for (field, bound) in [("start_date", self.start_date()), ("end_date", self.end_date())] {
            if let Some(value) = bound {
                if !is_sortable_date(value) {
                    return Err(FilterError::UnsortableDate {
                        field,
                        value: value.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn matches(&self, record: &CrashRecord, schema: &DatasetSchema) -> bool {
        if let Some(municipality) = self.municipality() {
            if record.text(&schema.municipality_column).as_deref() != Some(municipality) {
                return false;
            }
        }

        match self.severity {
            SeverityFilter::Deaths if !record.has_deaths => return false,
            SeverityFilter::Injuries if !record.has_injuries => return false,
            _ => {}
        }

        let (start, end) = (self.start_date(), self.end_date());
        if start.is_some() || end.is_some() {
            let Some(date) = record.text(&schema.date_column) else {
                return false;
            };
            if start.is_some_and(|start| date.as_str() < start) {
                return false;
            }
            if end.is_some_and(|end| date.as_str() > end) {
                return false;
            }
        }

        true
    }

    /// Matching records with their positions in `records`.
    pub fn apply<'a>(
        &self,
        records: &'a [CrashRecord],
        schema: &DatasetSchema,
    ) -> Vec<(usize, &'a CrashRecord)> {
        records
            .iter()
            .enumerate()
            .filter(|(_, record)| self.matches(record, schema))
            .collect()
    }
}

fn active_bound(bound: Option<&str>) -> Option<&str> {
    bound.map(str::trim).filter(|value| !value.is_empty())
}

/// Sorted distinct municipality names for the picker.
pub fn municipalities(records: &[CrashRecord], schema: &DatasetSchema) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| record.text(&schema.municipality_column))
        .filter(|name| !name.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: serde_json::Value) -> CrashRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn start_date_is_inclusive() {
        let schema = DatasetSchema::default();
        let filters = FilterState {
            start_date: Some("2020-01-01".to_string()),
            ..FilterState::default()
        };
        assert!(!filters.matches(&record(json!({"Date (DD/MM/YY)": "2019-12-31"})), &schema));
        assert!(filters.matches(&record(json!({"Date (DD/MM/YY)": "2020-01-01"})), &schema));
        assert!(!filters.matches(&record(json!({})), &schema));
    }

    #[test]
    fn all_and_blank_are_inactive() {
        let filters = FilterState {
            municipality: Some("All".to_string()),
            start_date: Some(String::new()),
            ..FilterState::default()
        };
        assert!(!filters.is_modified());
        assert!(filters.matches(&record(json!({"Municipality": "Surrey"})), &DatasetSchema::default()));
    }

    #[test]
    fn validate_rejects_unsortable_bounds() {
        let filters = FilterState {
            end_date: Some("31/12/20".to_string()),
            ..FilterState::default()
        };
        assert_eq!(
            filters.validate(),
            Err(FilterError::UnsortableDate {
                field: "end_date",
                value: "31/12/20".to_string()
            })
        );
    }

    #[test]
    fn severity_parse() {
        assert_eq!(SeverityFilter::parse("has-deaths"), Some(SeverityFilter::Deaths));
        assert_eq!(SeverityFilter::parse("Injuries"), Some(SeverityFilter::Injuries));
        assert_eq!(SeverityFilter::parse("minor"), None);
    }

    #[test]
    fn municipality_list_is_sorted_and_unique() {
        let records = vec![
            record(json!({"Municipality": "Vancouver"})),
            record(json!({"Municipality": "Burnaby"})),
            record(json!({"Municipality": "Vancouver"})),
            record(json!({"Municipality": ""})),
        ];
        assert_eq!(
            municipalities(&records, &DatasetSchema::default()),
            vec!["Burnaby".to_string(), "Vancouver".to_string()]
        );
    }
}
