//! Crash record: a few typed derived fields plus the open set of spreadsheet columns.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::config::DatasetSchema;

/// Ordered column map; key order follows the source header.
pub type Columns = Map<String, Value>;

pub const LONGITUDE_KEY: &str = "longitude";
pub const LATITUDE_KEY: &str = "latitude";
pub const VALIDATION_ERRORS_KEY: &str = "validationErrors";
pub const HAS_DEATHS_KEY: &str = "hasDeaths";
pub const HAS_INJURIES_KEY: &str = "hasInjuries";

const DERIVED_KEYS: [&str; 5] = [
    LONGITUDE_KEY,
    LATITUDE_KEY,
    VALIDATION_ERRORS_KEY,
    HAS_DEATHS_KEY,
    HAS_INJURIES_KEY,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationTag {
    /// Longitude or latitude is not a finite number.
    MissingCoords,
    /// Longitude is positive; for this dataset that is a sign typo.
    PositiveLongitude,
}

impl ValidationTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCoords => "MISSING_COORDS",
            Self::PositiveLongitude => "POSITIVE_LONGITUDE",
        }
    }
}

impl fmt::Display for ValidationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashRecord {
    #[serde(flatten)]
    pub columns: Columns,
    #[serde(default, deserialize_with = "lenient_number")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub latitude: Option<f64>,
    #[serde(
        rename = "validationErrors",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    validation_errors: Vec<ValidationTag>,
    #[serde(rename = "hasDeaths", default)]
    pub has_deaths: bool,
    #[serde(rename = "hasInjuries", default)]
    pub has_injuries: bool,
}

/// Any JSON value that is not a number reads as "no coordinate".
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_f64))
}

impl CrashRecord {
    /// Build a raw record from one parsed row, aliasing the configured X/Y columns.
    pub fn from_columns(mut columns: Columns, schema: &DatasetSchema) -> Self {
        let longitude = columns
            .get(&schema.longitude_column)
            .and_then(Value::as_f64);
        let latitude = columns.get(&schema.latitude_column).and_then(Value::as_f64);
        for key in DERIVED_KEYS {
            columns.shift_remove(key);
        }

        Self {
            columns,
            longitude,
            latitude,
            validation_errors: Vec::new(),
            has_deaths: false,
            has_injuries: false,
        }
    }

    /// Rebuild a record from feature properties or stored index fields.
    pub fn from_properties(properties: Columns) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(properties))
    }

    pub fn validation_errors(&self) -> &[ValidationTag] {
        &self.validation_errors
    }

    pub fn has_tag(&self, tag: ValidationTag) -> bool {
        self.validation_errors.contains(&tag)
    }

    pub fn is_valid(&self) -> bool {
        self.validation_errors.is_empty()
    }

    /// Append a tag unless already present.
    pub fn push_tag(&mut self, tag: ValidationTag) {
        if !self.has_tag(tag) {
            self.validation_errors.push(tag);
        }
    }

    pub fn clear_tags(&mut self) {
        self.validation_errors.clear();
    }

    /// Both coordinates, when both are finite numbers.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) if lon.is_finite() && lat.is_finite() => Some((lon, lat)),
            _ => None,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Value> {
        self.columns.get(name)
    }

    /// Display text of a column; `None` when absent or null.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.columns.get(name)? {
            Value::Null => None,
            value => Some(value_text(value)),
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.columns.get(name).and_then(Value::as_f64)
    }

    /// Flat property map: columns followed by the derived fields.
    pub fn to_properties(&self) -> Columns {
        let mut properties = self.columns.clone();
        properties.insert(LONGITUDE_KEY.to_string(), number_value(self.longitude));
        properties.insert(LATITUDE_KEY.to_string(), number_value(self.latitude));
        if !self.validation_errors.is_empty() {
            properties.insert(
                VALIDATION_ERRORS_KEY.to_string(),
                Value::Array(
                    self.validation_errors
                        .iter()
                        .map(|tag| Value::String(tag.as_str().to_string()))
                        .collect(),
                ),
            );
        }
        properties.insert(HAS_DEATHS_KEY.to_string(), Value::Bool(self.has_deaths));
        properties.insert(HAS_INJURIES_KEY.to_string(), Value::Bool(self.has_injuries));
        properties
    }
}

pub fn number_value(number: Option<f64>) -> Value {
    number
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Render a cell the way a spreadsheet would show it.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}
