use serde::Serialize;
use serde_json::{Number, Value};

use crate::config::DatasetSchema;
use crate::data::record::{value_text, Columns, LATITUDE_KEY, LONGITUDE_KEY};

/// Display-ready search hit. `original_data` is the stored field set, so a result
/// renders (and can be selected) without looking the record up again.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Positional index key, unique per entry even when `id` repeats.
    pub key: usize,
    pub id: Value,
    pub date: String,
    pub location: String,
    pub municipality: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub score: f64,
    pub original_data: Columns,
}

impl SearchResult {
    pub fn from_stored(key: usize, score: f64, stored: &Columns, schema: &DatasetSchema) -> Self {
        let text = |column: &str| stored.get(column).map(value_text).unwrap_or_default();

        let location = text(&schema.location_column);
        let municipality = text(&schema.municipality_column);
        let composed = [location.trim(), municipality.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        let mut original_data = stored.clone();
        for key in [LONGITUDE_KEY, LATITUDE_KEY] {
            if let Some(value) = original_data.get_mut(key) {
                *value = recoerce_number(value);
            }
        }

        Self {
            key,
            id: stored.get(&schema.id_column).cloned().unwrap_or(Value::Null),
            date: text(&schema.date_column),
            location: composed,
            municipality,
            description: text(&schema.description_column),
            thumbnail: photo_link(stored.get(&schema.photo_column)),
            score,
            original_data,
        }
    }
}

/// Numeric text back to a JSON number; anything else unchanged.
pub fn recoerce_number(value: &Value) -> Value {
    match value {
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

/// The photo column when it holds a real link (not blank, not `n/a`).
pub fn photo_link(value: Option<&Value>) -> Option<String> {
    let link = value_text(value?);
    let trimmed = link.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
        None
    } else {
        Some(trimmed.to_string())
    }
}
