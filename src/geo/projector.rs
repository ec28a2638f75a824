//! Validated records → GeoJSON point features.
//!
//! Records tagged `MISSING_COORDS` (or without finite coordinates) are left out;
//! every other record yields exactly one feature whose longitude is never positive.
//! Inputs are only borrowed: projection builds new features and never touches records.

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoValue};
use serde_json::{Number, Value};
use tracing::debug;

use crate::data::record::{CrashRecord, ValidationTag, LONGITUDE_KEY};

/// Longitude to draw for a record, or `None` when it cannot be placed.
///
/// The `POSITIVE_LONGITUDE` tag is the primary signal. A positive value without
/// the tag (a record that skipped validation) is negated as well.
pub fn corrected_longitude(record: &CrashRecord) -> Option<f64> {
    if record.has_tag(ValidationTag::MissingCoords) {
        return None;
    }
    let (longitude, _) = record.coordinates()?;

    if record.has_tag(ValidationTag::PositiveLongitude) {
        Some(-longitude.abs())
    } else if longitude > 0.0 {
        debug!(longitude, "negating untagged positive longitude");
        Some(-longitude)
    } else {
        Some(longitude)
    }
}

/// One feature for `record`; `key` becomes the feature id so a clicked feature
/// can be traced back to its record.
pub fn project_record(key: usize, record: &CrashRecord) -> Option<Feature> {
    let longitude = corrected_longitude(record)?;
    let (_, latitude) = record.coordinates()?;

    let mut properties = record.to_properties();
    if let Some(number) = Number::from_f64(longitude) {
        properties.insert(LONGITUDE_KEY.to_string(), Value::Number(number));
    }

    Some(Feature {
        bbox: None,
        geometry: Some(Geometry::new(GeoValue::Point(vec![longitude, latitude]))),
        id: Some(Id::Number(Number::from(key))),
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Project `(key, record)` pairs, e.g. a filtered subset that keeps original positions.
pub fn project_keyed<'a, I>(records: I) -> FeatureCollection
where
    I: IntoIterator<Item = (usize, &'a CrashRecord)>,
{
    FeatureCollection {
        bbox: None,
        features: records
            .into_iter()
            .filter_map(|(key, record)| project_record(key, record))
            .collect(),
        foreign_members: None,
    }
}

pub fn make_feature_collection(records: &[CrashRecord]) -> FeatureCollection {
    project_keyed(records.iter().enumerate())
}

/// Record position carried in a projected feature's id.
pub fn feature_key(feature: &Feature) -> Option<usize> {
    match feature.id.as_ref()? {
        Id::Number(number) => number.as_u64().and_then(|key| usize::try_from(key).ok()),
        Id::String(text) => text.parse().ok(),
    }
}

pub fn feature_point(feature: &Feature) -> Option<(f64, f64)> {
    match &feature.geometry.as_ref()?.value {
        GeoValue::Point(position) if position.len() >= 2 => Some((position[0], position[1])),
        _ => None,
    }
}
