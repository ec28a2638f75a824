use geojson::FeatureCollection;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::config::DatasetSchema;
use crate::data::record::CrashRecord;
use crate::geo::projector::feature_point;

/// Axis-aligned lon/lat box, serialized as `[minLon, minLat, maxLon, maxLat]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut bounds: Option<Bounds> = None;
        for (lon, lat) in points {
            if !lon.is_finite() || !lat.is_finite() {
                continue;
            }
            bounds = Some(match bounds {
                None => Bounds {
                    min_lon: lon,
                    min_lat: lat,
                    max_lon: lon,
                    max_lat: lat,
                },
                Some(b) => Bounds {
                    min_lon: b.min_lon.min(lon),
                    min_lat: b.min_lat.min(lat),
                    max_lon: b.max_lon.max(lon),
                    max_lat: b.max_lat.max(lat),
                },
            });
        }
        bounds
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}

impl Serialize for Bounds {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_array().serialize(serializer)
    }
}

/// Bounding box of a feature collection's points.
/// An empty collection has no bounds; callers skip fitting instead of failing.
pub fn feature_bounds(collection: &FeatureCollection) -> Option<Bounds> {
    let bounds = Bounds::from_points(collection.features.iter().filter_map(feature_point));
    if bounds.is_none() {
        warn!(features = collection.features.len(), "no bounds available");
    }
    bounds
}

#[derive(Debug, Clone, Serialize)]
pub struct Outlier {
    pub id: Value,
    pub longitude: f64,
    pub latitude: f64,
    pub municipality: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoundsReport {
    pub total: usize,
    pub valid: usize,
    pub outliers: Vec<Outlier>,
    pub bounds: Option<Bounds>,
}

/// Diagnostic pass over raw snapshot coordinates (no sign correction applied):
/// how many records are placeable, which still carry a positive longitude,
/// and the box the valid points span.
pub fn bounds_report(records: &[CrashRecord], schema: &DatasetSchema) -> BoundsReport {
    let valid: Vec<(&CrashRecord, (f64, f64))> = records
        .iter()
        .filter_map(|record| record.coordinates().map(|point| (record, point)))
        .collect();

    let outliers = valid
        .iter()
        .filter(|(_, (longitude, _))| *longitude > 0.0)
        .map(|(record, (longitude, latitude))| Outlier {
            id: record.column(&schema.id_column).cloned().unwrap_or(Value::Null),
            longitude: *longitude,
            latitude: *latitude,
            municipality: record
                .column(&schema.municipality_column)
                .cloned()
                .unwrap_or(Value::Null),
        })
        .collect();

    BoundsReport {
        total: records.len(),
        valid: valid.len(),
        outliers,
        bounds: Bounds::from_points(valid.iter().map(|(_, point)| *point)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::geo::projector::make_feature_collection;

    #[test]
    fn empty_collection_has_no_bounds() {
        let collection = make_feature_collection(&[]);
        assert!(feature_bounds(&collection).is_none());
    }

    #[test]
    fn bounds_span_all_points() {
        let bounds = Bounds::from_points(vec![(-123.2, 49.1), (-122.8, 49.3), (f64::NAN, 0.0)])
            .expect("bounds");
        assert_eq!(bounds.as_array(), [-123.2, 49.1, -122.8, 49.3]);
        assert_eq!(serde_json::to_value(bounds).unwrap(), json!([-123.2, 49.1, -122.8, 49.3]));
    }

    #[test]
    fn report_counts_and_outliers() {
        let records: Vec<CrashRecord> = vec![
            json!({"ID": 1, "Municipality": "Vancouver", "longitude": -123.1, "latitude": 49.2}),
            json!({"ID": 2, "Municipality": "Surrey", "longitude": 122.8, "latitude": 49.1}),
            json!({"ID": 3, "longitude": "", "latitude": ""}),
        ]
        .into_iter()
        .map(|value| serde_json::from_value(value).unwrap())
        .collect();

        let report = bounds_report(&records, &DatasetSchema::default());
        assert_eq!(report.total, 3);
        assert_eq!(report.valid, 2);
        assert_eq!(report.outliers.len(), 1);
        assert_eq!(report.outliers[0].id, json!(2));
        assert_eq!(report.outliers[0].municipality, json!("Surrey"));
        assert_eq!(report.bounds.unwrap().as_array(), [-123.1, 49.1, 122.8, 49.2]);
    }
}
