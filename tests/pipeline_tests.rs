use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crashmap::config::DatasetSchema;
use crashmap::data::{
    csv_to_records, finalize_records, load_snapshot, validate_coordinates, write_snapshot,
    CrashRecord, ValidationTag,
};
use crashmap::geo::{bounds_report, feature_bounds, feature_point, make_feature_collection};
use serde_json::json;

const SAMPLE_CSV: &str = "\
ID,Municipality,Coorddata.Table3.X,Coorddata.Table3.Y,Deaths,Injuries
1,Vancouver,-123.1,49.26,0,2
2,Burnaby,122.98,49.23,1,0

3,Surrey,,,0,0
4,Richmond,-123.13,not a number,0,0
";

fn unique_temp_dir(name: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("crashmap-{name}-{stamp}"))
}

fn sample_records() -> Vec<CrashRecord> {
    csv_to_records(SAMPLE_CSV, &DatasetSchema::default()).expect("sample csv should parse")
}

#[test]
fn quoted_fields_and_numbers_are_parsed() {
    let records = csv_to_records("h1,h2,h3\nA,\"B, with comma\",3\n", &DatasetSchema::default())
        .expect("csv should parse");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].column("h1"), Some(&json!("A")));
    assert_eq!(records[0].column("h2"), Some(&json!("B, with comma")));
    assert_eq!(records[0].column("h3"), Some(&json!(3)));
    assert!(records[0].has_tag(ValidationTag::MissingCoords));
}

#[test]
fn header_only_input_yields_no_records() {
    let records = csv_to_records("ID,Municipality\n", &DatasetSchema::default()).unwrap();
    assert!(records.is_empty());
}

#[test]
fn records_are_tagged_and_flagged() {
    let records = sample_records();
    assert_eq!(records.len(), 4, "blank line is skipped");

    assert!(records[0].is_valid());
    assert!(!records[0].has_deaths);
    assert!(records[0].has_injuries);

    assert_eq!(records[1].validation_errors(), &[ValidationTag::PositiveLongitude]);
    assert!(records[1].has_deaths);

    assert_eq!(records[2].validation_errors(), &[ValidationTag::MissingCoords]);
    assert_eq!(records[2].column("Coorddata.Table3.X"), Some(&json!("")));
    assert_eq!(records[3].validation_errors(), &[ValidationTag::MissingCoords]);
}

#[test]
fn validation_is_idempotent() {
    let mut records = sample_records();
    let before = records.clone();
    finalize_records(&mut records, &DatasetSchema::default());
    for record in &mut records {
        validate_coordinates(record);
    }
    assert_eq!(records, before);
}

#[test]
fn projection_never_emits_positive_longitude() {
    let records = sample_records();
    let collection = make_feature_collection(&records);

    let placeable = records
        .iter()
        .filter(|record| !record.has_tag(ValidationTag::MissingCoords))
        .count();
    assert_eq!(collection.features.len(), placeable);
    for feature in &collection.features {
        let (longitude, _) = feature_point(feature).expect("point geometry");
        assert!(longitude <= 0.0);
    }

    let bounds = feature_bounds(&collection).expect("bounds for non-empty set");
    assert_eq!(bounds.min_lon, -123.1);
    assert_eq!(bounds.max_lon, -122.98);
}

#[test]
fn reprojecting_feature_properties_keeps_longitude_sign() {
    let first = make_feature_collection(&sample_records());
    let rebuilt: Vec<CrashRecord> = first
        .features
        .iter()
        .map(|feature| {
            let properties = feature.properties.clone().expect("feature properties");
            CrashRecord::from_properties(properties).expect("properties rebuild a record")
        })
        .collect();
    let second = make_feature_collection(&rebuilt);

    let points = |collection: &geojson::FeatureCollection| -> Vec<(f64, f64)> {
        collection.features.iter().filter_map(feature_point).collect()
    };
    assert_eq!(points(&first), vec![(-123.1, 49.26), (-122.98, 49.23)]);
    assert_eq!(points(&second), points(&first));
}

#[test]
fn empty_collection_has_no_bounds() {
    let collection = make_feature_collection(&[]);
    assert!(collection.features.is_empty());
    assert!(feature_bounds(&collection).is_none());
}

#[test]
fn bounds_report_lists_outliers() {
    let report = bounds_report(&sample_records(), &DatasetSchema::default());
    assert_eq!(report.total, 4);
    assert_eq!(report.valid, 2);
    assert_eq!(report.outliers.len(), 1);
    assert_eq!(report.outliers[0].id, json!(2));
    assert_eq!(report.outliers[0].municipality, json!("Burnaby"));
}

#[test]
fn snapshot_round_trip_creates_parent_directories() {
    let dir = unique_temp_dir("snapshot");
    let path = dir.join("nested").join("data.json");
    let records = sample_records();

    write_snapshot(&path, &records).expect("snapshot should be written");
    let loaded = load_snapshot(&path).expect("snapshot should load");
    assert_eq!(loaded, records);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw[1]["validationErrors"], json!(["POSITIVE_LONGITUDE"]));
    assert_eq!(raw[1]["hasDeaths"], json!(true));
    assert!(raw[0].get("validationErrors").is_none());

    let _ = std::fs::remove_dir_all(&dir);
}
