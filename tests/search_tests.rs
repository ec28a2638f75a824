use crashmap::config::{DatasetSchema, SearchConfig};
use crashmap::data::{csv_to_records, CrashRecord};
use crashmap::search::SearchIndex;
use serde_json::json;

const CRASHES: &str = "\
ID,Date (DD/MM/YY),Intersection or street block,Municipality,VZ Tweet Description ( * = Corrected/Edited),Photo link,Coorddata.Table3.X,Coorddata.Table3.Y
10,2021-03-04,Main St & E 12th Ave,Vancouver,Cyclist struck,https://example.org/1.jpg,-123.101,49.260
11,2021-05-10,Kingsway & Knight St,Vancouver,Crash reported near Main,n/a,-123.076,49.250
12,2022-01-15,Kingsway & Edmonds St,Burnaby,Pedestrian hit on Kingsway,,-122.960,49.220
12,2022-02-01,Kingsway & Royal Oak,Burnaby,Rear-end collision,,-122.990,49.225
";

fn records() -> Vec<CrashRecord> {
    csv_to_records(CRASHES, &DatasetSchema::default()).expect("fixture should parse")
}

fn index_with(config: SearchConfig) -> SearchIndex {
    SearchIndex::build(&records(), &DatasetSchema::default(), &config)
}

fn index() -> SearchIndex {
    index_with(SearchConfig::default())
}

#[test]
fn short_queries_return_nothing() {
    let index = index();
    assert!(index.search("ma").is_empty());
    assert!(index.search("  ab  ").is_empty());
    assert!(!index.accepts_query("ab"));
    assert!(index.accepts_query("abc"));
}

#[test]
fn location_match_outranks_description_match() {
    let results = index().search("main");
    let keys: Vec<usize> = results.iter().map(|result| result.key).collect();
    assert_eq!(keys, vec![0, 1]);
    assert!(results[0].score > results[1].score);
}

#[test]
fn results_are_display_ready() {
    let results = index().search("main");
    let top = &results[0];
    assert_eq!(top.id, json!(10));
    assert_eq!(top.date, "2021-03-04");
    assert_eq!(top.location, "Main St & E 12th Ave, Vancouver");
    assert_eq!(top.municipality, "Vancouver");
    assert_eq!(top.description, "Cyclist struck");
    assert_eq!(top.thumbnail.as_deref(), Some("https://example.org/1.jpg"));
    assert_eq!(top.original_data["longitude"], json!(-123.101));
    assert!(results[1].thumbnail.is_none(), "n/a is not a thumbnail");
}

#[test]
fn duplicate_ids_keep_distinct_keys() {
    let results = index().search("kingsway");
    let mut keys: Vec<usize> = results.iter().map(|result| result.key).collect();
    assert_eq!(results.len(), 3);
    keys.sort_unstable();
    assert_eq!(keys, vec![1, 2, 3]);

    let ids: Vec<_> = results
        .iter()
        .filter(|result| result.id == json!(12))
        .map(|result| result.key)
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert_eq!(results[0].key, 2, "location and description both match");
}

#[test]
fn prefix_and_fuzzy_terms_match() {
    let index = index();
    let prefix: Vec<usize> = index.search("kings").iter().map(|result| result.key).collect();
    assert_eq!(prefix.len(), 3);

    let fuzzy: Vec<usize> = index.search("kingsvay").iter().map(|result| result.key).collect();
    assert_eq!(fuzzy.len(), 3);

    assert!(index.search("zzzzzz").is_empty());
}

#[test]
fn prefix_matching_can_be_disabled() {
    let index = index_with(SearchConfig {
        prefix: false,
        fuzzy: 0.0,
        ..SearchConfig::default()
    });
    assert!(index.search("kings").is_empty());
    assert_eq!(index.search("kingsway").len(), 3);
}

#[test]
fn max_results_truncates_ranked_hits() {
    let index = index_with(SearchConfig {
        max_results: Some(1),
        ..SearchConfig::default()
    });
    let results = index.search("kingsway");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].key, 2);
}

#[test]
fn ties_break_by_key() {
    let results = index().search("burnaby");
    let keys: Vec<usize> = results.iter().map(|result| result.key).collect();
    assert_eq!(keys, vec![2, 3]);
    assert_eq!(results[0].score, results[1].score);
}

#[test]
fn location_match_outranks_municipality_match() {
    let csv = "\
ID,Intersection or street block,Municipality,VZ Tweet Description ( * = Corrected/Edited)
20,King George Blvd & 88 Ave,Surrey,Cyclist struck
21,Surrey Rd & 200 St,Langley,Rear-end collision
";
    let records = csv_to_records(csv, &DatasetSchema::default()).expect("fixture should parse");
    let index = SearchIndex::build(&records, &DatasetSchema::default(), &SearchConfig::default());

    let results = index.search("surrey");
    let keys: Vec<usize> = results.iter().map(|result| result.key).collect();
    assert_eq!(keys, vec![1, 0]);
    assert!(results[0].score > results[1].score);
    assert!(index.search("su").is_empty());
}
