//! In-memory full-text index over the descriptive columns.
//!
//! Built once per session from the snapshot. Each entry is keyed by its position in
//! the record list because source identifiers repeat. Scoring per matched term is
//! `match weight × field boost × idf × saturated tf`; query terms are OR-ed.

use std::collections::BTreeMap;
use std::ops::Bound;

use tracing::debug;

use crate::config::{DatasetSchema, SearchConfig};
use crate::data::record::{
    number_value, Columns, CrashRecord, HAS_DEATHS_KEY, HAS_INJURIES_KEY, LATITUDE_KEY,
    LONGITUDE_KEY, VALIDATION_ERRORS_KEY,
};
use crate::search::result::SearchResult;
use crate::search::tokenize::{bounded_edit_distance, tokenize};

const PREFIX_WEIGHT: f64 = 0.375;
const FUZZY_WEIGHT: f64 = 0.45;
const TF_SATURATION: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchField {
    Location,
    Municipality,
    Description,
}

impl SearchField {
    pub const ALL: [SearchField; 3] = [Self::Location, Self::Municipality, Self::Description];

    pub fn boost(&self, config: &SearchConfig) -> f64 {
        match self {
            Self::Location => config.location_boost,
            Self::Municipality => config.municipality_boost,
            Self::Description => config.description_boost,
        }
    }

    pub fn column<'a>(&self, schema: &'a DatasetSchema) -> &'a str {
        match self {
            Self::Location => &schema.location_column,
            Self::Municipality => &schema.municipality_column,
            Self::Description => &schema.description_column,
        }
    }
}

#[derive(Debug, Clone)]
struct Posting {
    key: usize,
    field: SearchField,
    term_frequency: u32,
}

#[derive(Debug, Clone, Default)]
struct TermEntry {
    postings: Vec<Posting>,
    document_count: usize,
}

#[derive(Debug, Clone)]
pub struct SearchIndex {
    config: SearchConfig,
    schema: DatasetSchema,
    stored: Vec<Columns>,
    terms: BTreeMap<String, TermEntry>,
}

impl SearchIndex {
    pub fn build(records: &[CrashRecord], schema: &DatasetSchema, config: &SearchConfig) -> Self {
        let mut terms: BTreeMap<String, TermEntry> = BTreeMap::new();
        let mut stored = Vec::with_capacity(records.len());

        for (key, record) in records.iter().enumerate() {
            for field in SearchField::ALL {
                let text = record.text(field.column(schema)).unwrap_or_default();
                let mut frequencies: BTreeMap<String, u32> = BTreeMap::new();
                for token in tokenize(&text) {
                    *frequencies.entry(token).or_insert(0) += 1;
                }
                for (term, term_frequency) in frequencies {
                    let entry = terms.entry(term).or_default();
                    if entry.postings.last().map(|p| p.key) != Some(key) {
                        entry.document_count += 1;
                    }
                    entry.postings.push(Posting {
                        key,
                        field,
                        term_frequency,
                    });
                }
            }
            stored.push(stored_fields(record, schema));
        }

        debug!(entries = stored.len(), terms = terms.len(), "built search index");
        Self {
            config: config.clone(),
            schema: schema.clone(),
            stored,
            terms,
        }
    }

    pub fn len(&self) -> usize {
        self.stored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn stored(&self, key: usize) -> Option<&Columns> {
        self.stored.get(key)
    }

    /// Whether `query` is long enough to run; shorter queries mean "no search".
    pub fn accepts_query(&self, query: &str) -> bool {
        query.trim().chars().count() >= self.config.min_query_len
    }

    /// Ranked hits: score descending, ties by key ascending.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        if !self.accepts_query(query) {
            return Vec::new();
        }

        let mut scores: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokenize(query) {
            for (term, weight) in self.expand(&token) {
                let Some(entry) = self.terms.get(term) else {
                    continue;
                };
                let idf = inverse_document_frequency(self.len(), entry.document_count);
                for posting in &entry.postings {
                    let tf = f64::from(posting.term_frequency);
                    let saturated = tf * (TF_SATURATION + 1.0) / (tf + TF_SATURATION);
                    *scores.entry(posting.key).or_insert(0.0) +=
                        weight * posting.field.boost(&self.config) * idf * saturated;
                }
            }
        }

        let mut hits: Vec<(usize, f64)> = scores.into_iter().collect();
        hits.sort_by(|left, right| right.1.total_cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
        if let Some(limit) = self.config.max_results {
            hits.truncate(limit);
        }

        hits.into_iter()
            .map(|(key, score)| SearchResult::from_stored(key, score, &self.stored[key], &self.schema))
            .collect()
    }

    /// Index terms matching `token` exactly, by prefix, or within the fuzzy distance,
    /// each with its best match weight.
    fn expand(&self, token: &str) -> BTreeMap<&str, f64> {
        let mut matches: BTreeMap<&str, f64> = BTreeMap::new();
        let token_len = token.chars().count() as f64;

        if let Some((term, _)) = self.terms.get_key_value(token) {
            matches.insert(term.as_str(), 1.0);
        }

        if self.config.prefix {
            for (term, _) in self
                .terms
                .range::<str, _>((Bound::Included(token), Bound::Unbounded))
                .take_while(|(term, _)| term.starts_with(token))
            {
                let extra = term.chars().count() as f64 - token_len;
                if extra <= 0.0 {
                    continue;
                }
                let weight = PREFIX_WEIGHT * token_len / (token_len + 0.3 * extra);
                keep_best(&mut matches, term.as_str(), weight);
            }
        }

        let max_distance = (token_len * self.config.fuzzy).round() as usize;
        if max_distance > 0 {
            for term in self.terms.keys() {
                if let Some(distance) = bounded_edit_distance(token, term, max_distance) {
                    if distance == 0 {
                        continue;
                    }
                    let weight = FUZZY_WEIGHT * token_len / (token_len + distance as f64);
                    keep_best(&mut matches, term.as_str(), weight);
                }
            }
        }

        matches
    }
}

fn keep_best<'a>(matches: &mut BTreeMap<&'a str, f64>, term: &'a str, weight: f64) {
    let slot = matches.entry(term).or_insert(0.0);
    if weight > *slot {
        *slot = weight;
    }
}

fn inverse_document_frequency(total: usize, with_term: usize) -> f64 {
    let total = total as f64;
    let with_term = with_term as f64;
    (1.0 + (total - with_term + 0.5) / (with_term + 0.5)).ln()
}

/// The fixed display field set kept alongside each entry.
fn stored_fields(record: &CrashRecord, schema: &DatasetSchema) -> Columns {
    let mut stored = Columns::new();
    for column in [
        &schema.id_column,
        &schema.date_column,
        &schema.location_column,
        &schema.municipality_column,
        &schema.description_column,
        &schema.photo_column,
    ] {
        if let Some(value) = record.column(column) {
            stored.insert(column.clone(), value.clone());
        }
    }
    stored.insert(LONGITUDE_KEY.to_string(), number_value(record.longitude));
    stored.insert(LATITUDE_KEY.to_string(), number_value(record.latitude));
    stored.insert(HAS_DEATHS_KEY.to_string(), record.has_deaths.into());
    stored.insert(HAS_INJURIES_KEY.to_string(), record.has_injuries.into());
    if !record.is_valid() {
        stored.insert(
            VALIDATION_ERRORS_KEY.to_string(),
            record
                .validation_errors()
                .iter()
                .map(|tag| tag.as_str())
                .collect::<Vec<_>>()
                .into(),
        );
    }
    stored
}
