//! Explicit application state owned by the rendering layer.
//!
//! Every mutation recomputes the derived views it affects before returning, so the
//! latest call always wins and readers never see a half-updated state.

use geojson::{Feature, FeatureCollection};
use tracing::debug;

use crate::config::{AppConfig, DatasetSchema};
use crate::data::record::CrashRecord;
use crate::data::snapshot::load_snapshot;
use crate::error::{FilterError, SnapshotError};
use crate::geo::bounds::{feature_bounds, Bounds};
use crate::geo::projector::{corrected_longitude, feature_key, project_keyed};
use crate::search::{SearchIndex, SearchResult};
use crate::view::details::DetailsView;
use crate::view::filter::{municipalities, FilterState};
use crate::view::map::{
    center_on, cluster_expansion_zoom, cluster_features, fit_bounds, Camera, Cluster,
    ClusterOptions, MapMarker, FIT_PADDING, INITIAL_CAMERA, SELECTION_LEFT_PADDING,
};

pub const DEFAULT_VIEWPORT: (f64, f64) = (1280.0, 800.0);

/// Cluster clicks zoom slightly past the split level.
const EXPANSION_ZOOM_FACTOR: f64 = 1.2;

#[derive(Debug, Clone)]
pub struct AppState {
    records: Vec<CrashRecord>,
    schema: DatasetSchema,
    index: SearchIndex,
    cluster_options: ClusterOptions,
    viewport: (f64, f64),
    filters: FilterState,
    query: String,
    selected: Option<usize>,
    camera: Camera,
    visible: FeatureCollection,
    bounds: Option<Bounds>,
    results: Vec<SearchResult>,
}

impl AppState {
    pub fn new(records: Vec<CrashRecord>, config: &AppConfig) -> Self {
        let index = SearchIndex::build(&records, &config.schema, &config.search);
        let mut state = Self {
            records,
            schema: config.schema.clone(),
            index,
            cluster_options: ClusterOptions::default(),
            viewport: DEFAULT_VIEWPORT,
            filters: FilterState::default(),
            query: String::new(),
            selected: None,
            camera: INITIAL_CAMERA,
            visible: FeatureCollection {
                bbox: None,
                features: Vec::new(),
                foreign_members: None,
            },
            bounds: None,
            results: Vec::new(),
        };
        state.refresh_features();
        state
    }

    /// Load the snapshot named by `config` and build the session state from it.
    pub fn load(config: &AppConfig) -> Result<Self, SnapshotError> {
        let records = load_snapshot(&config.snapshot_path)?;
        Ok(Self::new(records, config))
    }

    pub fn records(&self) -> &[CrashRecord] {
        &self.records
    }

    pub fn record(&self, key: usize) -> Option<&CrashRecord> {
        self.records.get(key)
    }

    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn visible_features(&self) -> &FeatureCollection {
        &self.visible
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Search hits that also pass the active filters.
    pub fn search_results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn municipalities(&self) -> Vec<String> {
        municipalities(&self.records, &self.schema)
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
    }

    /// Replace the filters. Invalid date bounds leave the state untouched.
    pub fn set_filters(&mut self, filters: FilterState) -> Result<(), FilterError> {
        filters.validate()?;
        self.filters = filters;
        self.refresh_features();
        self.refresh_results();
        Ok(())
    }

    pub fn update_filters<F>(&mut self, update: F) -> Result<(), FilterError>
    where
        F: FnOnce(&mut FilterState),
    {
        let mut filters = self.filters.clone();
        update(&mut filters);
        self.set_filters(filters)
    }

    pub fn reset_filters(&mut self) {
        self.filters = FilterState::default();
        self.refresh_features();
        self.refresh_results();
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.refresh_results();
    }

    /// Select a record by key and center the camera on it. Unknown keys are ignored.
    pub fn select(&mut self, key: usize) -> bool {
        let Some(record) = self.records.get(key) else {
            return false;
        };
        if let (Some(longitude), Some((_, latitude))) =
            (corrected_longitude(record), record.coordinates())
        {
            self.camera = center_on(longitude, latitude, self.camera.zoom, SELECTION_LEFT_PADDING);
        }
        self.selected = Some(key);
        debug!(key, "selected record");
        true
    }

    pub fn select_search_result(&mut self, result: &SearchResult) -> bool {
        self.select(result.key)
    }

    pub fn select_feature(&mut self, feature: &Feature) -> bool {
        feature_key(feature).is_some_and(|key| self.select(key))
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_key(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected(&self) -> Option<&CrashRecord> {
        self.selected.and_then(|key| self.records.get(key))
    }

    pub fn selected_details(&self) -> Option<DetailsView> {
        self.selected()
            .map(|record| DetailsView::from_record(record, &self.schema))
    }

    /// Markers for the visible features at the current camera zoom.
    pub fn clusters(&self) -> Vec<MapMarker> {
        self.clusters_at(self.camera.zoom)
    }

    pub fn clusters_at(&self, zoom: f64) -> Vec<MapMarker> {
        cluster_features(&self.visible, zoom, &self.cluster_options)
    }

    /// Zoom into a clicked cluster, past the level where it splits.
    pub fn expand_cluster(&mut self, cluster: &Cluster) -> Camera {
        let zoom = cluster_expansion_zoom(&self.visible, cluster, self.camera.zoom, &self.cluster_options);
        self.camera = Camera {
            longitude: cluster.longitude,
            latitude: cluster.latitude,
            zoom: f64::from(zoom) * EXPANSION_ZOOM_FACTOR,
        };
        self.camera
    }

    /// Fit the camera to the visible features; without bounds the camera stays put.
    pub fn reset_view(&mut self) -> Camera {
        if let Some(bounds) = &self.bounds {
            self.camera = fit_bounds(bounds, self.viewport.0, self.viewport.1, FIT_PADDING);
        }
        self.camera
    }

    fn refresh_features(&mut self) {
        self.visible = project_keyed(self.filters.apply(&self.records, &self.schema));
        self.bounds = feature_bounds(&self.visible);
        self.reset_view();
        debug!(
            visible = self.visible.features.len(),
            total = self.records.len(),
            "recomputed visible features"
        );
    }

    fn refresh_results(&mut self) {
        let filters = &self.filters;
        let records = &self.records;
        let schema = &self.schema;
        self.results = self
            .index
            .search(&self.query)
            .into_iter()
            .filter(|result| {
                records
                    .get(result.key)
                    .is_some_and(|record| filters.matches(record, schema))
            })
            .collect();
    }
}
