//! Map rendering model: point styling, clustering per zoom level, and camera targets.
//! Everything here is pixel-agnostic data a map widget draws from.

use std::collections::HashMap;
use std::f64::consts::PI;

use geojson::FeatureCollection;
use serde::Serialize;
use serde_json::Value;

use crate::data::record::{HAS_DEATHS_KEY, HAS_INJURIES_KEY};
use crate::geo::bounds::Bounds;
use crate::geo::projector::{feature_key, feature_point};

const MAX_LATITUDE: f64 = 85.051_128_779_806_59;
const MAX_FIT_ZOOM: f64 = 16.0;

/// Padding around fitted bounds, in pixels.
pub const FIT_PADDING: f64 = 100.0;
/// Left inset kept free for the details panel when centering on a selection.
pub const SELECTION_LEFT_PADDING: f64 = 400.0;

pub const INITIAL_CAMERA: Camera = Camera {
    longitude: -123.0,
    latitude: 49.2,
    zoom: 10.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityClass {
    Fatal,
    Injury,
    NoInjury,
}

impl SeverityClass {
    pub fn from_flags(has_deaths: bool, has_injuries: bool) -> Self {
        if has_deaths {
            Self::Fatal
        } else if has_injuries {
            Self::Injury
        } else {
            Self::NoInjury
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Fatal => "#d32f2f",
            Self::Injury => "#fbc02d",
            Self::NoInjury => "#388e3c",
        }
    }
}

pub fn cluster_color(count: usize) -> &'static str {
    match count {
        0..=24 => "#42a5f5",
        25..=49 => "#1e88e5",
        50..=99 => "#1565c0",
        _ => "#0d47a1",
    }
}

/// Cluster circle radius: linear through (1, 20), (100, 40), (1000, 60), clamped.
pub fn cluster_radius(count: usize) -> f64 {
    const STOPS: [(f64, f64); 3] = [(1.0, 20.0), (100.0, 40.0), (1000.0, 60.0)];
    let count = count as f64;
    if count <= STOPS[0].0 {
        return STOPS[0].1;
    }
    for pair in STOPS.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        if count <= x1 {
            return y0 + (count - x0) / (x1 - x0) * (y1 - y0);
        }
    }
    STOPS[STOPS.len() - 1].1
}

/// Short label for a cluster size: `999`, `1.2k`, `12k`.
pub fn abbreviate_count(count: usize) -> String {
    if count >= 10_000 {
        format!("{}k", (count as f64 / 1000.0).round())
    } else if count >= 1000 {
        format!("{}k", (count as f64 / 100.0).round() / 10.0)
    } else {
        count.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOptions {
    /// Cluster radius in pixels.
    pub radius: f64,
    /// Above this zoom every point is drawn on its own.
    pub max_zoom: u8,
    pub tile_size: f64,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            radius: 50.0,
            max_zoom: 14,
            tile_size: 512.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub longitude: f64,
    pub latitude: f64,
    pub count: usize,
    /// Record keys of the clustered features, ascending.
    pub members: Vec<usize>,
}

impl Cluster {
    pub fn label(&self) -> String {
        abbreviate_count(self.count)
    }

    pub fn color(&self) -> &'static str {
        cluster_color(self.count)
    }

    pub fn radius(&self) -> f64 {
        cluster_radius(self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointMarker {
    pub key: usize,
    pub longitude: f64,
    pub latitude: f64,
    pub severity: SeverityClass,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapMarker {
    Cluster(Cluster),
    Point(PointMarker),
}

impl MapMarker {
    pub fn count(&self) -> usize {
        match self {
            Self::Cluster(cluster) => cluster.count,
            Self::Point(_) => 1,
        }
    }
}

/// Web-mercator pixel position at a world size of `world` pixels.
fn project(longitude: f64, latitude: f64, world: f64) -> (f64, f64) {
    let lat = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (longitude + 180.0) / 360.0 * world;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * world;
    (x, y)
}

fn unproject(x: f64, y: f64, world: f64) -> (f64, f64) {
    let longitude = x / world * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / world;
    let latitude = n.sinh().atan().to_degrees();
    (longitude, latitude)
}

fn world_size(zoom: f64, options: &ClusterOptions) -> f64 {
    options.tile_size * 2f64.powf(zoom)
}

fn point_markers(collection: &FeatureCollection) -> Vec<PointMarker> {
    collection
        .features
        .iter()
        .filter_map(|feature| {
            let key = feature_key(feature)?;
            let (longitude, latitude) = feature_point(feature)?;
            let flag = |name: &str| {
                feature
                    .properties
                    .as_ref()
                    .and_then(|properties| properties.get(name))
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            };
            Some(PointMarker {
                key,
                longitude,
                latitude,
                severity: SeverityClass::from_flags(flag(HAS_DEATHS_KEY), flag(HAS_INJURIES_KEY)),
            })
        })
        .collect()
}

/// Group points closer than `options.radius` pixels at `zoom`.
/// Greedy in input order; every input point ends up in exactly one marker.
pub fn cluster_features(
    collection: &FeatureCollection,
    zoom: f64,
    options: &ClusterOptions,
) -> Vec<MapMarker> {
    cluster_points(point_markers(collection), zoom, options)
}

fn cluster_points(points: Vec<PointMarker>, zoom: f64, options: &ClusterOptions) -> Vec<MapMarker> {
    if zoom > f64::from(options.max_zoom) || options.radius <= 0.0 {
        return points.into_iter().map(MapMarker::Point).collect();
    }

    let world = world_size(zoom, options);
    let projected: Vec<(f64, f64)> = points
        .iter()
        .map(|point| project(point.longitude, point.latitude, world))
        .collect();
    let cell_of = |(x, y): (f64, f64)| {
        (
            (x / options.radius).floor() as i64,
            (y / options.radius).floor() as i64,
        )
    };

    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (index, position) in projected.iter().enumerate() {
        grid.entry(cell_of(*position)).or_default().push(index);
    }

    let mut assigned = vec![false; points.len()];
    let mut markers = Vec::new();
    for index in 0..points.len() {
        if assigned[index] {
            continue;
        }
        assigned[index] = true;
        let origin = projected[index];
        let (cx, cy) = cell_of(origin);

        let mut members = vec![index];
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(candidates) = grid.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &other in candidates {
                    if assigned[other] {
                        continue;
                    }
                    let (x, y) = projected[other];
                    if (x - origin.0).hypot(y - origin.1) <= options.radius {
                        assigned[other] = true;
                        members.push(other);
                    }
                }
            }
        }

        if members.len() == 1 {
            markers.push(MapMarker::Point(points[index].clone()));
            continue;
        }

        let count = members.len();
        let (sum_x, sum_y) = members.iter().fold((0.0, 0.0), |(sx, sy), &member| {
            (sx + projected[member].0, sy + projected[member].1)
        });
        let (longitude, latitude) = unproject(sum_x / count as f64, sum_y / count as f64, world);
        let mut keys: Vec<usize> = members.iter().map(|&member| points[member].key).collect();
        keys.sort_unstable();
        markers.push(MapMarker::Cluster(Cluster {
            longitude,
            latitude,
            count,
            members: keys,
        }));
    }

    markers
}

/// Smallest zoom above `zoom` at which `cluster` breaks apart.
pub fn cluster_expansion_zoom(
    collection: &FeatureCollection,
    cluster: &Cluster,
    zoom: f64,
    options: &ClusterOptions,
) -> u8 {
    let members: Vec<PointMarker> = point_markers(collection)
        .into_iter()
        .filter(|point| cluster.members.binary_search(&point.key).is_ok())
        .collect();

    let start = (zoom.floor().max(0.0) as u8).saturating_add(1);
    for candidate in start..=options.max_zoom {
        if cluster_points(members.clone(), f64::from(candidate), options).len() > 1 {
            return candidate;
        }
    }
    options.max_zoom.saturating_add(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Camera {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
}

/// Camera that shows `bounds` inside a `width` × `height` viewport with `padding` on every side.
pub fn fit_bounds(bounds: &Bounds, width: f64, height: f64, padding: f64) -> Camera {
    let world = ClusterOptions::default().tile_size;
    let (x0, y0) = project(bounds.min_lon, bounds.max_lat, world);
    let (x1, y1) = project(bounds.max_lon, bounds.min_lat, world);
    let span_x = (x1 - x0).abs();
    let span_y = (y1 - y0).abs();
    let available_x = (width - 2.0 * padding).max(1.0);
    let available_y = (height - 2.0 * padding).max(1.0);

    let zoom = if span_x == 0.0 && span_y == 0.0 {
        MAX_FIT_ZOOM
    } else {
        let scale_x = if span_x > 0.0 { available_x / span_x } else { f64::INFINITY };
        let scale_y = if span_y > 0.0 { available_y / span_y } else { f64::INFINITY };
        scale_x.min(scale_y).log2().clamp(0.0, MAX_FIT_ZOOM)
    };

    let (longitude, latitude) = unproject((x0 + x1) / 2.0, (y0 + y1) / 2.0, world);
    Camera {
        longitude,
        latitude,
        zoom,
    }
}

/// Camera centered so the point sits in the middle of the area right of `left_padding`.
pub fn center_on(longitude: f64, latitude: f64, zoom: f64, left_padding: f64) -> Camera {
    let world = world_size(zoom, &ClusterOptions::default());
    let (x, y) = project(longitude, latitude, world);
    let (longitude, latitude) = unproject(x - left_padding / 2.0, y, world);
    Camera {
        longitude,
        latitude,
        zoom,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::data::record::CrashRecord;
    use crate::geo::projector::make_feature_collection;

    fn collection(points: &[(f64, f64, bool, bool)]) -> FeatureCollection {
        let records: Vec<CrashRecord> = points
            .iter()
            .map(|(lon, lat, deaths, injuries)| {
                serde_json::from_value(json!({
                    "longitude": lon, "latitude": lat,
                    "hasDeaths": deaths, "hasInjuries": injuries
                }))
                .unwrap()
            })
            .collect();
        make_feature_collection(&records)
    }

    #[test]
    fn severity_colors() {
        assert_eq!(SeverityClass::from_flags(true, true).color(), "#d32f2f");
        assert_eq!(SeverityClass::from_flags(false, true).color(), "#fbc02d");
        assert_eq!(SeverityClass::from_flags(false, false).color(), "#388e3c");
    }

    #[test]
    fn cluster_style_steps() {
        assert_eq!(cluster_color(3), "#42a5f5");
        assert_eq!(cluster_color(25), "#1e88e5");
        assert_eq!(cluster_color(99), "#1565c0");
        assert_eq!(cluster_color(100), "#0d47a1");
        assert_eq!(cluster_radius(1), 20.0);
        assert_eq!(cluster_radius(100), 40.0);
        assert_eq!(cluster_radius(550), 50.0);
        assert_eq!(cluster_radius(5000), 60.0);
        assert_eq!(abbreviate_count(999), "999");
        assert_eq!(abbreviate_count(1234), "1.2k");
        assert_eq!(abbreviate_count(12_345), "12k");
    }

    #[test]
    fn nearby_points_cluster_at_low_zoom_and_split_when_zoomed() {
        let features = collection(&[
            (-123.100, 49.250, true, false),
            (-123.101, 49.251, false, true),
            (-122.300, 49.050, false, false),
        ]);
        let options = ClusterOptions::default();

        let markers = cluster_features(&features, 10.0, &options);
        assert_eq!(markers.iter().map(MapMarker::count).sum::<usize>(), 3);
        let cluster = markers
            .iter()
            .find_map(|marker| match marker {
                MapMarker::Cluster(cluster) => Some(cluster.clone()),
                MapMarker::Point(_) => None,
            })
            .expect("the two close points should cluster");
        assert_eq!(cluster.members, vec![0, 1]);

        let expansion = cluster_expansion_zoom(&features, &cluster, 10.0, &options);
        assert!(expansion > 10 && expansion <= options.max_zoom + 1);

        let unclustered = cluster_features(&features, 15.0, &options);
        assert_eq!(unclustered.len(), 3);
        assert!(matches!(
            &unclustered[0],
            MapMarker::Point(PointMarker { severity: SeverityClass::Fatal, .. })
        ));
    }

    #[test]
    fn fit_bounds_centers_box() {
        let bounds = Bounds {
            min_lon: -123.3,
            min_lat: 49.0,
            max_lon: -122.7,
            max_lat: 49.4,
        };
        let camera = fit_bounds(&bounds, 1200.0, 800.0, FIT_PADDING);
        assert!((camera.longitude - -123.0).abs() < 1e-9);
        assert!(camera.latitude > 49.0 && camera.latitude < 49.4);
        assert!(camera.zoom > 5.0 && camera.zoom < 16.0);
    }

    #[test]
    fn center_on_shifts_left_for_panel() {
        let camera = center_on(-123.0, 49.2, 12.0, SELECTION_LEFT_PADDING);
        assert!(camera.longitude < -123.0);
        assert!((camera.latitude - 49.2).abs() < 1e-9);
    }
}
