pub mod bounds;
pub mod projector;

pub use bounds::{bounds_report, feature_bounds, Bounds, BoundsReport, Outlier};
pub use projector::{
    corrected_longitude, feature_key, feature_point, make_feature_collection, project_keyed,
    project_record,
};
