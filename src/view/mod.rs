//! Runtime side: filters, map model, details panel and the state tying them together.

pub mod details;
pub mod filter;
pub mod map;
pub mod state;

pub use details::DetailsView;
pub use filter::{municipalities, FilterState, SeverityFilter};
pub use map::{Camera, Cluster, ClusterOptions, MapMarker, SeverityClass};
pub use state::AppState;
