//! Crash-record map data core.
//!
//! The offline half turns a spreadsheet export into a validated JSON snapshot
//! (`data`, `prepare`). The runtime half loads that snapshot and derives the
//! views a map UI consumes: GeoJSON features (`geo`), a fuzzy search index
//! (`search`), filters, clusters and the details panel (`view`).

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod geo;
pub mod logging;
pub mod prepare;
pub mod search;
pub mod view;
