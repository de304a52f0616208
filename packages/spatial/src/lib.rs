#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic join engine.
//!
//! Re-projects WGS84 polygons into the region's UTM zone to take
//! centroids and areas, then attributes tracts to reporting areas (and
//! reporting areas to the metro) by centroid containment, using an
//! R-tree over area envelopes for the point-in-polygon lookups.

pub mod join;
pub mod measure;
pub mod projection;

pub use join::{AreaIndex, TractMapping, filter_areas_in_boundary, map_tracts_to_areas};
pub use measure::{area_km2, projected_centroid};
