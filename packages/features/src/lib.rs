#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-tract feature derivation.
//!
//! Pure functions from raw survey counts to ratios and percentages. The
//! survey service's negative sentinel codes are turned into missing
//! values before any arithmetic, and a ratio is only produced when its
//! operands are present and its denominator is positive. No result is
//! ever `NaN` or infinite.

pub mod commute;
pub mod demographics;
pub mod missing;

pub use commute::{CommuteFeatures, derive_commute_features};
pub use demographics::{DemographicFeatures, derive_demographic_features};
