#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Compile-time registry of metro region definitions.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a new metro requires creating a TOML file in `regions/` and
//! adding a corresponding entry here.

pub use commute_burden_region_models::{CountyRef, InvalidRegionError, RegionConfig};

/// Region used when nothing else selects one.
pub const DEFAULT_REGION: &str = "phoenix";

/// Number of registered regions. Enforced by a test.
#[cfg(test)]
const EXPECTED_REGION_COUNT: usize = 4;

/// Embedded TOML region definitions.
const REGION_TOMLS: &[(&str, &str)] = &[
    ("phoenix", include_str!("../regions/phoenix.toml")),
    ("memphis", include_str!("../regions/memphis.toml")),
    ("los_angeles", include_str!("../regions/los_angeles.toml")),
    ("dallas", include_str!("../regions/dallas.toml")),
];

/// Returns all registered regions, in registry order.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests below.
#[must_use]
pub fn all_regions() -> Vec<RegionConfig> {
    REGION_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse region '{name}': {e}"))
        })
        .collect()
}

/// Looks up a region by id (case-insensitive).
#[must_use]
pub fn find_region(id: &str) -> Option<RegionConfig> {
    let id = id.trim();
    all_regions()
        .into_iter()
        .find(|r| r.id.eq_ignore_ascii_case(id))
}

/// Returns the ids of all registered regions.
#[must_use]
pub fn region_ids() -> Vec<&'static str> {
    REGION_TOMLS.iter().map(|(name, _)| *name).collect()
}
