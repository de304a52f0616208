#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Metro region configuration types.
//!
//! A [`RegionConfig`] is the single explicit value that identifies a
//! metro to every pipeline stage: which CBSA outline to filter by, which
//! counties to pull tracts and survey tables for, which ZIP prefixes to
//! request ZCTAs for, and which UTM zone to measure in.

use std::collections::BTreeSet;

use commute_burden_geography_models::{
    UtmZone,
    fips::{CodeKind, validate_code},
};
use serde::{Deserialize, Serialize};

/// A metro region definition, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Unique region key (e.g., `"phoenix"`). Used in output file names.
    pub id: String,
    /// Human-readable name (e.g., "Phoenix-Mesa-Chandler, AZ").
    pub name: String,
    /// Five-digit CBSA code of the metro outline.
    pub cbsa_code: String,
    /// Counties whose tracts make up the metro.
    pub counties: Vec<CountyRef>,
    /// ZIP prefixes used to request candidate ZCTAs.
    pub zip_prefixes: Vec<String>,
    /// EPSG code of the UTM zone used for centroids and areas.
    pub utm_epsg: u32,
}

/// A county within a region, identified by state and county FIPS codes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CountyRef {
    /// Two-digit state FIPS code.
    pub state_fips: String,
    /// Three-digit county FIPS code.
    pub county_fips: String,
}

impl std::fmt::Display for CountyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.state_fips, self.county_fips)
    }
}

impl RegionConfig {
    /// Returns the distinct state FIPS codes the region spans.
    #[must_use]
    pub fn states(&self) -> BTreeSet<&str> {
        self.counties.iter().map(|c| c.state_fips.as_str()).collect()
    }

    /// Returns the region's UTM zone, if its EPSG code is a WGS84 UTM zone.
    #[must_use]
    pub fn utm_zone(&self) -> Option<UtmZone> {
        UtmZone::from_epsg(self.utm_epsg)
    }

    /// Checks every code in the definition.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRegionError`] describing the first problem found:
    /// an empty id, a malformed CBSA/FIPS code or ZIP prefix, no counties
    /// or prefixes, or an EPSG code that is not a UTM zone.
    pub fn validate(&self) -> Result<(), InvalidRegionError> {
        let fail = |message: String| InvalidRegionError {
            region: self.id.clone(),
            message,
        };

        if self.id.trim().is_empty() {
            return Err(fail("region id is empty".to_string()));
        }
        validate_code(CodeKind::Cbsa, &self.cbsa_code).map_err(|e| fail(e.to_string()))?;

        if self.counties.is_empty() {
            return Err(fail("no counties configured".to_string()));
        }
        for county in &self.counties {
            validate_code(CodeKind::StateFips, &county.state_fips)
                .map_err(|e| fail(e.to_string()))?;
            validate_code(CodeKind::CountyFips, &county.county_fips)
                .map_err(|e| fail(e.to_string()))?;
        }

        if self.zip_prefixes.is_empty() {
            return Err(fail("no ZIP prefixes configured".to_string()));
        }
        for prefix in &self.zip_prefixes {
            validate_code(CodeKind::ZipPrefix, prefix).map_err(|e| fail(e.to_string()))?;
        }

        if self.utm_zone().is_none() {
            return Err(fail(format!(
                "EPSG:{} is not a WGS84 UTM zone",
                self.utm_epsg
            )));
        }

        Ok(())
    }
}

/// Error returned when a region definition fails validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRegionError {
    /// Id of the offending region.
    pub region: String,
    /// What was wrong.
    pub message: String,
}

impl std::fmt::Display for InvalidRegionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid region '{}': {}", self.region, self.message)
    }
}

impl std::error::Error for InvalidRegionError {}
