#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic unit types shared by the boundary clients, the join engine
//! and the dataset assembler.
//!
//! All geometries are WGS84 (EPSG:4326) longitude/latitude. Anything that
//! needs metric distances or areas re-projects through a [`UtmZone`].

pub mod fips;

use std::collections::BTreeMap;

use geo::MultiPolygon;
use strum_macros::{AsRefStr, Display, EnumString};

/// The role a boundary plays in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum BoundaryKind {
    /// Metro (CBSA) outline used to filter reporting areas.
    Metro,
    /// ZIP-code tabulation area, the unit of the final dataset.
    ReportingArea,
    /// Census tract, the unit of the survey tables.
    Tract,
}

impl BoundaryKind {
    /// Fixed width identifiers of this kind are zero-padded to.
    #[must_use]
    pub const fn id_width(self) -> usize {
        match self {
            Self::Metro => fips::CBSA_WIDTH,
            Self::ReportingArea => fips::ZCTA_WIDTH,
            Self::Tract => fips::TRACT_GEOID_WIDTH,
        }
    }
}

/// A single boundary polygon with its identifier and source attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    /// Zero-padded identifier (CBSA code, ZCTA or tract GEOID).
    pub id: String,
    /// Attribute columns as returned by the boundary service.
    pub attributes: BTreeMap<String, serde_json::Value>,
    /// WGS84 geometry.
    pub geometry: MultiPolygon<f64>,
}

impl BoundaryFeature {
    /// Returns a string attribute, if present.
    #[must_use]
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(serde_json::Value::as_str)
    }

    /// Whether the geometry has no polygons at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }
}

/// A Universal Transverse Mercator zone on the WGS84 datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtmZone {
    /// Zone number, 1-60.
    pub number: u8,
    /// Southern hemisphere (EPSG 327xx) when true.
    pub south: bool,
}

impl UtmZone {
    /// Resolves a WGS84 UTM EPSG code (32601-32660, 32701-32760).
    #[must_use]
    pub fn from_epsg(epsg: u32) -> Option<Self> {
        let (base, south) = match epsg {
            32601..=32660 => (32600, false),
            32701..=32760 => (32700, true),
            _ => return None,
        };
        let number = u8::try_from(epsg - base).ok()?;
        Some(Self { number, south })
    }

    /// The EPSG code for this zone.
    #[must_use]
    pub fn epsg(self) -> u32 {
        let base = if self.south { 32700 } else { 32600 };
        base + u32::from(self.number)
    }

    /// Longitude of the zone's central meridian, in degrees.
    #[must_use]
    pub fn central_meridian(self) -> f64 {
        f64::from(self.number).mul_add(6.0, -183.0)
    }
}

impl std::fmt::Display for UtmZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "UTM {}{} (EPSG:{})",
            self.number,
            if self.south { "S" } else { "N" },
            self.epsg()
        )
    }
}
