#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reporting-area records and the final dataset schema.
//!
//! [`OUTPUT_COLUMNS`] is a compatibility contract with downstream
//! analysis: columns are never reordered or renamed.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Column header of the reporting-area identifier.
pub const ID_COLUMN: &str = "ZCTA5CE";

/// Output columns, in order.
pub const OUTPUT_COLUMNS: [&str; 32] = [
    ID_COLUMN,
    "rent_to_income",
    "pct_rent_burden_30",
    "pct_rent_burden_50",
    "zori",
    "commute_min_proxy",
    "pct_commute_lt10",
    "pct_commute_10_19",
    "pct_commute_20_29",
    "pct_commute_30_44",
    "pct_commute_45_59",
    "pct_commute_60_plus",
    "ttw_total",
    "pct_drive_alone",
    "pct_carpool",
    "pct_car",
    "pct_transit",
    "pct_walk",
    "pct_wfh",
    "renter_share",
    "vehicle_access",
    "total_pop",
    "pop_density",
    "pct_white",
    "pct_black",
    "pct_asian",
    "pct_hispanic",
    "pct_other",
    "median_income",
    "income_segment",
    "stops_per_km2",
    "period",
];

/// Tract features rolled up to one reporting area.
///
/// Counts are sums over member tracts; every other value is a
/// population-weighted mean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaRecord {
    /// Zero-padded ZCTA.
    pub zcta: String,
    /// Member tracts that had at least one feature table row.
    pub tract_count: usize,
    pub ttw_total: Option<f64>,
    pub total_pop: Option<f64>,
    pub rent_to_income: Option<f64>,
    pub commute_min_proxy: Option<f64>,
    pub pct_commute_lt10: Option<f64>,
    pub pct_commute_10_19: Option<f64>,
    pub pct_commute_20_29: Option<f64>,
    pub pct_commute_30_44: Option<f64>,
    pub pct_commute_45_59: Option<f64>,
    pub pct_commute_60_plus: Option<f64>,
    pub pct_drive_alone: Option<f64>,
    pub pct_carpool: Option<f64>,
    pub pct_car: Option<f64>,
    pub pct_transit: Option<f64>,
    pub pct_walk: Option<f64>,
    pub pct_wfh: Option<f64>,
    pub pct_rent_burden_30: Option<f64>,
    pub pct_rent_burden_50: Option<f64>,
    pub renter_share: Option<f64>,
    pub vehicle_access: Option<f64>,
    pub pct_white: Option<f64>,
    pub pct_black: Option<f64>,
    pub pct_asian: Option<f64>,
    pub pct_hispanic: Option<f64>,
    pub pct_other: Option<f64>,
    pub median_income: Option<f64>,
}

impl AreaRecord {
    /// An empty record for `zcta` with every value missing.
    #[must_use]
    pub fn new(zcta: impl Into<String>) -> Self {
        Self {
            zcta: zcta.into(),
            ..Self::default()
        }
    }
}

/// Median-income tercile of a reporting area within its metro.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum IncomeSegment {
    Low,
    Medium,
    High,
}

/// One row of the final dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub area: AreaRecord,
    /// Planar area in the region's UTM zone.
    pub area_km2: Option<f64>,
    /// Latest Zillow Observed Rent Index value.
    pub zori: Option<f64>,
    /// Period label of the `zori` observation.
    pub period: Option<String>,
    /// Transit stops per square kilometre. Missing when the count failed.
    pub stops_per_km2: Option<f64>,
    /// Residents per square kilometre.
    pub pop_density: Option<f64>,
    pub income_segment: Option<IncomeSegment>,
}

impl DatasetRow {
    /// Renders the row as CSV fields in [`OUTPUT_COLUMNS`] order.
    ///
    /// Missing values are empty fields. Floats use the shortest
    /// representation that round-trips, so output is deterministic.
    #[must_use]
    pub fn to_record(&self) -> Vec<String> {
        let a = &self.area;
        let mut fields = Vec::with_capacity(OUTPUT_COLUMNS.len());

        fields.push(a.zcta.clone());
        fields.extend(
            [
                a.rent_to_income,
                a.pct_rent_burden_30,
                a.pct_rent_burden_50,
                self.zori,
                a.commute_min_proxy,
                a.pct_commute_lt10,
                a.pct_commute_10_19,
                a.pct_commute_20_29,
                a.pct_commute_30_44,
                a.pct_commute_45_59,
                a.pct_commute_60_plus,
                a.ttw_total,
                a.pct_drive_alone,
                a.pct_carpool,
                a.pct_car,
                a.pct_transit,
                a.pct_walk,
                a.pct_wfh,
                a.renter_share,
                a.vehicle_access,
                a.total_pop,
                self.pop_density,
                a.pct_white,
                a.pct_black,
                a.pct_asian,
                a.pct_hispanic,
                a.pct_other,
                a.median_income,
            ]
            .map(format_value),
        );
        fields.push(
            self.income_segment
                .map(|s| s.to_string())
                .unwrap_or_default(),
        );
        fields.push(format_value(self.stops_per_km2));
        fields.push(self.period.clone().unwrap_or_default());

        fields
    }
}

/// Formats an optional float for CSV output.
#[must_use]
pub fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
