#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw record types produced by the source clients.
//!
//! Survey values are kept exactly as the survey service reported them,
//! including its negative "not available" sentinel codes. Turning those
//! into missing values is the job of the feature derivation stage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// ACS 5-year vintages the survey client accepts.
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
pub enum AcsYear {
    #[strum(serialize = "2015")]
    Y2015,
    #[strum(serialize = "2017")]
    Y2017,
    #[strum(serialize = "2019")]
    Y2019,
    #[strum(serialize = "2021")]
    Y2021,
    #[strum(serialize = "2023")]
    Y2023,
}

impl AcsYear {
    /// Every supported vintage, oldest first.
    pub const ALL: &[Self] = &[
        Self::Y2015,
        Self::Y2017,
        Self::Y2019,
        Self::Y2021,
        Self::Y2023,
    ];

    /// Vintage used for the commute/housing table unless overridden.
    pub const DEFAULT_COMMUTE: Self = Self::Y2021;

    /// Vintage used for the demographics table unless overridden.
    pub const DEFAULT_DEMOGRAPHICS: Self = Self::Y2023;

    /// Returns the calendar year.
    #[must_use]
    pub const fn value(self) -> u16 {
        match self {
            Self::Y2015 => 2015,
            Self::Y2017 => 2017,
            Self::Y2019 => 2019,
            Self::Y2021 => 2021,
            Self::Y2023 => 2023,
        }
    }

    /// Resolves a calendar year against the allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedYearError`] for any year not in [`Self::ALL`].
    pub const fn from_value(year: u16) -> Result<Self, UnsupportedYearError> {
        match year {
            2015 => Ok(Self::Y2015),
            2017 => Ok(Self::Y2017),
            2019 => Ok(Self::Y2019),
            2021 => Ok(Self::Y2021),
            2023 => Ok(Self::Y2023),
            _ => Err(UnsupportedYearError { year }),
        }
    }
}

/// Error returned for a survey year outside the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedYearError {
    /// The rejected year.
    pub year: u16,
}

impl std::fmt::Display for UnsupportedYearError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported ACS year {}: expected one of 2015, 2017, 2019, 2021, 2023",
            self.year
        )
    }
}

impl std::error::Error for UnsupportedYearError {}

/// A survey variable code and the column name it is exposed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurveyVariable {
    /// ACS variable code (e.g., `"B25064_001E"`).
    pub code: &'static str,
    /// Column name used downstream (e.g., `"median_rent"`).
    pub name: &'static str,
}

const fn var(code: &'static str, name: &'static str) -> SurveyVariable {
    SurveyVariable { code, name }
}

/// Travel-time-to-work bucket columns, shortest first.
pub const TRAVEL_TIME_BUCKETS: [&str; 12] = [
    "ttw_lt5",
    "ttw_5_9",
    "ttw_10_14",
    "ttw_15_19",
    "ttw_20_24",
    "ttw_25_29",
    "ttw_30_34",
    "ttw_35_39",
    "ttw_40_44",
    "ttw_45_59",
    "ttw_60_89",
    "ttw_90_plus",
];

/// Variables of the commute/housing table.
pub const COMMUTE_VARIABLES: &[SurveyVariable] = &[
    var("B25064_001E", "median_rent"),
    var("B19013_001E", "median_income"),
    var("B08303_001E", "ttw_total"),
    var("B08303_002E", TRAVEL_TIME_BUCKETS[0]),
    var("B08303_003E", TRAVEL_TIME_BUCKETS[1]),
    var("B08303_004E", TRAVEL_TIME_BUCKETS[2]),
    var("B08303_005E", TRAVEL_TIME_BUCKETS[3]),
    var("B08303_006E", TRAVEL_TIME_BUCKETS[4]),
    var("B08303_007E", TRAVEL_TIME_BUCKETS[5]),
    var("B08303_008E", TRAVEL_TIME_BUCKETS[6]),
    var("B08303_009E", TRAVEL_TIME_BUCKETS[7]),
    var("B08303_010E", TRAVEL_TIME_BUCKETS[8]),
    var("B08303_011E", TRAVEL_TIME_BUCKETS[9]),
    var("B08303_012E", TRAVEL_TIME_BUCKETS[10]),
    var("B08303_013E", TRAVEL_TIME_BUCKETS[11]),
    var("B08301_001E", "mode_total"),
    var("B08301_003E", "mode_car_alone"),
    var("B08301_004E", "mode_carpool"),
    var("B08301_010E", "mode_transit"),
    var("B08301_019E", "mode_walk"),
    var("B08301_020E", "mode_other"),
    var("B08301_021E", "mode_wfh"),
    var("B25070_001E", "rent_burden_total"),
    var("B25070_008E", "rent_burden_30_34"),
    var("B25070_009E", "rent_burden_35_39"),
    var("B25070_010E", "rent_burden_40_49"),
    var("B25070_011E", "rent_burden_50_plus"),
    var("B25003_001E", "tenure_total"),
    var("B25003_002E", "tenure_owner"),
    var("B25003_003E", "tenure_renter"),
    var("B08201_001E", "vehicles_total"),
    var("B08201_002E", "vehicles_none"),
];

/// Variables of the demographics table.
pub const DEMOGRAPHIC_VARIABLES: &[SurveyVariable] = &[
    var("B03002_001E", "total_pop"),
    var("B03002_012E", "hispanic"),
    var("B03002_003E", "white_nh"),
    var("B03002_004E", "black_nh"),
    var("B03002_006E", "asian_nh"),
    var("B19013_001E", "median_income"),
];

/// One tract row of a survey table, keyed by its 11-digit GEOID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRow {
    /// Zero-padded tract GEOID.
    pub geoid: String,
    /// Survey vintage.
    pub year: AcsYear,
    /// Column name to raw value. Unparsable cells are `None`.
    pub values: BTreeMap<String, Option<f64>>,
}

impl SurveyRow {
    /// Returns the raw value of a named column.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }
}

/// Raw commute, rent and tenure counts for one tract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommuteRecord {
    pub geoid: String,
    pub year: AcsYear,
    pub median_rent: Option<f64>,
    pub median_income: Option<f64>,
    pub ttw_total: Option<f64>,
    /// Worker counts per travel-time bucket, in [`TRAVEL_TIME_BUCKETS`] order.
    pub ttw_buckets: [Option<f64>; 12],
    pub mode_total: Option<f64>,
    pub mode_car_alone: Option<f64>,
    pub mode_carpool: Option<f64>,
    pub mode_transit: Option<f64>,
    pub mode_walk: Option<f64>,
    pub mode_other: Option<f64>,
    pub mode_wfh: Option<f64>,
    pub rent_burden_total: Option<f64>,
    pub rent_burden_30_34: Option<f64>,
    pub rent_burden_35_39: Option<f64>,
    pub rent_burden_40_49: Option<f64>,
    pub rent_burden_50_plus: Option<f64>,
    pub tenure_total: Option<f64>,
    pub tenure_owner: Option<f64>,
    pub tenure_renter: Option<f64>,
    pub vehicles_total: Option<f64>,
    pub vehicles_none: Option<f64>,
}

impl From<&SurveyRow> for CommuteRecord {
    fn from(row: &SurveyRow) -> Self {
        let v = |name: &str| row.value(name);
        Self {
            geoid: row.geoid.clone(),
            year: row.year,
            median_rent: v("median_rent"),
            median_income: v("median_income"),
            ttw_total: v("ttw_total"),
            ttw_buckets: TRAVEL_TIME_BUCKETS.map(|name| row.value(name)),
            mode_total: v("mode_total"),
            mode_car_alone: v("mode_car_alone"),
            mode_carpool: v("mode_carpool"),
            mode_transit: v("mode_transit"),
            mode_walk: v("mode_walk"),
            mode_other: v("mode_other"),
            mode_wfh: v("mode_wfh"),
            rent_burden_total: v("rent_burden_total"),
            rent_burden_30_34: v("rent_burden_30_34"),
            rent_burden_35_39: v("rent_burden_35_39"),
            rent_burden_40_49: v("rent_burden_40_49"),
            rent_burden_50_plus: v("rent_burden_50_plus"),
            tenure_total: v("tenure_total"),
            tenure_owner: v("tenure_owner"),
            tenure_renter: v("tenure_renter"),
            vehicles_total: v("vehicles_total"),
            vehicles_none: v("vehicles_none"),
        }
    }
}

/// Raw race/ethnicity and income counts for one tract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicRecord {
    pub geoid: String,
    pub year: AcsYear,
    pub total_pop: Option<f64>,
    pub hispanic: Option<f64>,
    pub white_nh: Option<f64>,
    pub black_nh: Option<f64>,
    pub asian_nh: Option<f64>,
    pub median_income: Option<f64>,
}

impl From<&SurveyRow> for DemographicRecord {
    fn from(row: &SurveyRow) -> Self {
        Self {
            geoid: row.geoid.clone(),
            year: row.year,
            total_pop: row.value("total_pop"),
            hispanic: row.value("hispanic"),
            white_nh: row.value("white_nh"),
            black_nh: row.value("black_nh"),
            asian_nh: row.value("asian_nh"),
            median_income: row.value("median_income"),
        }
    }
}

/// The latest rent-index observation for a ZIP code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentObservation {
    /// Zero-padded 5-digit ZIP code.
    pub zip: String,
    /// Column label of the observation (e.g., `"2024-06-30"`).
    pub period: String,
    /// Observed rent index value.
    pub zori: f64,
}

/// Outcome of a point-of-interest count for one polygon.
///
/// Keeps "the service confirmed there is nothing here" apart from "the
/// service could not answer", so a failed query never reads as a zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PoiCount {
    /// At least one matching feature.
    Found { count: u64 },
    /// The query succeeded and matched nothing.
    Empty,
    /// The query could not be answered.
    Failed { reason: String },
}

impl PoiCount {
    /// Builds an outcome from a successful count.
    #[must_use]
    pub const fn from_count(count: u64) -> Self {
        if count == 0 {
            Self::Empty
        } else {
            Self::Found { count }
        }
    }

    /// The confirmed count, or `None` for a failed query.
    #[must_use]
    pub const fn count(&self) -> Option<u64> {
        match self {
            Self::Found { count } => Some(*count),
            Self::Empty => Some(0),
            Self::Failed { .. } => None,
        }
    }

    /// Whether the query failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_allow_list() {
        for year in AcsYear::ALL {
            assert_eq!(AcsYear::from_value(year.value()), Ok(*year));
        }
        assert_eq!(
            AcsYear::from_value(2020),
            Err(UnsupportedYearError { year: 2020 })
        );
        assert_eq!(AcsYear::Y2021.to_string(), "2021");
        assert_eq!("2019".parse::<AcsYear>().unwrap(), AcsYear::Y2019);
    }

    #[test]
    fn variable_names_are_unique() {
        let mut names: Vec<_> = COMMUTE_VARIABLES.iter().map(|v| v.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), COMMUTE_VARIABLES.len());
        assert_eq!(COMMUTE_VARIABLES.len(), 32);
    }

    #[test]
    fn commute_record_reads_named_columns() {
        let mut values = BTreeMap::new();
        values.insert("median_rent".to_string(), Some(1200.0));
        values.insert("ttw_lt5".to_string(), Some(10.0));
        values.insert("ttw_90_plus".to_string(), Some(3.0));
        values.insert("vehicles_none".to_string(), None);
        let row = SurveyRow {
            geoid: "04013010100".to_string(),
            year: AcsYear::Y2021,
            values,
        };

        let record = CommuteRecord::from(&row);
        assert_eq!(record.median_rent, Some(1200.0));
        assert_eq!(record.ttw_buckets[0], Some(10.0));
        assert_eq!(record.ttw_buckets[11], Some(3.0));
        assert_eq!(record.ttw_buckets[5], None);
        assert_eq!(record.vehicles_none, None);
        assert_eq!(record.median_income, None);
    }

    #[test]
    fn poi_count_outcomes() {
        assert_eq!(PoiCount::from_count(0), PoiCount::Empty);
        assert_eq!(PoiCount::from_count(4).count(), Some(4));
        assert_eq!(PoiCount::Empty.count(), Some(0));
        let failed = PoiCount::Failed {
            reason: "timeout".to_string(),
        };
        assert!(failed.is_failed());
        assert_eq!(failed.count(), None);
    }
}
