//! Race/ethnicity shares and income for one tract.

use commute_burden_source_models::{AcsYear, DemographicRecord};
use serde::{Deserialize, Serialize};

use crate::missing::{percent, sanitize};

/// Derived demographic features for one tract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicFeatures {
    pub geoid: String,
    pub year: AcsYear,
    /// Total population. Also the tract's weight during aggregation.
    pub total_pop: Option<f64>,
    /// Residual non-Hispanic population outside the four named groups
    /// (multiracial and all other races), floored at zero.
    pub other_nh: Option<f64>,
    pub pct_hispanic: Option<f64>,
    pub pct_white: Option<f64>,
    pub pct_black: Option<f64>,
    pub pct_asian: Option<f64>,
    pub pct_other: Option<f64>,
    pub median_income: Option<f64>,
}

/// Derives demographic shares from one raw tract record.
///
/// Shares are missing when `total_pop` is missing or zero.
#[must_use]
pub fn derive_demographic_features(record: &DemographicRecord) -> DemographicFeatures {
    let total = sanitize(record.total_pop);
    let hispanic = sanitize(record.hispanic);
    let white = sanitize(record.white_nh);
    let black = sanitize(record.black_nh);
    let asian = sanitize(record.asian_nh);

    let other_nh = match (total, hispanic, white, black, asian) {
        (Some(t), Some(h), Some(w), Some(b), Some(a)) => Some((t - h - w - b - a).max(0.0)),
        _ => None,
    };

    DemographicFeatures {
        geoid: record.geoid.clone(),
        year: record.year,
        total_pop: total,
        other_nh,
        pct_hispanic: percent(hispanic, total),
        pct_white: percent(white, total),
        pct_black: percent(black, total),
        pct_asian: percent(asian, total),
        pct_other: percent(other_nh, total),
        median_income: sanitize(record.median_income),
    }
}

/// Derives features for every record, preserving order.
#[must_use]
pub fn derive_all(records: &[DemographicRecord]) -> Vec<DemographicFeatures> {
    records.iter().map(derive_demographic_features).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DemographicRecord {
        DemographicRecord {
            geoid: "47157000100".to_string(),
            year: AcsYear::Y2023,
            total_pop: Some(1000.0),
            hispanic: Some(100.0),
            white_nh: Some(400.0),
            black_nh: Some(350.0),
            asian_nh: Some(50.0),
            median_income: Some(48_000.0),
        }
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn derives_shares_and_residual() {
        let f = derive_demographic_features(&record());
        assert_eq!(f.other_nh, Some(100.0));
        assert!(close(f.pct_hispanic, 10.0));
        assert!(close(f.pct_white, 40.0));
        assert!(close(f.pct_black, 35.0));
        assert!(close(f.pct_asian, 5.0));
        assert!(close(f.pct_other, 10.0));
        assert_eq!(f.median_income, Some(48_000.0));
    }

    #[test]
    fn residual_is_floored_at_zero() {
        let mut r = record();
        r.white_nh = Some(600.0);
        let f = derive_demographic_features(&r);
        assert_eq!(f.other_nh, Some(0.0));
        assert_eq!(f.pct_other, Some(0.0));
    }

    #[test]
    fn empty_tract_has_no_shares() {
        let mut r = record();
        r.total_pop = Some(0.0);
        r.hispanic = Some(0.0);
        r.white_nh = Some(0.0);
        r.black_nh = Some(0.0);
        r.asian_nh = Some(0.0);
        let f = derive_demographic_features(&r);
        assert_eq!(f.total_pop, Some(0.0));
        assert_eq!(f.pct_hispanic, None);
        assert_eq!(f.pct_other, None);
    }

    #[test]
    fn sentinel_income_is_missing() {
        let mut r = record();
        r.median_income = Some(-666_666_666.0);
        assert_eq!(derive_demographic_features(&r).median_income, None);
    }

    #[test]
    fn missing_group_count_drops_residual() {
        let mut r = record();
        r.asian_nh = None;
        let f = derive_demographic_features(&r);
        assert_eq!(f.other_nh, None);
        assert_eq!(f.pct_asian, None);
        assert!(close(f.pct_white, 40.0));
    }
}
