//! Commute, rent-burden, tenure and vehicle features.

use commute_burden_source_models::{AcsYear, CommuteRecord};
use serde::{Deserialize, Serialize};

use crate::missing::{percent, ratio, sanitize, sum_all};

/// Representative minutes for each travel-time bucket, shortest first.
///
/// Bucket midpoints, except the open-ended 90+ bucket which is pinned at
/// 100. The resulting mean is an approximation, not a measured average.
pub const BUCKET_MIDPOINTS: [f64; 12] = [
    2.5, 7.0, 12.0, 17.0, 22.0, 27.0, 32.0, 37.0, 42.0, 52.0, 75.0, 100.0,
];

/// Derived commute and housing-burden features for one tract.
///
/// Percentages are on a 0-100 scale; `rent_to_income` is a fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommuteFeatures {
    pub geoid: String,
    pub year: AcsYear,
    /// Workers 16+ who did not work at home (sanitized count).
    pub ttw_total: Option<f64>,
    /// Monthly median rent over monthly median income.
    pub rent_to_income: Option<f64>,
    /// Estimated mean one-way commute in minutes.
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
    /// Renter households paying 30% or more of income on rent.
    pub pct_rent_burden_30: Option<f64>,
    /// Renter households paying 50% or more of income on rent.
    pub pct_rent_burden_50: Option<f64>,
    /// Renter-occupied share of occupied housing units.
    pub renter_share: Option<f64>,
    /// Share of households with at least one vehicle available.
    pub vehicle_access: Option<f64>,
}

/// Derives commute and housing features from one raw tract record.
#[must_use]
pub fn derive_commute_features(record: &CommuteRecord) -> CommuteFeatures {
    let rent = sanitize(record.median_rent);
    let income = sanitize(record.median_income);
    let rent_to_income = match (rent, income) {
        (Some(rent), Some(income)) if rent > 0.0 && income > 0.0 => Some(rent / (income / 12.0)),
        _ => None,
    };

    let ttw_total = sanitize(record.ttw_total);
    let b = record.ttw_buckets.map(sanitize);
    let share = |buckets: &[Option<f64>]| percent(sum_all(buckets), ttw_total);

    let weighted_minutes = b
        .iter()
        .zip(BUCKET_MIDPOINTS)
        .map(|(count, minutes)| count.map(|c| c * minutes))
        .collect::<Vec<_>>();
    let commute_min_proxy = ratio(sum_all(&weighted_minutes), ttw_total);

    let mode_total = sanitize(record.mode_total);
    let pct_drive_alone = percent(sanitize(record.mode_car_alone), mode_total);
    let pct_carpool = percent(sanitize(record.mode_carpool), mode_total);
    let pct_car = sum_all(&[pct_drive_alone, pct_carpool]);

    let burden_total = sanitize(record.rent_burden_total);
    let burden_50 = sanitize(record.rent_burden_50_plus);
    let burden_30 = sum_all(&[
        sanitize(record.rent_burden_30_34),
        sanitize(record.rent_burden_35_39),
        sanitize(record.rent_burden_40_49),
        burden_50,
    ]);

    let vehicles_total = sanitize(record.vehicles_total);
    let with_vehicle = match (vehicles_total, sanitize(record.vehicles_none)) {
        (Some(total), Some(none)) => Some((total - none).max(0.0)),
        _ => None,
    };

    CommuteFeatures {
        geoid: record.geoid.clone(),
        year: record.year,
        ttw_total,
        rent_to_income,
        commute_min_proxy,
        pct_commute_lt10: share(&b[0..2]),
        pct_commute_10_19: share(&b[2..4]),
        pct_commute_20_29: share(&b[4..6]),
        pct_commute_30_44: share(&b[6..9]),
        pct_commute_45_59: share(&b[9..10]),
        pct_commute_60_plus: share(&b[10..12]),
        pct_drive_alone,
        pct_carpool,
        pct_car,
        pct_transit: percent(sanitize(record.mode_transit), mode_total),
        pct_walk: percent(sanitize(record.mode_walk), mode_total),
        pct_wfh: percent(sanitize(record.mode_wfh), mode_total),
        pct_rent_burden_30: percent(burden_30, burden_total),
        pct_rent_burden_50: percent(burden_50, burden_total),
        renter_share: percent(sanitize(record.tenure_renter), sanitize(record.tenure_total)),
        vehicle_access: percent(with_vehicle, vehicles_total),
    }
}

/// Derives features for every record, preserving order.
#[must_use]
pub fn derive_all(records: &[CommuteRecord]) -> Vec<CommuteFeatures> {
    let features: Vec<_> = records.iter().map(derive_commute_features).collect();
    let without_ratio = features.iter().filter(|f| f.rent_to_income.is_none()).count();
    if without_ratio > 0 {
        log::debug!(
            "{without_ratio} of {} tracts have no rent-to-income ratio",
            features.len()
        );
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CommuteRecord {
        CommuteRecord {
            geoid: "04013010100".to_string(),
            year: AcsYear::Y2021,
            median_rent: Some(1500.0),
            median_income: Some(60_000.0),
            ttw_total: Some(1000.0),
            ttw_buckets: [
                Some(50.0),
                Some(50.0),
                Some(100.0),
                Some(100.0),
                Some(150.0),
                Some(50.0),
                Some(100.0),
                Some(50.0),
                Some(50.0),
                Some(100.0),
                Some(150.0),
                Some(50.0),
            ],
            mode_total: Some(1200.0),
            mode_car_alone: Some(900.0),
            mode_carpool: Some(120.0),
            mode_transit: Some(60.0),
            mode_walk: Some(24.0),
            mode_other: Some(16.0),
            mode_wfh: Some(80.0),
            rent_burden_total: Some(400.0),
            rent_burden_30_34: Some(40.0),
            rent_burden_35_39: Some(30.0),
            rent_burden_40_49: Some(30.0),
            rent_burden_50_plus: Some(100.0),
            tenure_total: Some(800.0),
            tenure_owner: Some(400.0),
            tenure_renter: Some(400.0),
            vehicles_total: Some(800.0),
            vehicles_none: Some(40.0),
        }
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn derives_rent_to_income() {
        let f = derive_commute_features(&record());
        assert!(close(f.rent_to_income, 0.3));
    }

    #[test]
    fn commute_shares_sum_to_100() {
        let f = derive_commute_features(&record());
        assert!(close(f.pct_commute_lt10, 10.0));
        assert!(close(f.pct_commute_10_19, 20.0));
        assert!(close(f.pct_commute_20_29, 20.0));
        assert!(close(f.pct_commute_30_44, 20.0));
        assert!(close(f.pct_commute_45_59, 10.0));
        assert!(close(f.pct_commute_60_plus, 20.0));
    }

    #[test]
    fn commute_proxy_uses_midpoints() {
        let f = derive_commute_features(&record());
        let expected = (50.0 * 2.5
            + 50.0 * 7.0
            + 100.0 * 12.0
            + 100.0 * 17.0
            + 150.0 * 22.0
            + 50.0 * 27.0
            + 100.0 * 32.0
            + 50.0 * 37.0
            + 50.0 * 42.0
            + 100.0 * 52.0
            + 150.0 * 75.0
            + 50.0 * 100.0)
            / 1000.0;
        assert!(close(f.commute_min_proxy, expected));
    }

    #[test]
    fn derives_mode_and_housing_shares() {
        let f = derive_commute_features(&record());
        assert!(close(f.pct_drive_alone, 75.0));
        assert!(close(f.pct_carpool, 10.0));
        assert!(close(f.pct_car, 85.0));
        assert!(close(f.pct_transit, 5.0));
        assert!(close(f.pct_walk, 2.0));
        assert!(close(f.pct_rent_burden_30, 50.0));
        assert!(close(f.pct_rent_burden_50, 25.0));
        assert!(close(f.renter_share, 50.0));
        assert!(close(f.vehicle_access, 95.0));
    }

    #[test]
    fn sentinel_income_gives_missing_ratio() {
        let mut r = record();
        r.median_income = Some(-666_666_666.0);
        let f = derive_commute_features(&r);
        assert_eq!(f.rent_to_income, None);
    }

    #[test]
    fn zero_rent_gives_missing_ratio() {
        let mut r = record();
        r.median_rent = Some(0.0);
        assert_eq!(derive_commute_features(&r).rent_to_income, None);
    }

    #[test]
    fn zero_denominators_give_missing_not_infinite() {
        let mut r = record();
        r.ttw_total = Some(0.0);
        r.mode_total = Some(0.0);
        r.rent_burden_total = Some(0.0);
        r.tenure_total = None;
        r.vehicles_total = Some(-999_999_999.0);
        let f = derive_commute_features(&r);
        assert_eq!(f.pct_commute_lt10, None);
        assert_eq!(f.commute_min_proxy, None);
        assert_eq!(f.pct_drive_alone, None);
        assert_eq!(f.pct_car, None);
        assert_eq!(f.pct_rent_burden_30, None);
        assert_eq!(f.renter_share, None);
        assert_eq!(f.vehicle_access, None);
        assert_eq!(f.ttw_total, Some(0.0));
    }

    #[test]
    fn missing_bucket_poisons_only_its_share() {
        let mut r = record();
        r.ttw_buckets[0] = None;
        let f = derive_commute_features(&r);
        assert_eq!(f.pct_commute_lt10, None);
        assert_eq!(f.commute_min_proxy, None);
        assert!(close(f.pct_commute_10_19, 20.0));
    }

    #[test]
    fn derive_all_preserves_order() {
        let mut second = record();
        second.geoid = "04013010200".to_string();
        let all = derive_all(&[record(), second]);
        assert_eq!(all[0].geoid, "04013010100");
        assert_eq!(all[1].geoid, "04013010200");
    }
}
