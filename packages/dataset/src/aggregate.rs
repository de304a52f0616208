//! Tract rows rolled up to reporting areas.

use std::collections::BTreeMap;

use commute_burden_dataset_models::AreaRecord;
use commute_burden_features::{CommuteFeatures, DemographicFeatures};
use commute_burden_spatial::TractMapping;

use crate::DatasetError;
use crate::weighted::{WeightedMean, sum_present};

/// Both feature tables for one tract.
#[derive(Debug, Clone, PartialEq)]
pub struct TractRow {
    pub geoid: String,
    pub commute: Option<CommuteFeatures>,
    pub demographics: Option<DemographicFeatures>,
}

impl TractRow {
    /// Tract population, the aggregation weight.
    #[must_use]
    pub fn population(&self) -> Option<f64> {
        self.demographics.as_ref().and_then(|d| d.total_pop)
    }
}

/// Outer-joins the commute and demographic tables on tract GEOID.
///
/// Duplicate GEOIDs within one table keep their first row. Output is
/// sorted by GEOID.
#[must_use]
pub fn join_tract_tables(
    commute: Vec<CommuteFeatures>,
    demographics: Vec<DemographicFeatures>,
) -> Vec<TractRow> {
    let mut rows: BTreeMap<String, TractRow> = BTreeMap::new();

    for features in commute {
        let row = rows.entry(features.geoid.clone()).or_insert_with(|| TractRow {
            geoid: features.geoid.clone(),
            commute: None,
            demographics: None,
        });
        if row.commute.is_none() {
            row.commute = Some(features);
        }
    }

    for features in demographics {
        let row = rows.entry(features.geoid.clone()).or_insert_with(|| TractRow {
            geoid: features.geoid.clone(),
            commute: None,
            demographics: None,
        });
        if row.demographics.is_none() {
            row.demographics = Some(features);
        }
    }

    rows.into_values().collect()
}

/// How much of the source population made it into the aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageReport {
    /// Tract rows offered to the aggregator.
    pub source_tracts: usize,
    /// Tract rows that had a reporting area.
    pub mapped_tracts: usize,
    /// Tract rows dropped because no reporting area contains them.
    pub unmatched_tracts: Vec<String>,
    pub source_population: f64,
    pub mapped_population: f64,
}

impl CoverageReport {
    /// Population of the dropped tracts.
    #[must_use]
    pub fn population_gap(&self) -> f64 {
        self.source_population - self.mapped_population
    }

    /// Mapped share of the source population, 0-100.
    #[must_use]
    pub fn population_coverage_pct(&self) -> Option<f64> {
        (self.source_population > 0.0)
            .then(|| self.mapped_population / self.source_population * 100.0)
    }
}

/// Aggregated areas plus the coverage report.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// One record per reporting area with at least one tract row, sorted
    /// by ZCTA.
    pub areas: Vec<AreaRecord>,
    pub coverage: CoverageReport,
}

/// Rolls tract rows up to the reporting areas in `mapping`.
///
/// Tract rows without an area are dropped and reported in the
/// [`CoverageReport`].
///
/// # Errors
///
/// * [`DatasetError::JoinIntegrity`] if there are tract rows and mapped
///   tracts but no GEOID in common, which means the two sides were keyed
///   differently rather than that some tracts fell outside the metro.
pub fn aggregate_to_areas(
    rows: &[TractRow],
    mapping: &TractMapping,
) -> Result<Aggregation, DatasetError> {
    let mut members: BTreeMap<&str, Vec<&TractRow>> = BTreeMap::new();
    let mut coverage = CoverageReport {
        source_tracts: rows.len(),
        ..CoverageReport::default()
    };

    for row in rows {
        let population = row.population().unwrap_or(0.0);
        coverage.source_population += population;

        match mapping.area_for(&row.geoid) {
            Some(area) => {
                coverage.mapped_tracts += 1;
                coverage.mapped_population += population;
                members.entry(area).or_default().push(row);
            }
            None => coverage.unmatched_tracts.push(row.geoid.clone()),
        }
    }

    if coverage.mapped_tracts == 0 && !rows.is_empty() && !mapping.is_empty() {
        return Err(DatasetError::JoinIntegrity {
            message: format!(
                "none of {} tract rows matched any of {} mapped tracts",
                rows.len(),
                mapping.assignments.len()
            ),
        });
    }

    if !coverage.unmatched_tracts.is_empty() {
        log::warn!(
            "{} tracts have no reporting area; population gap {} ({} of {})",
            coverage.unmatched_tracts.len(),
            coverage.population_gap(),
            coverage.mapped_population,
            coverage.source_population
        );
    }

    let areas = members
        .into_iter()
        .map(|(zcta, tracts)| aggregate_area(zcta, &tracts))
        .collect::<Vec<_>>();

    log::info!(
        "Aggregated {} of {} tracts into {} reporting areas",
        coverage.mapped_tracts,
        coverage.source_tracts,
        areas.len()
    );

    Ok(Aggregation { areas, coverage })
}

fn aggregate_area(zcta: &str, tracts: &[&TractRow]) -> AreaRecord {
    let commute = |field: fn(&CommuteFeatures) -> Option<f64>| {
        let mut mean = WeightedMean::new();
        for tract in tracts {
            mean.add(tract.commute.as_ref().and_then(field), tract.population());
        }
        mean.finish()
    };
    let demographic = |field: fn(&DemographicFeatures) -> Option<f64>| {
        let mut mean = WeightedMean::new();
        for tract in tracts {
            mean.add(tract.demographics.as_ref().and_then(field), tract.population());
        }
        mean.finish()
    };

    AreaRecord {
        zcta: zcta.to_string(),
        tract_count: tracts.len(),
        ttw_total: sum_present(
            tracts
                .iter()
                .map(|t| t.commute.as_ref().and_then(|c| c.ttw_total)),
        ),
        total_pop: sum_present(tracts.iter().map(|t| t.population())),
        rent_to_income: commute(|c| c.rent_to_income),
        commute_min_proxy: commute(|c| c.commute_min_proxy),
        pct_commute_lt10: commute(|c| c.pct_commute_lt10),
        pct_commute_10_19: commute(|c| c.pct_commute_10_19),
        pct_commute_20_29: commute(|c| c.pct_commute_20_29),
        pct_commute_30_44: commute(|c| c.pct_commute_30_44),
        pct_commute_45_59: commute(|c| c.pct_commute_45_59),
        pct_commute_60_plus: commute(|c| c.pct_commute_60_plus),
        pct_drive_alone: commute(|c| c.pct_drive_alone),
        pct_carpool: commute(|c| c.pct_carpool),
        pct_car: commute(|c| c.pct_car),
        pct_transit: commute(|c| c.pct_transit),
        pct_walk: commute(|c| c.pct_walk),
        pct_wfh: commute(|c| c.pct_wfh),
        pct_rent_burden_30: commute(|c| c.pct_rent_burden_30),
        pct_rent_burden_50: commute(|c| c.pct_rent_burden_50),
        renter_share: commute(|c| c.renter_share),
        vehicle_access: commute(|c| c.vehicle_access),
        pct_white: demographic(|d| d.pct_white),
        pct_black: demographic(|d| d.pct_black),
        pct_asian: demographic(|d| d.pct_asian),
        pct_hispanic: demographic(|d| d.pct_hispanic),
        pct_other: demographic(|d| d.pct_other),
        median_income: demographic(|d| d.median_income),
    }
}
