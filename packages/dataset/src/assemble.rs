//! Left-joins rent, area and transit measures onto aggregated areas.

use std::collections::BTreeMap;

use commute_burden_dataset_models::{AreaRecord, DatasetRow};
use commute_burden_geography_models::fips::{ZCTA_WIDTH, zero_pad};
use commute_burden_source_models::{PoiCount, RentObservation};

use crate::DatasetError;
use crate::segments::income_segments;

/// Per-area geometry measures computed by the join engine and the
/// point-of-interest client.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaMeasures {
    pub zcta: String,
    /// Planar area in the region's UTM zone.
    pub area_km2: f64,
    pub transit: PoiCount,
}

/// Stops per square kilometre for one transit outcome.
///
/// A failed count stays missing; a confirmed empty area is `0.0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn transit_density(transit: &PoiCount, area_km2: f64) -> Option<f64> {
    match transit {
        PoiCount::Failed { .. } => None,
        PoiCount::Empty => Some(0.0),
        PoiCount::Found { count } => Some(if area_km2 > 0.0 {
            *count as f64 / area_km2
        } else {
            0.0
        }),
    }
}

/// Builds final rows, sorted by ZCTA.
///
/// Rent observations are optional per area. Every aggregated area must
/// have measures.
///
/// # Errors
///
/// * [`DatasetError::JoinIntegrity`] if an aggregated area has no
///   computed area
pub fn assemble(
    areas: Vec<AreaRecord>,
    rents: &[RentObservation],
    measures: &[AreaMeasures],
) -> Result<Vec<DatasetRow>, DatasetError> {
    let rents: BTreeMap<String, &RentObservation> = rents
        .iter()
        .map(|r| (zero_pad(&r.zip, ZCTA_WIDTH), r))
        .collect();
    let measures: BTreeMap<String, &AreaMeasures> = measures
        .iter()
        .map(|m| (zero_pad(&m.zcta, ZCTA_WIDTH), m))
        .collect();

    let mut rows = Vec::with_capacity(areas.len());
    let mut without_rent = 0_usize;
    let mut failed_transit = 0_usize;

    for mut area in areas {
        area.zcta = zero_pad(&area.zcta, ZCTA_WIDTH);

        let measure = measures
            .get(&area.zcta)
            .ok_or_else(|| DatasetError::JoinIntegrity {
                message: format!("reporting area {} has no computed area", area.zcta),
            })?;
        let rent = rents.get(&area.zcta);
        if rent.is_none() {
            without_rent += 1;
        }
        if measure.transit.is_failed() {
            failed_transit += 1;
        }

        let pop_density = area
            .total_pop
            .filter(|_| measure.area_km2 > 0.0)
            .map(|pop| pop / measure.area_km2);

        rows.push(DatasetRow {
            area_km2: Some(measure.area_km2),
            zori: rent.map(|r| r.zori),
            period: rent.map(|r| r.period.clone()),
            stops_per_km2: transit_density(&measure.transit, measure.area_km2),
            pop_density,
            income_segment: None,
            area,
        });
    }

    rows.sort_by(|a, b| a.area.zcta.cmp(&b.area.zcta));

    let incomes: Vec<_> = rows.iter().map(|r| r.area.median_income).collect();
    for (row, segment) in rows.iter_mut().zip(income_segments(&incomes)) {
        row.income_segment = segment;
    }

    if without_rent > 0 {
        log::info!("{without_rent} of {} areas have no rent index", rows.len());
    }
    if failed_transit > 0 {
        log::warn!(
            "{failed_transit} of {} areas have no transit density (count failed)",
            rows.len()
        );
    }

    Ok(rows)
}
