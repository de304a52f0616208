//! Region build stages and the batch loop.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use commute_burden_dataset::{
    AreaMeasures, CoverageReport, aggregate_to_areas, assemble, join_tract_tables, write_atomic,
    write_dataset,
};
use commute_burden_dataset_models::{DatasetRow, ID_COLUMN};
use commute_burden_features::{commute, demographics};
use commute_burden_geography_models::{BoundaryFeature, UtmZone};
use commute_burden_region::find_region;
use commute_burden_region_models::{InvalidRegionError, RegionConfig};
use commute_burden_source::progress::ProgressCallback;
use commute_burden_spatial::{area_km2, filter_areas_in_boundary, map_tracts_to_areas};

use crate::PipelineError;
use crate::settings::PipelineSettings;
use crate::sources::RegionSources;

/// The finished, not yet written, dataset of one region.
#[derive(Debug, Clone)]
pub struct RegionDataset {
    pub region_id: String,
    /// Final rows, sorted by ZCTA.
    pub rows: Vec<DatasetRow>,
    pub coverage: CoverageReport,
    /// ZCTAs whose transit count failed (missing `stops_per_km2`).
    pub transit_failures: usize,
}

/// Outcome of a successful [`run_region`].
#[derive(Debug, Clone)]
pub struct RegionSummary {
    pub region_id: String,
    pub output: PathBuf,
    pub rows: usize,
    pub unmatched_tracts: usize,
    pub population_coverage_pct: Option<f64>,
    pub transit_failures: usize,
    pub elapsed: Duration,
}

/// Looks up a registered region by id.
///
/// # Errors
///
/// Returns [`PipelineError::UnknownRegion`] if no region has this id.
pub fn resolve_region(id: &str) -> Result<RegionConfig, PipelineError> {
    find_region(id).ok_or_else(|| PipelineError::UnknownRegion(id.to_string()))
}

fn region_zone(region: &RegionConfig) -> Result<UtmZone, PipelineError> {
    region.validate()?;
    region.utm_zone().ok_or_else(|| {
        PipelineError::InvalidRegion(InvalidRegionError {
            region: region.id.clone(),
            message: format!("EPSG:{} is not a UTM zone", region.utm_epsg),
        })
    })
}

/// Fetches the region's ZCTAs and keeps those whose centroid lies
/// inside the metro boundary. Output is sorted by ZCTA.
///
/// # Errors
///
/// Returns [`PipelineError`] if the region is invalid, a boundary fetch
/// fails, or no ZCTA lies inside the metro.
pub async fn region_boundaries(
    region: &RegionConfig,
    sources: &dyn RegionSources,
) -> Result<Vec<BoundaryFeature>, PipelineError> {
    let zone = region_zone(region)?;

    let metro = sources.metro_boundary(&region.cbsa_code).await?;
    let areas = sources.reporting_areas(&region.zip_prefixes).await?;

    let mut areas = filter_areas_in_boundary(areas, &metro, zone);
    if areas.is_empty() {
        return Err(PipelineError::NoDataFound {
            message: format!(
                "{}: no ZCTA centroid lies inside CBSA {}",
                region.id, region.cbsa_code
            ),
        });
    }
    areas.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(areas)
}

/// Builds the dataset for one region without writing it.
///
/// # Errors
///
/// Returns [`PipelineError`] if the region is invalid, a boundary or
/// survey fetch fails, no tract maps to a ZCTA, or a required join
/// loses rows. Individual transit count failures do not abort the build.
#[allow(clippy::too_many_lines)]
pub async fn build_region_dataset(
    region: &RegionConfig,
    settings: &PipelineSettings,
    sources: &dyn RegionSources,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<RegionDataset, PipelineError> {
    let zone = region_zone(region)?;
    log::info!(
        "=== {} ({}), CBSA {}, {zone} ===",
        region.name,
        region.id,
        region.cbsa_code
    );

    log::info!("STEP 1: metro boundary and ZCTAs");
    let areas = region_boundaries(region, sources).await?;

    log::info!("STEP 2: census tracts for {} counties", region.counties.len());
    let tracts = sources.tracts(&region.counties).await?;
    let mapping = map_tracts_to_areas(&tracts, &areas, zone);

    log::info!(
        "STEP 3: survey tables (commute {}, demographics {})",
        settings.acs_year,
        settings.demographics_year
    );
    let mut commute_features = Vec::new();
    let mut demographic_features = Vec::new();
    for county in &region.counties {
        let records = sources.commute_records(county, settings.acs_year).await?;
        log::info!("County {county}: {} commute rows", records.len());
        commute_features.extend(commute::derive_all(&records));

        let records = sources
            .demographic_records(county, settings.demographics_year)
            .await?;
        log::info!("County {county}: {} demographic rows", records.len());
        demographic_features.extend(demographics::derive_all(&records));
    }
    let tract_rows = join_tract_tables(commute_features, demographic_features);

    log::info!("STEP 4: aggregate {} tracts to ZCTAs", tract_rows.len());
    let aggregation = aggregate_to_areas(&tract_rows, &mapping)?;
    if aggregation.areas.is_empty() {
        return Err(PipelineError::NoDataFound {
            message: format!("{}: no surveyed tract maps to a ZCTA", region.id),
        });
    }

    log::info!("STEP 5: rent index");
    let rents = sources.rent_index().await?;
    log::info!("Rent index: {} ZIPs", rents.len());

    let needed: BTreeSet<&str> = aggregation.areas.iter().map(|a| a.zcta.as_str()).collect();
    let areas: Vec<&BoundaryFeature> = areas
        .iter()
        .filter(|a| needed.contains(a.id.as_str()))
        .collect();

    log::info!("STEP 6: area and transit density for {} ZCTAs", areas.len());
    progress.set_total(areas.len() as u64);
    let mut measures = Vec::with_capacity(areas.len());
    for area in areas {
        progress.set_message(format!("ZCTA {}", area.id));
        let transit = sources.transit_count(&area.id, &area.geometry).await;
        measures.push(AreaMeasures {
            zcta: area.id.clone(),
            area_km2: area_km2(&area.geometry, zone),
            transit,
        });
        progress.inc(1);
    }
    let transit_failures = measures.iter().filter(|m| m.transit.is_failed()).count();
    progress.finish(format!(
        "{}: {} ZCTAs measured ({transit_failures} transit failures)",
        region.id,
        measures.len()
    ));

    log::info!("STEP 7: assemble");
    let coverage = aggregation.coverage;
    let rows = assemble(aggregation.areas, &rents, &measures)?;

    Ok(RegionDataset {
        region_id: region.id.clone(),
        rows,
        coverage,
        transit_failures,
    })
}

/// Builds one region and writes its CSV.
///
/// # Errors
///
/// Returns [`PipelineError`] if the build or the write fails. Nothing is
/// written on failure.
pub async fn run_region(
    region: &RegionConfig,
    settings: &PipelineSettings,
    sources: &dyn RegionSources,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<RegionSummary, PipelineError> {
    let start = Instant::now();

    let dataset = build_region_dataset(region, settings, sources, progress).await?;
    let output = settings.output_path(&region.id);
    write_dataset(&output, &dataset.rows)?;

    let summary = RegionSummary {
        region_id: dataset.region_id,
        output,
        rows: dataset.rows.len(),
        unmatched_tracts: dataset.coverage.unmatched_tracts.len(),
        population_coverage_pct: dataset.coverage.population_coverage_pct(),
        transit_failures: dataset.transit_failures,
        elapsed: start.elapsed(),
    };

    log::info!(
        "{}: {} ZCTAs, {} unmatched tracts, population coverage {}, {} transit failures in {:.1}s",
        summary.region_id,
        summary.rows,
        summary.unmatched_tracts,
        summary
            .population_coverage_pct
            .map_or_else(|| "n/a".to_string(), |pct| format!("{pct:.1}%")),
        summary.transit_failures,
        summary.elapsed.as_secs_f64()
    );

    Ok(summary)
}

/// Per-region outcomes of a batch run, in run order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(String, Result<RegionSummary, PipelineError>)>,
}

impl BatchReport {
    /// Number of regions that failed.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_err()).count()
    }

    /// Logs one line per region.
    pub fn log_summary(&self) {
        log::info!(
            "Batch complete: {} succeeded, {} failed",
            self.outcomes.len() - self.failures(),
            self.failures()
        );
        for (region, outcome) in &self.outcomes {
            match outcome {
                Ok(summary) => log::info!(
                    "  {region}: OK, {} rows -> {}",
                    summary.rows,
                    summary.output.display()
                ),
                Err(e) => log::error!("  {region}: FAILED ({}): {e}", e.kind()),
            }
        }
    }
}

/// Runs every region in order. A failing region is logged and the loop
/// moves on. `progress_for` supplies a fresh progress reporter per region.
pub async fn run_batch(
    regions: &[RegionConfig],
    settings: &PipelineSettings,
    sources: &dyn RegionSources,
    progress_for: impl Fn(&RegionConfig) -> Arc<dyn ProgressCallback>,
) -> BatchReport {
    let mut report = BatchReport::default();

    for (i, region) in regions.iter().enumerate() {
        log::info!("[{}/{}] {}", i + 1, regions.len(), region.id);
        let progress = progress_for(region);
        let outcome = run_region(region, settings, sources, &progress).await;
        if let Err(e) = &outcome {
            log::error!("Region {} failed: {e}", region.id);
        }
        report.outcomes.push((region.id.clone(), outcome));
    }

    report.log_summary();
    report
}

/// Writes reporting-area boundaries as a `GeoJSON` feature collection
/// with a `ZCTA5CE` property. Written like the dataset CSV: temporary
/// sibling file, then rename.
///
/// # Errors
///
/// Returns [`PipelineError`] if the file cannot be written.
pub fn export_boundaries(areas: &[BoundaryFeature], path: &Path) -> Result<(), PipelineError> {
    let features = areas
        .iter()
        .map(|area| {
            let mut properties = serde_json::Map::new();
            properties.insert(
                ID_COLUMN.to_string(),
                serde_json::Value::String(area.id.clone()),
            );
            geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&area.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let collection = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    write_atomic(path, collection.to_string().as_bytes())?;

    log::info!("Wrote {} ZCTA boundaries to {}", areas.len(), path.display());
    Ok(())
}
