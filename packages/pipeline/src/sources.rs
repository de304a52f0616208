//! Data providers a region build draws from.
//!
//! [`RegionSources`] is the seam between orchestration and the network:
//! [`HttpSources`] talks to the real services, tests substitute in-memory
//! fixtures.

use commute_burden_geography_models::BoundaryFeature;
use commute_burden_region_models::CountyRef;
use commute_burden_source::cache::QueryCache;
use commute_burden_source::overpass::OverpassClient;
use commute_burden_source::{SourceError, acs, build_client, tigerweb, zori};
use commute_burden_source_models::{
    AcsYear, CommuteRecord, DemographicRecord, PoiCount, RentObservation,
};
use geo::MultiPolygon;
use tokio::sync::OnceCell;

use crate::settings::PipelineSettings;

/// Every external input of a region build.
#[async_trait::async_trait]
pub trait RegionSources: Send + Sync {
    /// Outline of the metro (CBSA).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the boundary cannot be fetched.
    async fn metro_boundary(&self, cbsa_code: &str) -> Result<BoundaryFeature, SourceError>;

    /// ZCTAs whose code starts with one of `zip_prefixes`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the boundaries cannot be fetched.
    async fn reporting_areas(
        &self,
        zip_prefixes: &[String],
    ) -> Result<Vec<BoundaryFeature>, SourceError>;

    /// Census tracts of every county.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the boundaries cannot be fetched.
    async fn tracts(&self, counties: &[CountyRef]) -> Result<Vec<BoundaryFeature>, SourceError>;

    /// Commute/housing survey table for one county.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the table cannot be fetched.
    async fn commute_records(
        &self,
        county: &CountyRef,
        year: AcsYear,
    ) -> Result<Vec<CommuteRecord>, SourceError>;

    /// Demographics survey table for one county.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the table cannot be fetched.
    async fn demographic_records(
        &self,
        county: &CountyRef,
        year: AcsYear,
    ) -> Result<Vec<DemographicRecord>, SourceError>;

    /// Latest rent-index observation per ZIP.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the index cannot be fetched.
    async fn rent_index(&self) -> Result<Vec<RentObservation>, SourceError>;

    /// Transit stops inside one reporting area. Never fails: problems
    /// are reported as [`PoiCount::Failed`].
    async fn transit_count(&self, zcta: &str, area: &MultiPolygon<f64>) -> PoiCount;
}

/// [`RegionSources`] backed by TIGERweb, the Census API, Zillow and
/// Overpass.
pub struct HttpSources {
    client: reqwest::Client,
    overpass: OverpassClient,
    census_api_key: Option<String>,
    zori_url: String,
    /// The rent index is one national file; download it once per process.
    rent_index: OnceCell<Vec<RentObservation>>,
}

impl HttpSources {
    /// Builds the HTTP client and opens the Overpass cache.
    ///
    /// A cache directory that cannot be created disables caching rather
    /// than failing the run.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the HTTP client cannot be built.
    pub fn new(settings: &PipelineSettings) -> Result<Self, SourceError> {
        let client = build_client(settings.http_timeout)?;

        let cache_dir = settings.overpass_cache_dir();
        let cache = match QueryCache::open(&cache_dir) {
            Ok(cache) => Some(cache),
            Err(e) => {
                log::warn!(
                    "Overpass cache disabled ({}): {e}",
                    cache_dir.display()
                );
                None
            }
        };

        Ok(Self {
            overpass: OverpassClient::new(client.clone(), settings.overpass_url.clone(), cache),
            client,
            census_api_key: settings.census_api_key.clone(),
            zori_url: settings.zori_url.clone(),
            rent_index: OnceCell::new(),
        })
    }
}

#[async_trait::async_trait]
impl RegionSources for HttpSources {
    async fn metro_boundary(&self, cbsa_code: &str) -> Result<BoundaryFeature, SourceError> {
        tigerweb::fetch_metro_boundary(&self.client, cbsa_code).await
    }

    async fn reporting_areas(
        &self,
        zip_prefixes: &[String],
    ) -> Result<Vec<BoundaryFeature>, SourceError> {
        tigerweb::fetch_reporting_areas(&self.client, zip_prefixes).await
    }

    async fn tracts(&self, counties: &[CountyRef]) -> Result<Vec<BoundaryFeature>, SourceError> {
        tigerweb::fetch_tracts(&self.client, counties).await
    }

    async fn commute_records(
        &self,
        county: &CountyRef,
        year: AcsYear,
    ) -> Result<Vec<CommuteRecord>, SourceError> {
        acs::fetch_commute_records(&self.client, county, year, self.census_api_key.as_deref())
            .await
    }

    async fn demographic_records(
        &self,
        county: &CountyRef,
        year: AcsYear,
    ) -> Result<Vec<DemographicRecord>, SourceError> {
        acs::fetch_demographic_records(&self.client, county, year, self.census_api_key.as_deref())
            .await
    }

    async fn rent_index(&self) -> Result<Vec<RentObservation>, SourceError> {
        let observations = self
            .rent_index
            .get_or_try_init(|| zori::fetch_rent_index(&self.client, &self.zori_url))
            .await?;
        Ok(observations.clone())
    }

    async fn transit_count(&self, zcta: &str, area: &MultiPolygon<f64>) -> PoiCount {
        let outcome = self.overpass.count_transit(area).await;
        if let PoiCount::Failed { reason } = &outcome {
            log::warn!("ZCTA {zcta}: transit count failed: {reason}");
        }
        outcome
    }
}
