//! Runtime settings for a pipeline run.

use std::path::PathBuf;
use std::time::Duration;

use commute_burden_region::DEFAULT_REGION;
use commute_burden_source::DEFAULT_HTTP_TIMEOUT;
use commute_burden_source::overpass::DEFAULT_OVERPASS_URL;
use commute_burden_source::zori::DEFAULT_ZORI_URL;
use commute_burden_source_models::AcsYear;

use crate::paths;

/// Environment variable holding the Census API key.
pub const CENSUS_API_KEY_ENV: &str = "CENSUS_API_KEY";

/// Environment variable selecting the default region.
pub const METRO_ENV: &str = "METRO";

/// Everything a run needs besides the region itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Directory the final CSVs are written to.
    pub output_dir: PathBuf,
    /// Directory holding provider response caches.
    pub cache_dir: PathBuf,
    /// Optional Census API key. Anonymous requests are rate limited.
    pub census_api_key: Option<String>,
    /// Vintage of the commute/housing table.
    pub acs_year: AcsYear,
    /// Vintage of the demographics table.
    pub demographics_year: AcsYear,
    /// Per-request timeout.
    pub http_timeout: Duration,
    pub zori_url: String,
    pub overpass_url: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            output_dir: paths::final_dir(),
            cache_dir: paths::cache_dir(),
            census_api_key: None,
            acs_year: AcsYear::DEFAULT_COMMUTE,
            demographics_year: AcsYear::DEFAULT_DEMOGRAPHICS,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            zori_url: DEFAULT_ZORI_URL.to_string(),
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
        }
    }
}

impl PipelineSettings {
    /// Defaults, with the API key read from `CENSUS_API_KEY`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            census_api_key: non_empty_env(CENSUS_API_KEY_ENV),
            ..Self::default()
        }
    }

    /// Where the dataset for `region_id` is written.
    #[must_use]
    pub fn output_path(&self, region_id: &str) -> PathBuf {
        paths::dataset_path(&self.output_dir, region_id)
    }

    /// Directory of the Overpass count cache.
    #[must_use]
    pub fn overpass_cache_dir(&self) -> PathBuf {
        self.cache_dir.join("overpass")
    }
}

/// Region id from `METRO`, falling back to the default region.
#[must_use]
pub fn region_id_from_env() -> String {
    non_empty_env(METRO_ENV).unwrap_or_else(|| DEFAULT_REGION.to_string())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
