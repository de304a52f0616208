//! Boundary client for the Census Bureau `TIGERweb` REST API.
//!
//! Fetches the metro (CBSA) outline, ZCTAs by ZIP prefix and census
//! tracts by county, all as WGS84 polygons.

use std::collections::BTreeSet;

use commute_burden_geography_models::{
    BoundaryFeature, BoundaryKind,
    fips::{CodeKind, state_abbr, validate_code},
};
use commute_burden_region_models::CountyRef;

use crate::{SourceError, shape::normalize_feature, truncate_for_log};

/// CBSA (metro) boundaries layer.
pub const CBSA_QUERY_URL: &str =
    "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb/CBSA/MapServer/15/query";

/// ZCTA boundaries layer (ACS 2024 vintage).
pub const ZCTA_QUERY_URL: &str = "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb/tigerWMS_ACS2024/MapServer/2/query";

/// Census tract boundaries layer.
pub const TRACT_QUERY_URL: &str =
    "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb/Tracts_Blocks/MapServer/7/query";

/// Page size for paginated requests. Kept low to avoid WAF blocks on
/// large geospatial responses.
pub const PAGE_SIZE: u32 = 100;

/// Courtesy delay between pages.
const PAGE_DELAY: std::time::Duration = std::time::Duration::from_millis(100);

/// Attribute the ZCTA layer names `ZCTA5` and downstream code expects as
/// `ZCTA5CE`.
const ZCTA_LAYER_FIELD: &str = "ZCTA5";

/// Attribute name the final dataset keys reporting areas by.
pub const ZCTA_FIELD: &str = "ZCTA5CE";

/// Result of a paginated fetch.
///
/// A failure on a page after the first keeps what was already fetched and
/// records why the fetch stopped.
#[derive(Debug)]
pub struct PagedFetch {
    /// Raw features from every page that succeeded.
    pub features: Vec<serde_json::Value>,
    /// The error that ended pagination early, if any.
    pub stopped_early: Option<SourceError>,
}

impl PagedFetch {
    /// Resolves a paged fetch into its features.
    ///
    /// # Errors
    ///
    /// Returns the stopping error if nothing was fetched before it, or
    /// [`SourceError::NoDataFound`] if the fetch is `required` and came
    /// back empty without error.
    pub fn into_features(
        self,
        label: &str,
        required: bool,
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        match self.stopped_early {
            Some(e) if self.features.is_empty() => return Err(e),
            Some(e) => log::warn!(
                "{label}: pagination stopped early, keeping {} features: {e}",
                self.features.len()
            ),
            None => {}
        }

        if required && self.features.is_empty() {
            return Err(SourceError::NoDataFound {
                message: format!("{label}: query returned no features"),
            });
        }

        Ok(self.features)
    }
}

/// Fetches all features from a `TIGERweb` query endpoint using paginated
/// requests (`resultOffset` + `resultRecordCount`).
///
/// `params` holds every query parameter except the paging pair. Pages are
/// requested until one returns fewer rows than asked for.
pub async fn fetch_paginated(
    client: &reqwest::Client,
    base_url: &str,
    params: &[(&str, String)],
    label: &str,
) -> PagedFetch {
    let mut features: Vec<serde_json::Value> = Vec::new();
    let mut offset = 0u32;

    loop {
        let page = match fetch_page(client, base_url, params, offset).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("{label} (offset={offset}): {e}");
                return PagedFetch {
                    features,
                    stopped_early: Some(e),
                };
            }
        };

        let Some(page_features) = page.get("features").and_then(serde_json::Value::as_array)
        else {
            return PagedFetch {
                features,
                stopped_early: Some(SourceError::Conversion {
                    message: format!(
                        "No features array in TIGERweb response for {label} (offset={offset})"
                    ),
                }),
            };
        };

        let page_len = u32::try_from(page_features.len()).unwrap_or(u32::MAX);
        features.extend(page_features.iter().cloned());

        log::debug!(
            "{label}: fetched {page_len} features (total so far: {})",
            features.len()
        );

        let Some(next) = next_offset(offset, page_len) else {
            break;
        };
        offset = next;
        tokio::time::sleep(PAGE_DELAY).await;
    }

    PagedFetch {
        features,
        stopped_early: None,
    }
}

/// Offset of the page after one that started at `offset` and returned
/// `page_len` rows, or `None` when that page was the last one.
///
/// A short page ends pagination. A full page means more rows may follow,
/// even if the next page turns out empty.
#[must_use]
pub const fn next_offset(offset: u32, page_len: u32) -> Option<u32> {
    if page_len < PAGE_SIZE {
        None
    } else {
        offset.checked_add(page_len)
    }
}

/// Fetches a single page and checks it for an `ArcGIS` error envelope.
async fn fetch_page(
    client: &reqwest::Client,
    base_url: &str,
    params: &[(&str, String)],
    offset: u32,
) -> Result<serde_json::Value, SourceError> {
    let body = client
        .get(base_url)
        .query(params)
        .query(&[
            ("resultOffset", offset.to_string()),
            ("resultRecordCount", PAGE_SIZE.to_string()),
        ])
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let json: serde_json::Value =
        serde_json::from_str(&body).map_err(|e| SourceError::Conversion {
            message: format!(
                "TIGERweb returned non-JSON body ({e}): {}",
                truncate_for_log(&body, 500)
            ),
        })?;

    check_error_envelope(&json)?;

    Ok(json)
}

/// Checks for an `ArcGIS` error envelope:
/// `{"error": {"code": 500, "message": "..."}}`.
fn check_error_envelope(json: &serde_json::Value) -> Result<(), SourceError> {
    let Some(error_obj) = json.get("error") else {
        return Ok(());
    };

    let code = error_obj
        .get("code")
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(0);
    let msg = error_obj
        .get("message")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown");

    Err(SourceError::Service {
        service: "TIGERweb",
        message: format!("{code}: {msg}"),
    })
}

/// Normalizes raw features into boundaries, dropping features without an
/// id or polygon geometry and duplicate ids (first occurrence wins).
#[must_use]
pub fn normalize_features(
    raw: &[serde_json::Value],
    kind: BoundaryKind,
    id_field: &str,
    label: &str,
) -> Vec<BoundaryFeature> {
    let mut seen = BTreeSet::new();
    let mut unusable = 0usize;
    let mut duplicates = 0usize;
    let mut out = Vec::with_capacity(raw.len());

    for feature in raw {
        let Some(boundary) = normalize_feature(feature, id_field, kind.id_width()) else {
            unusable += 1;
            continue;
        };
        if !seen.insert(boundary.id.clone()) {
            duplicates += 1;
            continue;
        }
        out.push(boundary);
    }

    if unusable > 0 {
        log::warn!("{label}: skipped {unusable} {kind} features without an id or polygon geometry");
    }
    if duplicates > 0 {
        log::warn!("{label}: dropped {duplicates} duplicate {kind} ids (first occurrence kept)");
    }

    out
}

fn base_params(where_clause: String, out_fields: &str) -> Vec<(&'static str, String)> {
    vec![
        ("where", where_clause),
        ("outFields", out_fields.to_string()),
        ("returnGeometry", "true".to_string()),
        ("outSR", "4326".to_string()),
        ("f", "geojson".to_string()),
    ]
}

/// Fetches the outline of a metro area by its CBSA code.
///
/// # Errors
///
/// Returns [`SourceError::InvalidParameter`] for a malformed code,
/// [`SourceError::NoDataFound`] if the CBSA does not exist, or the
/// transport error if the request fails.
pub async fn fetch_metro_boundary(
    client: &reqwest::Client,
    cbsa_code: &str,
) -> Result<BoundaryFeature, SourceError> {
    validate_code(CodeKind::Cbsa, cbsa_code)?;

    let label = format!("CBSA {cbsa_code}");
    let params = base_params(format!("CBSA='{cbsa_code}'"), "CBSA,NAME");
    let raw = fetch_paginated(client, CBSA_QUERY_URL, &params, &label)
        .await
        .into_features(&label, true)?;

    let mut boundaries = normalize_features(&raw, BoundaryKind::Metro, "CBSA", &label);
    if boundaries.is_empty() {
        return Err(SourceError::NoDataFound {
            message: format!("{label}: no usable boundary geometry"),
        });
    }

    let boundary = boundaries.swap_remove(0);
    log::info!(
        "{label}: {}",
        boundary.attribute_str("NAME").unwrap_or("(unnamed)")
    );
    Ok(boundary)
}

/// Fetches every ZCTA whose code starts with one of `zip_prefixes`.
///
/// The layer's `ZCTA5` attribute is exposed as `ZCTA5CE`.
///
/// # Errors
///
/// Returns [`SourceError::InvalidParameter`] for a malformed prefix,
/// [`SourceError::NoDataFound`] if no prefix matched anything, or the
/// transport error if a prefix's first page fails.
pub async fn fetch_reporting_areas(
    client: &reqwest::Client,
    zip_prefixes: &[String],
) -> Result<Vec<BoundaryFeature>, SourceError> {
    for prefix in zip_prefixes {
        validate_code(CodeKind::ZipPrefix, prefix)?;
    }

    let mut raw = Vec::new();
    for prefix in zip_prefixes {
        let label = format!("ZCTA prefix '{prefix}'");
        let params = base_params(format!("ZCTA5 LIKE '{prefix}%'"), "ZCTA5,GEOID,NAME");
        let features = fetch_paginated(client, ZCTA_QUERY_URL, &params, &label)
            .await
            .into_features(&label, false)?;
        log::info!("{label}: fetched {} ZCTAs", features.len());
        raw.extend(features);
    }

    let mut areas = normalize_features(&raw, BoundaryKind::ReportingArea, ZCTA_LAYER_FIELD, "ZCTA");
    for area in &mut areas {
        if let Some(value) = area.attributes.remove(ZCTA_LAYER_FIELD) {
            area.attributes.insert(ZCTA_FIELD.to_string(), value);
        }
    }

    if areas.is_empty() {
        return Err(SourceError::NoDataFound {
            message: format!("no ZCTAs found for prefixes {zip_prefixes:?}"),
        });
    }

    Ok(areas)
}

/// Fetches census tracts for every county, one query per county.
///
/// # Errors
///
/// Returns [`SourceError::InvalidParameter`] for a malformed FIPS code,
/// [`SourceError::NoDataFound`] if no county returned tracts, or the
/// transport error if a county's first page fails.
pub async fn fetch_tracts(
    client: &reqwest::Client,
    counties: &[CountyRef],
) -> Result<Vec<BoundaryFeature>, SourceError> {
    for county in counties {
        validate_code(CodeKind::StateFips, &county.state_fips)?;
        validate_code(CodeKind::CountyFips, &county.county_fips)?;
    }

    let mut raw = Vec::new();
    for county in counties {
        let label = format!(
            "Tracts {} ({})",
            county,
            state_abbr(&county.state_fips)
        );
        let params = base_params(
            format!(
                "STATE='{}' AND COUNTY='{}'",
                county.state_fips, county.county_fips
            ),
            "GEOID,STATE,COUNTY,NAME",
        );
        let features = fetch_paginated(client, TRACT_QUERY_URL, &params, &label)
            .await
            .into_features(&label, false)?;
        log::info!("{label}: fetched {} tracts", features.len());
        raw.extend(features);
    }

    let tracts = normalize_features(&raw, BoundaryKind::Tract, "GEOID", "Tracts");
    if tracts.is_empty() {
        return Err(SourceError::NoDataFound {
            message: format!("no tracts found for {} counties", counties.len()),
        });
    }

    Ok(tracts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(id: &str) -> serde_json::Value {
        json!({
            "type": "Feature",
            "properties": { "GEOID": id },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]]
            }
        })
    }

    #[test]
    fn detects_error_envelope() {
        let err = check_error_envelope(&json!({
            "error": { "code": 400, "message": "Invalid query parameters" }
        }))
        .unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("Invalid query parameters"));

        assert!(check_error_envelope(&json!({ "features": [] })).is_ok());
    }

    #[test]
    fn normalize_drops_duplicates_first_wins() {
        let mut second = square("04013010100");
        second["properties"]["NAME"] = json!("second");
        let raw = vec![square("04013010100"), second, square("04013010200")];

        let tracts = normalize_features(&raw, BoundaryKind::Tract, "GEOID", "test");
        assert_eq!(tracts.len(), 2);
        assert_eq!(tracts[0].id, "04013010100");
        assert!(tracts[0].attribute_str("NAME").is_none());
    }

    #[test]
    fn normalize_pads_ids() {
        let raw = vec![square("4013010100")];
        let tracts = normalize_features(&raw, BoundaryKind::Tract, "GEOID", "test");
        assert_eq!(tracts[0].id, "04013010100");
    }

    #[test]
    fn full_page_advances_by_its_length() {
        assert_eq!(next_offset(0, PAGE_SIZE), Some(PAGE_SIZE));
        assert_eq!(next_offset(300, PAGE_SIZE), Some(300 + PAGE_SIZE));
    }

    #[test]
    fn short_or_empty_page_stops() {
        assert_eq!(next_offset(200, PAGE_SIZE - 1), None);
        assert_eq!(next_offset(200, 37), None);
        assert_eq!(next_offset(100, 0), None);
    }

    #[test]
    fn pages_are_requested_until_a_short_one() {
        let pages = [PAGE_SIZE, PAGE_SIZE, 37, PAGE_SIZE];
        let mut offsets = vec![0];
        for &page_len in &pages {
            let Some(next) = next_offset(*offsets.last().unwrap(), page_len) else {
                break;
            };
            offsets.push(next);
        }
        assert_eq!(offsets, vec![0, PAGE_SIZE, 2 * PAGE_SIZE]);
    }

    #[test]
    fn exactly_full_last_page_asks_for_one_more() {
        // 200 rows total: the second full page is followed by an empty one.
        let mut offsets = vec![0];
        for &page_len in &[PAGE_SIZE, PAGE_SIZE, 0] {
            match next_offset(*offsets.last().unwrap(), page_len) {
                Some(next) => offsets.push(next),
                None => break,
            }
        }
        assert_eq!(offsets, vec![0, PAGE_SIZE, 2 * PAGE_SIZE]);
    }

    #[test]
    fn partial_fetch_keeps_features() {
        let fetch = PagedFetch {
            features: vec![square("1")],
            stopped_early: Some(SourceError::Conversion {
                message: "page 2 broke".to_string(),
            }),
        };
        assert_eq!(fetch.into_features("test", true).unwrap().len(), 1);
    }

    #[test]
    fn failure_before_any_feature_propagates() {
        let fetch = PagedFetch {
            features: Vec::new(),
            stopped_early: Some(SourceError::Service {
                service: "TIGERweb",
                message: "500: boom".to_string(),
            }),
        };
        let err = fetch.into_features("test", false).unwrap_err();
        assert!(matches!(err, SourceError::Service { .. }));
    }

    #[test]
    fn empty_required_fetch_is_no_data() {
        let fetch = PagedFetch {
            features: Vec::new(),
            stopped_early: None,
        };
        assert!(matches!(
            fetch.into_features("test", true),
            Err(SourceError::NoDataFound { .. })
        ));

        let fetch = PagedFetch {
            features: Vec::new(),
            stopped_early: None,
        };
        assert!(fetch.into_features("test", false).unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_bad_codes_before_sending() {
        let client = reqwest::Client::new();
        assert!(matches!(
            fetch_metro_boundary(&client, "3806").await,
            Err(SourceError::InvalidParameter { .. })
        ));
        assert!(matches!(
            fetch_reporting_areas(&client, &["8%".to_string()]).await,
            Err(SourceError::InvalidParameter { .. })
        ));
        let county = CountyRef {
            state_fips: "4".to_string(),
            county_fips: "013".to_string(),
        };
        assert!(matches!(
            fetch_tracts(&client, &[county]).await,
            Err(SourceError::InvalidParameter { .. })
        ));
    }
}
