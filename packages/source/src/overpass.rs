//! Transit stop counts from the `OpenStreetMap` Overpass API.
//!
//! Each reporting area is queried with its own polygon. The primary query
//! matches `public_transport` platforms, stops and stations; when that
//! finds nothing, a second query counts `highway=bus_stop` nodes, which
//! covers areas whose stops were never tagged with the newer scheme.

use std::fmt::Write as _;
use std::time::Duration;

use commute_burden_source_models::PoiCount;
use geo::MultiPolygon;

use crate::{SourceError, cache::QueryCache, truncate_for_log};

/// Public Overpass endpoint.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Primary transit tag filter.
pub const TRANSIT_FILTER: &str = r#"["public_transport"~"platform|stop|station"]"#;

/// Fallback tag filter for areas without `public_transport` tagging.
pub const BUS_STOP_FILTER: &str = r#"["highway"="bus_stop"]"#;

/// Server-side query timeout, in seconds.
const QUERY_TIMEOUT_SECS: u32 = 180;

/// Pause after every network query. The public endpoint allows only a
/// couple of concurrent slots per client.
const REQUEST_DELAY: Duration = Duration::from_millis(500);

/// Builds the Overpass `poly:` filter text for each exterior ring.
///
/// Coordinates are `lat lon` pairs at six decimals (about 0.1 m).
///
/// Interior rings are dropped: `poly:` takes a single outer ring, so a
/// stop inside a hole of the area is counted for the area. Holes in ZCTA
/// outlines are small enclaves of another ZCTA; subtracting them would
/// cost one extra query per hole and per filter.
#[must_use]
pub fn polygon_filters(area: &MultiPolygon<f64>) -> Vec<String> {
    area.0
        .iter()
        .filter(|p| p.exterior().0.len() >= 4)
        .map(|p| {
            let mut coords = String::new();
            for (i, c) in p.exterior().0.iter().enumerate() {
                if i > 0 {
                    coords.push(' ');
                }
                let _ = write!(coords, "{:.6} {:.6}", c.y, c.x);
            }
            format!("poly:\"{coords}\"")
        })
        .collect()
}

/// Builds an Overpass QL query counting elements matching `tag_filter`
/// inside `area`. Returns `None` if the area has no usable ring.
#[must_use]
pub fn build_query(area: &MultiPolygon<f64>, tag_filter: &str) -> Option<String> {
    let polys = polygon_filters(area);
    if polys.is_empty() {
        return None;
    }

    let mut query = format!("[out:json][timeout:{QUERY_TIMEOUT_SECS}];\n(\n");
    for poly in &polys {
        let _ = writeln!(query, "  nwr{tag_filter}({poly});");
    }
    query.push_str(");\nout count;\n");
    Some(query)
}

/// Extracts the element count from an `out count;` response.
///
/// # Errors
///
/// Returns [`SourceError::Service`] if the server reported a runtime
/// error (it does so with a 200 and a `remark`), or
/// [`SourceError::Conversion`] if no count element is present.
pub fn parse_count_response(json: &serde_json::Value) -> Result<u64, SourceError> {
    if let Some(remark) = json.get("remark").and_then(serde_json::Value::as_str)
        && remark.contains("error")
    {
        return Err(SourceError::Service {
            service: "Overpass",
            message: truncate_for_log(remark, 300),
        });
    }

    let elements = json
        .get("elements")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| SourceError::Conversion {
            message: "Overpass response has no elements array".to_string(),
        })?;

    let count_element = elements
        .iter()
        .find(|e| e.get("type").and_then(serde_json::Value::as_str) == Some("count"))
        .ok_or_else(|| SourceError::Conversion {
            message: "Overpass response has no count element".to_string(),
        })?;

    let total = count_element
        .get("tags")
        .and_then(|t| t.get("total"))
        .ok_or_else(|| SourceError::Conversion {
            message: "Overpass count element has no total".to_string(),
        })?;

    match total {
        serde_json::Value::String(s) => s.parse().map_err(|e| SourceError::Conversion {
            message: format!("Overpass count '{s}' is not an integer: {e}"),
        }),
        serde_json::Value::Number(n) => n.as_u64().ok_or_else(|| SourceError::Conversion {
            message: format!("Overpass count {n} is not an integer"),
        }),
        other => Err(SourceError::Conversion {
            message: format!("Overpass count has unexpected type: {other}"),
        }),
    }
}

/// Counts transit stops per polygon, with an optional on-disk cache.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    endpoint: String,
    cache: Option<QueryCache>,
}

impl OverpassClient {
    #[must_use]
    pub const fn new(client: reqwest::Client, endpoint: String, cache: Option<QueryCache>) -> Self {
        Self {
            client,
            endpoint,
            cache,
        }
    }

    /// Counts transit features inside `area`.
    ///
    /// A failed primary query is reported as [`PoiCount::Failed`] without
    /// trying the fallback, so service trouble never reads as "no stops".
    pub async fn count_transit(&self, area: &MultiPolygon<f64>) -> PoiCount {
        match self.count(area, TRANSIT_FILTER).await {
            Ok(0) => {}
            Ok(n) => return PoiCount::from_count(n),
            Err(e) => {
                return PoiCount::Failed {
                    reason: e.to_string(),
                };
            }
        }

        match self.count(area, BUS_STOP_FILTER).await {
            Ok(n) => PoiCount::from_count(n),
            Err(e) => PoiCount::Failed {
                reason: format!("bus stop fallback: {e}"),
            },
        }
    }

    /// Counts elements matching `tag_filter` inside `area`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidParameter`] for an area without a
    /// usable ring, or the transport/service error of the request.
    pub async fn count(
        &self,
        area: &MultiPolygon<f64>,
        tag_filter: &str,
    ) -> Result<u64, SourceError> {
        let query = build_query(area, tag_filter).ok_or_else(|| SourceError::InvalidParameter {
            message: "area has no polygon ring to query".to_string(),
        })?;

        if let Some(count) = self.cache.as_ref().and_then(|c| c.lookup(&query)) {
            log::trace!("Overpass cache hit ({count})");
            return Ok(count);
        }

        let result = self.post(&query).await;
        tokio::time::sleep(REQUEST_DELAY).await;
        let count = result?;

        if let Some(cache) = &self.cache
            && let Err(e) = cache.store(&query, count)
        {
            log::warn!("Failed to cache Overpass result: {e}");
        }

        Ok(count)
    }

    async fn post(&self, query: &str) -> Result<u64, SourceError> {
        let body = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let json: serde_json::Value =
            serde_json::from_str(&body).map_err(|_| SourceError::Service {
                service: "Overpass",
                message: truncate_for_log(body.trim(), 300),
            })?;

        parse_count_response(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon, polygon};
    use serde_json::json;

    fn square() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: -112.1, y: 33.4),
            (x: -112.0, y: 33.4),
            (x: -112.0, y: 33.5),
            (x: -112.1, y: 33.5),
            (x: -112.1, y: 33.4),
        ]])
    }

    #[test]
    fn query_uses_lat_lon_order() {
        let query = build_query(&square(), TRANSIT_FILTER).unwrap();
        assert!(query.starts_with("[out:json][timeout:180];"));
        assert!(query.contains("poly:\"33.400000 -112.100000 33.400000 -112.000000"));
        assert!(query.contains(r#"nwr["public_transport"~"platform|stop|station"]"#));
        assert!(query.trim_end().ends_with("out count;"));
    }

    #[test]
    fn query_is_deterministic() {
        assert_eq!(
            build_query(&square(), BUS_STOP_FILTER),
            build_query(&square(), BUS_STOP_FILTER)
        );
    }

    #[test]
    fn one_clause_per_polygon() {
        let mut area = square();
        area.0.push(square().0[0].clone());
        let query = build_query(&area, BUS_STOP_FILTER).unwrap();
        assert_eq!(query.matches("nwr[").count(), 2);
    }

    #[test]
    fn empty_area_has_no_query() {
        assert!(build_query(&MultiPolygon(vec![]), TRANSIT_FILTER).is_none());
    }

    #[test]
    fn parses_count_element() {
        let body = json!({
            "version": 0.6,
            "elements": [{
                "type": "count",
                "id": 0,
                "tags": { "nodes": "12", "ways": "0", "relations": "0", "total": "12" }
            }]
        });
        assert_eq!(parse_count_response(&body).unwrap(), 12);
    }

    #[test]
    fn runtime_remark_is_a_service_error() {
        let body = json!({
            "elements": [],
            "remark": "runtime error: Query timed out in \"query\" at line 3 after 180 seconds."
        });
        let err = parse_count_response(&body).unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn missing_count_is_conversion_error() {
        let err = parse_count_response(&json!({ "elements": [] })).unwrap_err();
        assert!(matches!(err, SourceError::Conversion { .. }));
    }

    fn seeded_client(name: &str, seed: &[(&str, u64)]) -> (OverpassClient, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "commute_burden_overpass_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        let cache = QueryCache::open(&dir).unwrap();
        for (filter, count) in seed {
            cache
                .store(&build_query(&square(), filter).unwrap(), *count)
                .unwrap();
        }

        // Unroutable endpoint: any network attempt fails the count.
        let client = OverpassClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/interpreter".to_string(),
            Some(cache),
        );
        (client, dir)
    }

    #[tokio::test]
    async fn cached_counts_skip_the_network() {
        let (client, dir) =
            seeded_client("empty", &[(TRANSIT_FILTER, 0), (BUS_STOP_FILTER, 0)]);
        assert_eq!(client.count_transit(&square()).await, PoiCount::Empty);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn primary_hits_skip_the_bus_stop_query() {
        let (client, dir) = seeded_client("primary", &[(TRANSIT_FILTER, 5)]);
        assert_eq!(
            client.count_transit(&square()).await,
            PoiCount::Found { count: 5 }
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn zero_primary_falls_back_to_bus_stops() {
        let (client, dir) =
            seeded_client("fallback", &[(TRANSIT_FILTER, 0), (BUS_STOP_FILTER, 7)]);
        assert_eq!(
            client.count_transit(&square()).await,
            PoiCount::Found { count: 7 }
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn failed_primary_does_not_try_the_fallback() {
        // Only the fallback is cached; a fallback run would yield Found(7).
        let (client, dir) = seeded_client("failed", &[(BUS_STOP_FILTER, 7)]);
        match client.count_transit(&square()).await {
            PoiCount::Failed { reason } => {
                assert!(!reason.starts_with("bus stop fallback"), "{reason}");
            }
            other => panic!("expected a failed count, got {other:?}"),
        }
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn failed_fallback_is_reported_as_failed() {
        let (client, dir) = seeded_client("fallback_failed", &[(TRANSIT_FILTER, 0)]);
        match client.count_transit(&square()).await {
            PoiCount::Failed { reason } => assert!(reason.starts_with("bus stop fallback")),
            other => panic!("expected a failed count, got {other:?}"),
        }
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn holes_are_not_part_of_the_filter() {
        let area = MultiPolygon(vec![Polygon::new(
            LineString::from(vec![
                (-112.1, 33.4),
                (-112.0, 33.4),
                (-112.0, 33.5),
                (-112.1, 33.5),
                (-112.1, 33.4),
            ]),
            vec![LineString::from(vec![
                (-112.06, 33.44),
                (-112.04, 33.44),
                (-112.04, 33.46),
                (-112.06, 33.44),
            ])],
        )]);
        let filters = polygon_filters(&area);
        assert_eq!(filters.len(), 1);
        assert!(!filters[0].contains("33.460000"));
    }
}
