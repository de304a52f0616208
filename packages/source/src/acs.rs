//! Survey client for the Census ACS 5-year API.
//!
//! One request per county returns every tract in it:
//!
//! ```text
//! [["B25064_001E","B19013_001E","state","county","tract"],
//!  ["1181","52000","04","013","010100"], ...]
//! ```

use std::collections::{BTreeMap, BTreeSet};

use commute_burden_geography_models::fips::{CodeKind, tract_geoid, validate_code};
use commute_burden_region_models::CountyRef;
use commute_burden_source_models::{
    AcsYear, COMMUTE_VARIABLES, CommuteRecord, DEMOGRAPHIC_VARIABLES, DemographicRecord,
    SurveyRow, SurveyVariable,
};

use crate::{SourceError, truncate_for_log};

/// Base URL of the ACS 5-year detailed tables for a vintage.
#[must_use]
pub fn survey_url(year: AcsYear) -> String {
    format!("https://api.census.gov/data/{year}/acs/acs5")
}

/// Fetches the named variables for every tract in one county.
///
/// # Errors
///
/// Returns [`SourceError::InvalidParameter`] for malformed FIPS codes or
/// an empty variable list, the transport error if the request fails, or
/// [`SourceError::Conversion`] if the body is not the expected table.
pub async fn fetch_survey_table(
    client: &reqwest::Client,
    county: &CountyRef,
    year: AcsYear,
    variables: &[SurveyVariable],
    api_key: Option<&str>,
) -> Result<Vec<SurveyRow>, SourceError> {
    validate_code(CodeKind::StateFips, &county.state_fips)?;
    validate_code(CodeKind::CountyFips, &county.county_fips)?;
    if variables.is_empty() {
        return Err(SourceError::InvalidParameter {
            message: "no survey variables requested".to_string(),
        });
    }

    let get = variables
        .iter()
        .map(|v| v.code)
        .collect::<Vec<_>>()
        .join(",");

    let mut query = vec![
        ("get", get),
        ("for", "tract:*".to_string()),
        (
            "in",
            format!("state:{} county:{}", county.state_fips, county.county_fips),
        ),
    ];
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        query.push(("key", key.trim().to_string()));
    }

    log::info!(
        "Fetching ACS {year} table ({} variables) for county {county}...",
        variables.len()
    );

    let body = client
        .get(survey_url(year))
        .query(&query)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    // The API answers some errors (bad key, unknown variable) with a 200
    // and an HTML or plain-text body.
    let json: serde_json::Value =
        serde_json::from_str(&body).map_err(|_| SourceError::Service {
            service: "ACS",
            message: truncate_for_log(body.trim(), 300),
        })?;

    let rows = parse_survey_response(&json, variables, year)?;
    log::info!("County {county}: {} tracts in ACS {year}", rows.len());
    Ok(rows)
}

/// Parses an ACS table response into rows keyed by tract GEOID.
///
/// Cells that are `null` or not numeric become `None`. Sentinel codes are
/// kept as-is. Rows with a repeated GEOID are dropped (first wins).
///
/// # Errors
///
/// Returns [`SourceError::Conversion`] if the body is not an array of
/// arrays or the header lacks a requested variable or a geography column.
pub fn parse_survey_response(
    json: &serde_json::Value,
    variables: &[SurveyVariable],
    year: AcsYear,
) -> Result<Vec<SurveyRow>, SourceError> {
    let conversion = |message: String| SourceError::Conversion { message };

    let table = json
        .as_array()
        .ok_or_else(|| conversion("ACS response is not an array".to_string()))?;
    let Some((header, data)) = table.split_first() else {
        return Ok(Vec::new());
    };

    let header = header
        .as_array()
        .ok_or_else(|| conversion("ACS header row is not an array".to_string()))?;
    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.as_str() == Some(name))
            .ok_or_else(|| conversion(format!("ACS header is missing column '{name}'")))
    };

    let state_idx = column("state")?;
    let county_idx = column("county")?;
    let tract_idx = column("tract")?;
    let variable_idx = variables
        .iter()
        .map(|v| column(v.code).map(|idx| (v.name, idx)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = BTreeSet::new();
    let mut rows = Vec::with_capacity(data.len());

    for row in data {
        let Some(cells) = row.as_array() else {
            continue;
        };
        let (Some(state), Some(county), Some(tract)) = (
            cell_str(cells, state_idx),
            cell_str(cells, county_idx),
            cell_str(cells, tract_idx),
        ) else {
            continue;
        };

        let geoid = tract_geoid(state, county, tract);
        if !seen.insert(geoid.clone()) {
            log::debug!("Dropping duplicate ACS row for tract {geoid}");
            continue;
        }

        let values = variable_idx
            .iter()
            .map(|(name, idx)| ((*name).to_string(), cell_number(cells, *idx)))
            .collect::<BTreeMap<_, _>>();

        rows.push(SurveyRow { geoid, year, values });
    }

    Ok(rows)
}

fn cell_str(cells: &[serde_json::Value], idx: usize) -> Option<&str> {
    cells.get(idx)?.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn cell_number(cells: &[serde_json::Value], idx: usize) -> Option<f64> {
    match cells.get(idx)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Fetches the commute/housing table for one county.
///
/// # Errors
///
/// See [`fetch_survey_table`].
pub async fn fetch_commute_records(
    client: &reqwest::Client,
    county: &CountyRef,
    year: AcsYear,
    api_key: Option<&str>,
) -> Result<Vec<CommuteRecord>, SourceError> {
    let rows = fetch_survey_table(client, county, year, COMMUTE_VARIABLES, api_key).await?;
    Ok(rows.iter().map(CommuteRecord::from).collect())
}

/// Fetches the demographics table for one county.
///
/// # Errors
///
/// See [`fetch_survey_table`].
pub async fn fetch_demographic_records(
    client: &reqwest::Client,
    county: &CountyRef,
    year: AcsYear,
    api_key: Option<&str>,
) -> Result<Vec<DemographicRecord>, SourceError> {
    let rows = fetch_survey_table(client, county, year, DEMOGRAPHIC_VARIABLES, api_key).await?;
    Ok(rows.iter().map(DemographicRecord::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_vintage_url() {
        assert_eq!(
            survey_url(AcsYear::Y2021),
            "https://api.census.gov/data/2021/acs/acs5"
        );
    }

    #[test]
    fn parses_demographics_table() {
        let body = json!([
            ["B03002_001E", "B03002_012E", "B03002_003E", "B03002_004E", "B03002_006E", "B19013_001E", "state", "county", "tract"],
            ["4200", "1000", "2500", "300", "200", "-666666666", "04", "013", "010100"],
            ["0", "0", "0", "0", "0", null, "04", "013", "010200"]
        ]);

        let rows = parse_survey_response(&body, DEMOGRAPHIC_VARIABLES, AcsYear::Y2023).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].geoid, "04013010100");
        assert_eq!(rows[0].value("total_pop"), Some(4200.0));
        assert_eq!(rows[0].value("median_income"), Some(-666_666_666.0));
        assert_eq!(rows[1].value("median_income"), None);

        let record = DemographicRecord::from(&rows[0]);
        assert_eq!(record.hispanic, Some(1000.0));
        assert_eq!(record.year, AcsYear::Y2023);
    }

    #[test]
    fn pads_geography_parts() {
        let body = json!([
            ["B19013_001E", "state", "county", "tract"],
            ["52000", "4", "13", "10100"]
        ]);
        let vars = &[SurveyVariable {
            code: "B19013_001E",
            name: "median_income",
        }];
        let rows = parse_survey_response(&body, vars, AcsYear::Y2021).unwrap();
        assert_eq!(rows[0].geoid, "04013010100");
    }

    #[test]
    fn drops_duplicate_tracts() {
        let body = json!([
            ["B19013_001E", "state", "county", "tract"],
            ["1", "04", "013", "010100"],
            ["2", "04", "013", "010100"]
        ]);
        let vars = &[SurveyVariable {
            code: "B19013_001E",
            name: "median_income",
        }];
        let rows = parse_survey_response(&body, vars, AcsYear::Y2021).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value("median_income"), Some(1.0));
    }

    #[test]
    fn missing_variable_column_is_an_error() {
        let body = json!([["state", "county", "tract"], ["04", "013", "010100"]]);
        let err = parse_survey_response(&body, DEMOGRAPHIC_VARIABLES, AcsYear::Y2023).unwrap_err();
        assert!(err.to_string().contains("B03002_001E"), "{err}");
    }

    #[test]
    fn non_array_body_is_an_error() {
        assert!(parse_survey_response(&json!({"error": "x"}), DEMOGRAPHIC_VARIABLES, AcsYear::Y2023).is_err());
    }

    #[test]
    fn empty_body_is_empty_table() {
        let rows = parse_survey_response(&json!([]), DEMOGRAPHIC_VARIABLES, AcsYear::Y2023).unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn rejects_bad_fips_before_sending() {
        let client = reqwest::Client::new();
        let county = CountyRef {
            state_fips: "04".to_string(),
            county_fips: "13".to_string(),
        };
        let err = fetch_commute_records(&client, &county, AcsYear::Y2021, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidParameter { .. }));
    }
}
