//! Rent-index client for the Zillow Observed Rent Index (ZORI).
//!
//! Zillow publishes ZORI as one wide CSV: a row per ZIP code with a few
//! metadata columns followed by one column per month. Only the latest
//! observed value per ZIP is kept.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use commute_burden_geography_models::fips::{ZCTA_WIDTH, zero_pad};
use commute_burden_source_models::RentObservation;

use crate::SourceError;

/// Smoothed, seasonally adjusted all-homes ZORI by ZIP.
pub const DEFAULT_ZORI_URL: &str = "https://files.zillowstatic.com/research/public_csvs/zori/Zip_zori_uc_sfrcondomfr_sm_sa_month.csv";

/// Column holding the ZIP code.
const ZIP_COLUMN: &str = "RegionName";

/// Index of the first month column when no header looks like a date.
const FALLBACK_FIRST_PERIOD_COLUMN: usize = 5;

/// Downloads the rent-index CSV and keeps the latest value per ZIP.
///
/// # Errors
///
/// Returns the transport error if the download fails, or
/// [`SourceError`] if the CSV cannot be parsed.
pub async fn fetch_rent_index(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<RentObservation>, SourceError> {
    log::info!("Downloading rent index from {url}...");

    let bytes = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    log::info!("Rent index: downloaded {} bytes", bytes.len());

    let observations = parse_rent_index(&bytes)?;
    log::info!("Rent index: latest observation for {} ZIPs", observations.len());
    Ok(observations)
}

/// Whether a header names a period column: it starts with a four-digit
/// year and contains a date separator.
fn is_period_column(header: &str) -> bool {
    header.len() >= 4
        && header.as_bytes()[..4].iter().all(u8::is_ascii_digit)
        && (header.contains('-') || header.contains('/'))
}

/// Parses a period label for ordering. Labels that do not parse order
/// before every dated label and then by text.
fn period_date(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(label, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(label, "%Y/%m/%d"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{label}-01"), "%Y-%m-%d"))
        .ok()
}

fn period_key(label: &str) -> (Option<NaiveDate>, &str) {
    (period_date(label), label)
}

/// Parses the wide rent-index CSV into the latest observation per ZIP.
///
/// Blank and non-numeric cells (Zillow uses `MA` for "not available") are
/// skipped. Output is sorted by ZIP.
///
/// # Errors
///
/// Returns [`SourceError::Csv`] on malformed CSV or
/// [`SourceError::Conversion`] if the ZIP column is missing.
pub fn parse_rent_index(csv_bytes: &[u8]) -> Result<Vec<RentObservation>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let zip_idx = headers
        .iter()
        .position(|h| h == ZIP_COLUMN)
        .ok_or_else(|| SourceError::Conversion {
            message: format!("rent index has no '{ZIP_COLUMN}' column"),
        })?;

    let mut period_cols: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| is_period_column(h))
        .map(|(i, _)| i)
        .collect();
    if period_cols.is_empty() {
        period_cols = (FALLBACK_FIRST_PERIOD_COLUMN..headers.len())
            .filter(|i| *i != zip_idx)
            .collect();
    }

    let mut latest: BTreeMap<String, RentObservation> = BTreeMap::new();

    for record in reader.records() {
        let record = record?;
        let Some(zip) = record.get(zip_idx).map(str::trim).filter(|z| !z.is_empty()) else {
            continue;
        };
        let zip = zero_pad(zip, ZCTA_WIDTH);

        for &col in &period_cols {
            let Some(value) = record
                .get(col)
                .and_then(|cell| cell.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
            else {
                continue;
            };
            let period = &headers[col];

            let newer = latest
                .get(&zip)
                .is_none_or(|current| period_key(period) > period_key(&current.period));
            if newer {
                latest.insert(
                    zip.clone(),
                    RentObservation {
                        zip: zip.clone(),
                        period: period.clone(),
                        zori: value,
                    },
                );
            }
        }
    }

    Ok(latest.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
RegionID,SizeRank,RegionName,RegionType,StateName,2024-04-30,2024-05-31,2024-06-30
1,0,85004,zip,AZ,1500.5,1510.25,
2,1,501,zip,NY,2000,MA,2100
3,2,85008,zip,AZ,,,
";

    #[test]
    fn keeps_latest_numeric_value() {
        let obs = parse_rent_index(SAMPLE.as_bytes()).unwrap();
        assert_eq!(obs.len(), 2);

        assert_eq!(obs[0].zip, "00501");
        assert_eq!(obs[0].period, "2024-06-30");
        assert!((obs[0].zori - 2100.0).abs() < f64::EPSILON);

        assert_eq!(obs[1].zip, "85004");
        assert_eq!(obs[1].period, "2024-05-31");
        assert!((obs[1].zori - 1510.25).abs() < f64::EPSILON);
    }

    #[test]
    fn detects_period_columns() {
        assert!(is_period_column("2024-01-31"));
        assert!(is_period_column("2024/01/31"));
        assert!(!is_period_column("RegionName"));
        assert!(!is_period_column("2024"));
        assert!(!is_period_column("SizeRank"));
    }

    #[test]
    fn orders_periods_by_date() {
        assert!(period_key("2024-10-31") > period_key("2024-09-30"));
        assert!(period_key("2024/02/29") > period_key("2023-12-31"));
        assert!(period_key("2024-03") > period_key("2024-02-29"));
    }

    #[test]
    fn falls_back_to_positional_columns() {
        let csv = "\
RegionID,SizeRank,RegionName,RegionType,StateName,Jan,Feb
1,0,85004,zip,AZ,1200,1250
";
        let obs = parse_rent_index(csv.as_bytes()).unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].period, "Jan");
        assert!((obs[0].zori - 1200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn duplicate_zip_rows_keep_latest() {
        let csv = "\
RegionID,SizeRank,RegionName,RegionType,StateName,2024-01-31,2024-02-29
1,0,85004,zip,AZ,1000,
2,1,85004,zip,AZ,,1100
";
        let obs = parse_rent_index(csv.as_bytes()).unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].period, "2024-02-29");
    }

    #[test]
    fn missing_zip_column_is_an_error() {
        let err = parse_rent_index(b"RegionID,2024-01-31\n1,1000\n").unwrap_err();
        assert!(matches!(err, SourceError::Conversion { .. }));
    }
}
