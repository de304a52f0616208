#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Clients for the four external data providers.
//!
//! * [`tigerweb`]: metro, ZCTA and tract boundaries (`ArcGIS` REST)
//! * [`acs`]: ACS 5-year tract tables
//! * [`zori`]: the Zillow Observed Rent Index CSV
//! * [`overpass`]: transit stop counts from `OpenStreetMap`
//!
//! The clients are stateless apart from the on-disk Overpass cache and
//! never retry. Transport failures surface as [`SourceError::Http`] so the
//! caller decides whether a region can continue.

pub mod acs;
pub mod cache;
pub mod overpass;
pub mod progress;
pub mod shape;
pub mod tigerweb;
pub mod zori;

use std::time::Duration;

use commute_burden_geography_models::fips::InvalidCodeError;
use commute_burden_source_models::UnsupportedYearError;
use thiserror::Error;

/// Per-request timeout used unless the caller configures another one.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(180);

/// User-Agent sent to every provider. `TIGERweb` sits behind a WAF that
/// rejects anonymous clients.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; CommuteBurden/0.1; +https://github.com)";

/// Errors that can occur while talking to a data provider.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A request parameter is outside its domain. Nothing was sent.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of what went wrong.
        message: String,
    },

    /// HTTP request failed (connect, timeout or error status).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered, but with an error payload.
    #[error("{service} error: {message}")]
    Service {
        /// Which provider answered.
        service: &'static str,
        /// The provider's error message.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (cache read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required fetch came back empty.
    #[error("No data found: {message}")]
    NoDataFound {
        /// Description of what was requested.
        message: String,
    },

    /// The response did not have the expected structure.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

impl SourceError {
    /// Whether this error came from the transport or the remote service
    /// rather than from the request or the payload.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Service { .. })
    }
}

impl From<InvalidCodeError> for SourceError {
    fn from(e: InvalidCodeError) -> Self {
        Self::InvalidParameter {
            message: e.to_string(),
        }
    }
}

impl From<UnsupportedYearError> for SourceError {
    fn from(e: UnsupportedYearError) -> Self {
        Self::InvalidParameter {
            message: e.to_string(),
        }
    }
}

/// Builds the shared `reqwest::Client` used by every provider.
///
/// # Errors
///
/// Returns [`SourceError`] if the client cannot be built.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(Into::into)
}

/// Truncates a string for logging, appending "..." if it exceeds `max_len`.
pub(crate) fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
