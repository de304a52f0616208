//! Census code utilities.
//!
//! Validation and zero-padding for the fixed-width numeric codes that key
//! every join in the pipeline: state and county FIPS, CBSA codes, tract
//! GEOIDs, ZCTAs and ZIP prefixes.

/// Width of a state FIPS code.
pub const STATE_FIPS_WIDTH: usize = 2;

/// Width of a county FIPS code.
pub const COUNTY_FIPS_WIDTH: usize = 3;

/// Width of a tract code within a county.
pub const TRACT_CODE_WIDTH: usize = 6;

/// Width of a full tract GEOID (state + county + tract).
pub const TRACT_GEOID_WIDTH: usize = 11;

/// Width of a ZCTA identifier.
pub const ZCTA_WIDTH: usize = 5;

/// Width of a CBSA code.
pub const CBSA_WIDTH: usize = 5;

/// The kind of census code being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    StateFips,
    CountyFips,
    Cbsa,
    ZipPrefix,
}

impl CodeKind {
    const fn label(self) -> &'static str {
        match self {
            Self::StateFips => "state FIPS code",
            Self::CountyFips => "county FIPS code",
            Self::Cbsa => "CBSA code",
            Self::ZipPrefix => "ZIP prefix",
        }
    }

    const fn width_range(self) -> (usize, usize) {
        match self {
            Self::StateFips => (STATE_FIPS_WIDTH, STATE_FIPS_WIDTH),
            Self::CountyFips => (COUNTY_FIPS_WIDTH, COUNTY_FIPS_WIDTH),
            Self::Cbsa => (CBSA_WIDTH, CBSA_WIDTH),
            Self::ZipPrefix => (1, ZCTA_WIDTH),
        }
    }
}

/// Error returned when a census code is outside its domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCodeError {
    /// Which code was being validated.
    pub kind: CodeKind,
    /// The rejected value.
    pub value: String,
}

impl std::fmt::Display for InvalidCodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (min, max) = self.kind.width_range();
        if min == max {
            write!(
                f,
                "invalid {} '{}': expected {min} digits",
                self.kind.label(),
                self.value
            )
        } else {
            write!(
                f,
                "invalid {} '{}': expected {min}-{max} digits",
                self.kind.label(),
                self.value
            )
        }
    }
}

impl std::error::Error for InvalidCodeError {}

/// Checks that `value` is an all-digit code of the width `kind` requires.
///
/// # Errors
///
/// Returns [`InvalidCodeError`] if the value is empty, contains anything
/// other than ASCII digits, or has the wrong length.
pub fn validate_code(kind: CodeKind, value: &str) -> Result<(), InvalidCodeError> {
    let (min, max) = kind.width_range();
    let ok = (min..=max).contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit());

    if ok {
        Ok(())
    } else {
        Err(InvalidCodeError {
            kind,
            value: value.to_string(),
        })
    }
}

/// Normalizes a raw identifier to a zero-padded code of `width` digits.
///
/// Accepts values that came through a numeric column (`"501"`,
/// `"501.0"`) as well as already-padded strings. Values longer than
/// `width` are returned unchanged after trimming.
#[must_use]
pub fn zero_pad(raw: &str, width: usize) -> String {
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    format!("{digits:0>width$}")
}

/// Builds an 11-digit tract GEOID from its state, county and tract parts.
#[must_use]
pub fn tract_geoid(state: &str, county: &str, tract: &str) -> String {
    format!(
        "{}{}{}",
        zero_pad(state, STATE_FIPS_WIDTH),
        zero_pad(county, COUNTY_FIPS_WIDTH),
        zero_pad(tract, TRACT_CODE_WIDTH)
    )
}

/// Maps a two-digit FIPS code to the corresponding two-letter state
/// abbreviation.
///
/// Only used for log labels. Returns `"??"` for states no region uses.
#[must_use]
pub fn state_abbr(fips: &str) -> &'static str {
    match fips {
        "04" => "AZ",
        "05" => "AR",
        "06" => "CA",
        "28" => "MS",
        "47" => "TN",
        "48" => "TX",
        _ => "??",
    }
}
