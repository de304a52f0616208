//! Missing-value rules shared by every derived column.

/// Replaces survey sentinels with a missing value.
///
/// The ACS encodes "not available" annotations as large negative numbers
/// (`-666666666`, `-999999999`, `-888888888`, ...). No count, dollar
/// amount or ratio it publishes is legitimately negative, so every
/// negative or non-finite value is treated as missing.
#[must_use]
pub fn sanitize(raw: Option<f64>) -> Option<f64> {
    raw.filter(|v| v.is_finite() && *v >= 0.0)
}

/// `num / den`, or missing unless both are present and `den > 0`.
#[must_use]
pub fn ratio(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    let (num, den) = (num?, den?);
    (den > 0.0).then_some(num / den)
}

/// `num / den * 100` with the same rules as [`ratio`].
#[must_use]
pub fn percent(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    ratio(num, den).map(|r| r * 100.0)
}

/// Sum of every operand, or missing if any operand is missing.
#[must_use]
pub fn sum_all(values: &[Option<f64>]) -> Option<f64> {
    values.iter().copied().sum()
}
