//! Population-weighted means with exclude-and-renormalize semantics.

/// Running `Σ(v·w) / Σ(w)` over the members that have both a value and
/// a weight.
///
/// A member missing either is left out of both sums. With no
/// contributing member the mean is missing; with contributors whose
/// weights sum to zero it is exactly `0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedMean {
    weighted_sum: f64,
    weight_sum: f64,
    contributors: usize,
}

impl WeightedMean {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            weighted_sum: 0.0,
            weight_sum: 0.0,
            contributors: 0,
        }
    }

    pub fn add(&mut self, value: Option<f64>, weight: Option<f64>) {
        if let (Some(value), Some(weight)) = (value, weight) {
            self.weighted_sum += value * weight;
            self.weight_sum += weight;
            self.contributors += 1;
        }
    }

    #[must_use]
    pub fn finish(&self) -> Option<f64> {
        if self.contributors == 0 {
            return None;
        }
        if self.weight_sum > 0.0 {
            Some(self.weighted_sum / self.weight_sum)
        } else {
            Some(0.0)
        }
    }
}

/// Weighted mean of `(value, weight)` pairs.
#[must_use]
pub fn weighted_mean(pairs: impl IntoIterator<Item = (Option<f64>, Option<f64>)>) -> Option<f64> {
    let mut mean = WeightedMean::new();
    for (value, weight) in pairs {
        mean.add(value, weight);
    }
    mean.finish()
}

/// Sum of the present values, or missing if none is present.
#[must_use]
pub fn sum_present(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_weights_give_arithmetic_mean() {
        let mean = weighted_mean([(Some(1.0), Some(5.0)), (Some(2.0), Some(5.0)), (Some(6.0), Some(5.0))]);
        assert_eq!(mean, Some(3.0));
    }

    #[test]
    fn single_member_gives_its_value() {
        assert_eq!(weighted_mean([(Some(0.37), Some(120.0))]), Some(0.37));
    }

    #[test]
    fn zero_weight_sum_gives_zero() {
        assert_eq!(weighted_mean([(Some(0.5), Some(0.0)), (Some(0.9), Some(0.0))]), Some(0.0));
    }

    #[test]
    fn missing_members_are_excluded_and_weights_renormalized() {
        let mean = weighted_mean([
            (Some(0.3), Some(100.0)),
            (None, Some(300.0)),
            (Some(0.6), None),
            (Some(0.5), Some(100.0)),
        ]);
        assert_eq!(mean, Some(0.4));
    }

    #[test]
    fn no_contributor_is_missing() {
        assert_eq!(weighted_mean([(None, Some(100.0)), (Some(1.0), None)]), None);
        assert_eq!(weighted_mean(std::iter::empty()), None);
    }

    #[test]
    fn sums_only_present_values() {
        assert_eq!(sum_present([Some(1.0), None, Some(2.5)]), Some(3.5));
        assert_eq!(sum_present([None, None]), None);
        assert_eq!(sum_present([Some(0.0)]), Some(0.0));
    }
}
