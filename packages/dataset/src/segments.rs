//! Median-income terciles within one metro.

use commute_burden_dataset_models::IncomeSegment;

/// Linear-interpolated empirical quantile of sorted values.
///
/// `sorted` must be non-empty and ascending; `p` in `[0, 1]`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Cut points at the 1/3 and 2/3 quantiles of the present values.
///
/// Returns `None` when no value is present.
#[must_use]
pub fn tercile_cuts(values: &[Option<f64>]) -> Option<(f64, f64)> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(f64::total_cmp);
    Some((quantile(&present, 1.0 / 3.0), quantile(&present, 2.0 / 3.0)))
}

/// Places a value in a tercile. Values on a cut point go to the lower
/// segment.
#[must_use]
pub fn classify(value: Option<f64>, (q1, q2): (f64, f64)) -> Option<IncomeSegment> {
    let value = value?;
    Some(if value <= q1 {
        IncomeSegment::Low
    } else if value <= q2 {
        IncomeSegment::Medium
    } else {
        IncomeSegment::High
    })
}

/// Labels every value with its tercile, preserving order.
#[must_use]
pub fn income_segments(values: &[Option<f64>]) -> Vec<Option<IncomeSegment>> {
    let Some(cuts) = tercile_cuts(values) else {
        return vec![None; values.len()];
    };
    values.iter().map(|v| classify(*v, cuts)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuts_interpolate_linearly() {
        let (q1, q2) = tercile_cuts(&[Some(10.0), Some(20.0), Some(30.0), Some(40.0)]).unwrap();
        assert!((q1 - 20.0).abs() < 1e-9, "q1={q1}");
        assert!((q2 - 30.0).abs() < 1e-9, "q2={q2}");
    }

    #[test]
    fn ties_at_cut_points_go_low() {
        let segments = income_segments(&[Some(10.0), Some(20.0), Some(30.0), Some(40.0)]);
        assert_eq!(
            segments,
            vec![
                Some(IncomeSegment::Low),
                Some(IncomeSegment::Low),
                Some(IncomeSegment::Medium),
                Some(IncomeSegment::High),
            ]
        );
    }

    #[test]
    fn segments_are_monotonic_in_income() {
        let incomes: Vec<Option<f64>> = [52.0, 31.0, 88.0, 47.0, 61.0, 75.0, 29.0, 40.0, 95.0]
            .iter()
            .map(|v| Some(v * 1000.0))
            .collect();
        let segments = income_segments(&incomes);

        let mut pairs: Vec<_> = incomes.iter().zip(&segments).collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(b.0).unwrap());
        for w in pairs.windows(2) {
            assert!(w[0].1 <= w[1].1);
        }
    }

    #[test]
    fn missing_income_has_no_segment() {
        let segments = income_segments(&[Some(1.0), None, Some(3.0)]);
        assert_eq!(segments[1], None);
        assert!(segments[0].is_some());
        assert_eq!(income_segments(&[None, None]), vec![None, None]);
    }

    #[test]
    fn single_value_is_low() {
        assert_eq!(income_segments(&[Some(50_000.0)]), vec![Some(IncomeSegment::Low)]);
    }
}
