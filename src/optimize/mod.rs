use crate::types::{CurvePoint, PricePoint, PriceRange, RangeMethod};

/// Index of the revenue-maximizing interpolated point.
///
/// Stable left-to-right scan: the first occurrence wins on ties, so repeated
/// runs over the same curve always pick the same optimum.
pub fn find_optimum(curve: &[CurvePoint]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, point) in curve.iter().enumerate() {
        match best {
            Some(b) if curve[b].revenue >= point.revenue => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Normalize revenue on both sequences by the maximum interpolated revenue,
/// for consistent dual-axis display scaling. A zero maximum (all-zero demand)
/// scales everything to 0.
pub fn apply_revenue_scaling(
    points: &mut [PricePoint],
    curve: &mut [CurvePoint],
    max_revenue: f64,
) {
    let scale = |revenue: f64| {
        if max_revenue > 0.0 {
            revenue / max_revenue
        } else {
            0.0
        }
    };
    for point in points.iter_mut() {
        point.revenue_scaled = scale(point.revenue);
    }
    for point in curve.iter_mut() {
        point.revenue_scaled = scale(point.revenue);
    }
}

/// Acceptable price range: the min/max envelope of every interpolated price
/// whose revenue meets the retention threshold.
///
/// The envelope is not guaranteed contiguous; on a non-unimodal curve it
/// spans disconnected qualifying segments. That behavior is kept as-is.
pub fn find_range(
    curve: &[CurvePoint],
    optimal: &CurvePoint,
    max_revenue: f64,
    method: RangeMethod,
) -> Option<PriceRange> {
    let threshold = match method {
        RangeMethod::Percent(retention) => max_revenue * (retention / 100.0),
        // Lower bound exists only when the bootstrap produced bounds at the
        // optimum's bracketing points
        RangeMethod::Statistical => optimal.revenue_low.unwrap_or(max_revenue * 0.95),
    };

    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for point in curve {
        if point.revenue >= threshold {
            low = low.min(point.price);
            high = high.max(point.price);
        }
    }

    (low <= high).then_some(PriceRange { low, high })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve_point(price: f64, revenue: f64) -> CurvePoint {
        CurvePoint {
            price,
            demand: 0.0,
            revenue,
            revenue_scaled: 0.0,
            demand_low: None,
            demand_high: None,
            revenue_low: None,
            revenue_high: None,
        }
    }

    #[test]
    fn first_occurrence_wins_on_ties() {
        let curve = vec![
            curve_point(10.0, 10.0),
            curve_point(15.0, 10.0),
            curve_point(20.0, 10.0),
            curve_point(30.0, 0.0),
        ];
        assert_eq!(find_optimum(&curve), Some(0));
    }

    #[test]
    fn optimum_is_deterministic() {
        let curve = vec![
            curve_point(10.0, 3.0),
            curve_point(20.0, 7.0),
            curve_point(30.0, 7.0),
            curve_point(40.0, 5.0),
        ];
        let first = find_optimum(&curve);
        for _ in 0..10 {
            assert_eq!(find_optimum(&curve), first);
        }
        assert_eq!(first, Some(1));
    }

    #[test]
    fn empty_curve_has_no_optimum() {
        assert_eq!(find_optimum(&[]), None);
    }

    #[test]
    fn scaling_normalizes_by_max() {
        let mut curve = vec![curve_point(10.0, 5.0), curve_point(20.0, 10.0)];
        apply_revenue_scaling(&mut [], &mut curve, 10.0);
        assert_eq!(curve[0].revenue_scaled, 0.5);
        assert_eq!(curve[1].revenue_scaled, 1.0);

        let mut flat = vec![curve_point(10.0, 0.0)];
        apply_revenue_scaling(&mut [], &mut flat, 0.0);
        assert_eq!(flat[0].revenue_scaled, 0.0);
    }

    #[test]
    fn percent_range_narrows_as_retention_rises() {
        let curve = vec![
            curve_point(10.0, 4.0),
            curve_point(20.0, 8.0),
            curve_point(30.0, 10.0),
            curve_point(40.0, 6.0),
        ];
        let optimal = curve[2];

        let mut last_width = f64::INFINITY;
        for retention in [50.0, 70.0, 90.0, 99.0] {
            let range = find_range(&curve, &optimal, 10.0, RangeMethod::Percent(retention))
                .expect("optimum always qualifies");
            let width = range.high - range.low;
            assert!(width <= last_width, "retention {} widened the range", retention);
            last_width = width;
        }
    }

    #[test]
    fn range_empty_when_nothing_qualifies() {
        let curve = vec![curve_point(10.0, 1.0)];
        let optimal = curve[0];
        assert_eq!(
            find_range(&curve, &optimal, 1.0, RangeMethod::Percent(200.0)),
            None
        );
    }

    #[test]
    fn statistical_mode_uses_lower_bound_or_fallback() {
        let curve = vec![
            curve_point(10.0, 6.0),
            curve_point(20.0, 10.0),
            curve_point(30.0, 7.0),
        ];

        let mut optimal = curve[1];
        optimal.revenue_low = Some(6.5);
        let with_bound = find_range(&curve, &optimal, 10.0, RangeMethod::Statistical).unwrap();
        assert_eq!(with_bound, PriceRange { low: 20.0, high: 30.0 });

        // No bound at the optimum: 95% of max keeps only the peak
        let fallback = find_range(&curve, &curve[1], 10.0, RangeMethod::Statistical).unwrap();
        assert_eq!(fallback, PriceRange { low: 20.0, high: 20.0 });
    }
}
