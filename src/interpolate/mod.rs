use crate::types::{CurvePoint, PricePoint};

/// Linear interpolation, returning `y0` unchanged when the bracket is
/// degenerate (first point, duplicate prices).
fn lerp(x: f64, x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    if x0 == x1 {
        y0
    } else {
        y0 + (x - x0) / (x1 - x0) * (y1 - y0)
    }
}

fn lerp_bound(x: f64, x0: f64, x1: f64, y0: Option<f64>, y1: Option<f64>) -> Option<f64> {
    // Bounds are never extrapolated or synthesized from partial data:
    // both brackets must carry the bound.
    match (y0, y1) {
        (Some(a), Some(b)) => Some(lerp(x, x0, x1, a, b)),
        _ => None,
    }
}

/// Produce `steps + 1` evenly spaced synthetic prices from the minimum to the
/// maximum observed price inclusive, interpolating demand and any bootstrap
/// bounds between the bracketing aggregated points.
///
/// Revenue at each synthetic point is recomputed from the interpolated demand
/// (`x * demand * revenue_scale`), not itself interpolated: revenue is
/// demand-derived, not independently smoothed. Requires `points` sorted
/// ascending by price.
pub fn interpolate_curve(
    points: &[PricePoint],
    steps: usize,
    revenue_scale: f64,
) -> Vec<CurvePoint> {
    if points.is_empty() || steps == 0 {
        return Vec::new();
    }

    let min_price = points[0].price;
    let max_price = points[points.len() - 1].price;
    let span = max_price - min_price;

    let mut curve = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        // Endpoints are pinned exactly to the observed extremes
        let x = if i == steps {
            max_price
        } else {
            min_price + span * (i as f64 / steps as f64)
        };

        // Last point with price <= x and first with price >= x
        let after = points.partition_point(|p| p.price <= x);
        let p0 = &points[after.saturating_sub(1)];
        let p1 = &points[points.partition_point(|p| p.price < x).min(points.len() - 1)];

        let demand = lerp(x, p0.price, p1.price, p0.demand, p1.demand);
        curve.push(CurvePoint {
            price: x,
            demand,
            revenue: x * demand * revenue_scale,
            revenue_scaled: 0.0,
            demand_low: lerp_bound(x, p0.price, p1.price, p0.demand_low, p1.demand_low),
            demand_high: lerp_bound(x, p0.price, p1.price, p0.demand_high, p1.demand_high),
            revenue_low: lerp_bound(x, p0.price, p1.price, p0.revenue_low, p1.revenue_low),
            revenue_high: lerp_bound(x, p0.price, p1.price, p0.revenue_high, p1.revenue_high),
        });
    }

    curve
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(price: f64, demand: f64) -> PricePoint {
        PricePoint {
            price,
            sample_count: 1,
            demand,
            revenue: price * demand,
            revenue_scaled: 0.0,
            demand_low: None,
            demand_high: None,
            revenue_low: None,
            revenue_high: None,
        }
    }

    #[test]
    fn curve_spans_observed_price_range() {
        let points = vec![point(10.0, 1.0), point(30.0, 0.0)];
        for steps in [1, 2, 7, 100] {
            let curve = interpolate_curve(&points, steps, 1.0);
            assert_eq!(curve.len(), steps + 1);
            assert_eq!(curve[0].price, 10.0);
            assert_eq!(curve[steps].price, 30.0);
        }
    }

    #[test]
    fn reproduces_aggregated_points_exactly() {
        let points = vec![point(10.0, 1.0), point(20.0, 0.5), point(30.0, 0.0)];
        let curve = interpolate_curve(&points, 100, 1.0);
        for original in &points {
            let hit = curve
                .iter()
                .find(|c| c.price == original.price)
                .expect("grid covers aggregated prices");
            assert_eq!(hit.demand, original.demand);
        }
    }

    #[test]
    fn revenue_recomputed_from_interpolated_demand() {
        let points = vec![point(10.0, 1.0), point(30.0, 0.0)];
        let curve = interpolate_curve(&points, 2, 2.0);
        // midpoint: price 20, demand 0.5, revenue from demand not lerped
        assert_eq!(curve[1].price, 20.0);
        assert_eq!(curve[1].demand, 0.5);
        assert_eq!(curve[1].revenue, 20.0 * 0.5 * 2.0);
    }

    #[test]
    fn bounds_require_both_brackets() {
        let mut with_bounds = point(10.0, 1.0);
        with_bounds.demand_low = Some(0.8);
        with_bounds.demand_high = Some(1.0);
        let without = point(20.0, 0.5);

        let curve = interpolate_curve(&[with_bounds, without], 2, 1.0);
        assert_eq!(curve[0].demand_low, Some(0.8));
        assert_eq!(curve[1].demand_low, None);
        assert_eq!(curve[1].demand_high, None);
    }

    #[test]
    fn interpolates_bounds_when_both_present() {
        let mut a = point(10.0, 1.0);
        a.demand_low = Some(0.8);
        a.demand_high = Some(1.0);
        let mut b = point(20.0, 0.4);
        b.demand_low = Some(0.2);
        b.demand_high = Some(0.6);

        let curve = interpolate_curve(&[a, b], 2, 1.0);
        assert_eq!(curve[1].price, 15.0);
        assert_eq!(curve[1].demand_low, Some(0.5));
        assert_eq!(curve[1].demand_high, Some(0.8));
    }

    #[test]
    fn single_point_curve_is_flat() {
        let points = vec![point(10.0, 0.5)];
        let curve = interpolate_curve(&points, 4, 1.0);
        assert_eq!(curve.len(), 5);
        for c in &curve {
            assert_eq!(c.price, 10.0);
            assert_eq!(c.demand, 0.5);
        }
    }
}
