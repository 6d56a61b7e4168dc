use crate::types::{Observation, PricePoint};

/// Weighted purchase rate, 0 when no weight was accumulated.
///
/// A price with only zero-weight observations has zero measured demand,
/// not undefined demand.
pub fn weighted_demand(purchase_weight: f64, total_weight: f64) -> f64 {
    if total_weight > 0.0 {
        purchase_weight / total_weight
    } else {
        0.0
    }
}

/// Aggregate filtered observations into the discrete demand curve.
///
/// Groups by exact price value and accumulates weighted demand and revenue
/// per group. The output is unique by price and sorted ascending, an
/// invariant every downstream step depends on.
pub fn aggregate_curve(observations: &[Observation], revenue_scale: f64) -> Vec<PricePoint> {
    if observations.is_empty() {
        return Vec::new();
    }

    // NaN prices never reach this point, so total_cmp gives a plain
    // ascending order over the finite values.
    let mut sorted: Vec<&Observation> = observations.iter().collect();
    sorted.sort_by(|a, b| a.price.total_cmp(&b.price));

    let mut points = Vec::new();
    let mut start = 0;
    while start < sorted.len() {
        let price = sorted[start].price;
        let mut end = start;
        while end < sorted.len() && sorted[end].price == price {
            end += 1;
        }

        let group = &sorted[start..end];
        let total_weight: f64 = group.iter().map(|o| o.weight).sum();
        let purchase_weight: f64 = group
            .iter()
            .map(|o| o.weight * f64::from(o.purchase))
            .sum();
        let demand = weighted_demand(purchase_weight, total_weight);

        points.push(PricePoint {
            price,
            sample_count: group.len(),
            demand,
            revenue: price * demand * revenue_scale,
            revenue_scaled: 0.0,
            demand_low: None,
            demand_high: None,
            revenue_low: None,
            revenue_high: None,
        });

        start = end;
    }

    points
}
