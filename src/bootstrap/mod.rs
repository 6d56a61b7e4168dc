use crate::aggregation::weighted_demand;
use crate::types::{BootstrapConfig, Observation, PricePoint};
use anyhow::{bail, Result};
use indicatif::ProgressBar;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Per-respondent observation slice, indexed against the aggregated curve
struct Cluster {
    /// (price index, purchase weight, weight) per observation
    entries: Vec<(usize, f64, f64)>,
}

/// Attach empirical 5th/95th percentile bounds to each aggregated price point
/// by cluster-bootstrapping the observations.
///
/// Respondents are resampled with replacement as whole units, so a respondent
/// who answered at five prices contributes all five observations per draw.
/// Percentile ranks use whole-iteration indices `floor(0.05 * B)` and
/// `floor(0.95 * B)` into the sorted simulated demands, with no interpolation
/// between bootstrap samples.
pub fn bootstrap_bounds(
    observations: &[Observation],
    points: &mut [PricePoint],
    config: &BootstrapConfig,
    revenue_scale: f64,
    progress: Option<&ProgressBar>,
) -> Result<()> {
    if config.iterations == 0 {
        bail!("Bootstrap iteration count must be positive");
    }
    if points.is_empty() {
        return Ok(());
    }

    let prices: Vec<f64> = points.iter().map(|p| p.price).collect();
    let clusters = group_by_respondent(observations, &prices);
    let n = clusters.len();
    if n == 0 {
        return Ok(());
    }

    debug!(
        "Bootstrapping {} respondents over {} prices, {} iterations",
        n,
        prices.len(),
        config.iterations
    );

    let b = config.iterations;
    let simulated: Vec<Vec<f64>> = (0..b)
        .into_par_iter()
        .map(|iteration| {
            // Per-iteration RNG keeps results independent of rayon's split
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(iteration as u64)),
                None => StdRng::from_entropy(),
            };

            let mut purchase_weight = vec![0.0_f64; prices.len()];
            let mut total_weight = vec![0.0_f64; prices.len()];
            for _ in 0..n {
                let cluster = &clusters[rng.gen_range(0..n)];
                for &(price_idx, pw, w) in &cluster.entries {
                    purchase_weight[price_idx] += pw;
                    total_weight[price_idx] += w;
                }
            }

            if let Some(pb) = progress {
                pb.inc(1);
            }

            purchase_weight
                .iter()
                .zip(&total_weight)
                .map(|(&pw, &tw)| weighted_demand(pw, tw))
                .collect()
        })
        .collect();

    let low_idx = (0.05 * b as f64).floor() as usize;
    let high_idx = ((0.95 * b as f64).floor() as usize).min(b - 1);

    for (price_idx, point) in points.iter_mut().enumerate() {
        let mut demands: Vec<f64> = simulated.iter().map(|d| d[price_idx]).collect();
        demands.sort_by(f64::total_cmp);

        let demand_low = demands[low_idx];
        let demand_high = demands[high_idx];
        point.demand_low = Some(demand_low);
        point.demand_high = Some(demand_high);
        point.revenue_low = Some(point.price * demand_low * revenue_scale);
        point.revenue_high = Some(point.price * demand_high * revenue_scale);
    }

    Ok(())
}

/// Group observations by respondent identifier, once, in first-appearance
/// order, resolving each observation's price to its curve index.
fn group_by_respondent(observations: &[Observation], prices: &[f64]) -> Vec<Cluster> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut clusters: Vec<Cluster> = Vec::new();

    for obs in observations {
        let Ok(price_idx) = prices.binary_search_by(|p| p.total_cmp(&obs.price)) else {
            // Price absent from the aggregation; cannot happen when the
            // curve was built from the same observation set.
            continue;
        };
        let cluster_idx = *index.entry(obs.respondent.as_str()).or_insert_with(|| {
            clusters.push(Cluster { entries: Vec::new() });
            clusters.len() - 1
        });
        clusters[cluster_idx].entries.push((
            price_idx,
            obs.weight * f64::from(obs.purchase),
            obs.weight,
        ));
    }

    clusters
}
