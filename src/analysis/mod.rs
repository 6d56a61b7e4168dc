use crate::aggregation::aggregate_curve;
use crate::bootstrap::bootstrap_bounds;
use crate::cache::ResultCache;
use crate::interpolate::interpolate_curve;
use crate::normalize::{apply_filters, normalize_records};
use crate::optimize::{apply_revenue_scaling, find_optimum, find_range};
use crate::types::{AnalysisResult, Config, RawRecord};
use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Run the full pipeline over a record snapshot:
/// filter, normalize, aggregate, bootstrap, interpolate, optimize.
///
/// `Ok(None)` means "not yet configured" or a degenerate curve (no aggregated
/// price point); malformed cells never produce an error. `Err` is reserved
/// for invalid configuration.
pub fn analyze(records: &[RawRecord], config: &Config) -> Result<Option<AnalysisResult>> {
    analyze_with_progress(records, config, None)
}

/// [`analyze`] with an optional progress bar driven by the bootstrap, the
/// only potentially long-running step.
pub fn analyze_with_progress(
    records: &[RawRecord],
    config: &Config,
    progress: Option<&ProgressBar>,
) -> Result<Option<AnalysisResult>> {
    if config.curve_steps == 0 {
        bail!("Interpolation step count must be positive");
    }
    if config.bootstrap.enabled && config.bootstrap.iterations == 0 {
        bail!("Bootstrap iteration count must be positive");
    }

    let filtered = apply_filters(records, &config.filters);
    let observations = normalize_records(&filtered, config)?;
    if observations.is_empty() {
        return Ok(None);
    }

    let mut points = aggregate_curve(&observations, config.revenue_scale);
    if points.is_empty() {
        return Ok(None);
    }

    if config.bootstrap.enabled {
        bootstrap_bounds(
            &observations,
            &mut points,
            &config.bootstrap,
            config.revenue_scale,
            progress,
        )?;
    }

    let mut curve = interpolate_curve(&points, config.curve_steps, config.revenue_scale);
    let Some(best) = find_optimum(&curve) else {
        return Ok(None);
    };

    let max_revenue = curve[best].revenue;
    apply_revenue_scaling(&mut points, &mut curve, max_revenue);
    let optimal = curve[best];

    let price_range = config
        .range
        .and_then(|method| find_range(&curve, &optimal, max_revenue, method));

    let effective_sample_size = observations
        .iter()
        .map(|o| o.respondent.as_str())
        .collect::<HashSet<_>>()
        .len();

    Ok(Some(AnalysisResult {
        points,
        curve,
        optimal,
        price_range,
        effective_sample_size,
    }))
}

/// Status of one recomputation, tagged with its generation
#[derive(Debug, Clone)]
pub enum AnalysisStatus {
    Running { generation: u64, bootstrap: bool },
    Completed {
        generation: u64,
        result: Option<Arc<AnalysisResult>>,
    },
    Failed { generation: u64, error: String },
}

/// Serializes recomputations over one immutable record snapshot.
///
/// Each submitted configuration gets a monotonically increasing generation.
/// Runs are never cancelled: a stale run finishes, but only the highest
/// completed generation is published (last-writer-wins), and every handed-out
/// result is an immutable `Arc` that is never mutated in place.
pub struct AnalysisSession {
    records: Arc<Vec<RawRecord>>,
    cache: Arc<ResultCache>,
    status_tx: mpsc::Sender<AnalysisStatus>,
    published: Arc<Mutex<(u64, Option<Arc<AnalysisResult>>)>>,
    next_generation: u64,
}

impl AnalysisSession {
    pub fn new(records: Arc<Vec<RawRecord>>, status_tx: mpsc::Sender<AnalysisStatus>) -> Self {
        Self {
            records,
            cache: Arc::new(ResultCache::new()),
            status_tx,
            published: Arc::new(Mutex::new((0, None))),
            next_generation: 0,
        }
    }

    /// Latest published result, if any run has completed with one
    pub fn latest(&self) -> Option<Arc<AnalysisResult>> {
        self.published
            .lock()
            .expect("analysis session lock poisoned")
            .1
            .clone()
    }

    /// Kick off a recomputation for `config`. Signals `Running` before the
    /// pipeline starts and `Completed`/`Failed` when it ends.
    pub fn submit(&mut self, config: Config) -> JoinHandle<Result<()>> {
        self.next_generation += 1;
        let generation = self.next_generation;
        let records = Arc::clone(&self.records);
        let cache = Arc::clone(&self.cache);
        let published = Arc::clone(&self.published);
        let status_tx = self.status_tx.clone();

        tokio::spawn(async move {
            let bootstrap = config.bootstrap.enabled;
            let _ = status_tx
                .send(AnalysisStatus::Running {
                    generation,
                    bootstrap,
                })
                .await;

            let key = ResultCache::snapshot_key(&records, &config);
            if let Some(result) = cache.lookup(&key) {
                info!("Analysis generation {} served from cache", generation);
                publish(&published, generation, result.clone());
                let _ = status_tx
                    .send(AnalysisStatus::Completed { generation, result })
                    .await;
                return Ok(());
            }

            let progress = bootstrap.then(|| bootstrap_progress(config.bootstrap.iterations));
            let outcome = tokio::task::spawn_blocking(move || {
                let result = analyze_with_progress(&records, &config, progress.as_ref());
                if let Some(pb) = progress {
                    pb.finish_and_clear();
                }
                result
            })
            .await?;

            match outcome {
                Ok(result) => {
                    let result = result.map(Arc::new);
                    cache.insert(key, result.clone());
                    publish(&published, generation, result.clone());
                    let _ = status_tx
                        .send(AnalysisStatus::Completed { generation, result })
                        .await;
                    Ok(())
                }
                Err(error) => {
                    warn!("Analysis generation {} failed: {}", generation, error);
                    let _ = status_tx
                        .send(AnalysisStatus::Failed {
                            generation,
                            error: error.to_string(),
                        })
                        .await;
                    Err(error)
                }
            }
        })
    }
}

fn publish(
    published: &Mutex<(u64, Option<Arc<AnalysisResult>>)>,
    generation: u64,
    result: Option<Arc<AnalysisResult>>,
) {
    let mut guard = published.lock().expect("analysis session lock poisoned");
    if generation >= guard.0 {
        *guard = (generation, result);
    }
}

fn bootstrap_progress(iterations: usize) -> ProgressBar {
    let pb = ProgressBar::new(iterations as u64);
    pb.set_style(
        ProgressStyle::with_template("bootstrap {bar:30} {pos}/{len} iterations")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BootstrapConfig, Cell, ColumnMapping};
    use std::collections::BTreeMap;

    fn long_config() -> Config {
        Config {
            id_column: "id".to_string(),
            mapping: ColumnMapping::Long {
                price_column: "price".to_string(),
                purchase_column: "buy".to_string(),
            },
            weighting: false,
            weight_column: None,
            revenue_scale: 1.0,
            filters: BTreeMap::new(),
            bootstrap: BootstrapConfig::default(),
            curve_steps: 100,
            range: None,
            out_format: "csv".to_string(),
            output_dir: "/tmp/output".into(),
        }
    }

    fn record(id: &str, price: f64, buy: u8) -> RawRecord {
        [
            ("id".to_string(), Cell::Text(id.to_string())),
            ("price".to_string(), Cell::Number(price)),
            ("buy".to_string(), Cell::Number(f64::from(buy))),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn degenerate_input_is_none_not_error() {
        let config = long_config();
        assert!(analyze(&[], &config).unwrap().is_none());

        let unparseable = vec![record("a", f64::NAN, 1)];
        assert!(analyze(&unparseable, &config).unwrap().is_none());
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let mut config = long_config();
        config.bootstrap.enabled = true;
        config.bootstrap.iterations = 0;
        assert!(analyze(&[record("a", 10.0, 1)], &config).is_err());

        let mut config = long_config();
        config.curve_steps = 0;
        assert!(analyze(&[record("a", 10.0, 1)], &config).is_err());
    }

    #[test]
    fn effective_sample_size_counts_distinct_respondents() {
        let records = vec![
            record("a", 10.0, 1),
            record("a", 20.0, 0),
            record("b", 10.0, 1),
        ];
        let result = analyze(&records, &long_config()).unwrap().unwrap();
        assert_eq!(result.effective_sample_size, 2);
    }
}
