use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Default number of cluster-bootstrap resampling iterations
pub const DEFAULT_BOOTSTRAP_ITERATIONS: usize = 300;

/// Default number of interpolation steps between min and max observed price
pub const DEFAULT_CURVE_STEPS: usize = 100;

/// Batch size used by record sources when streaming over channels
pub const RECORD_BATCH_SIZE: usize = 1000;

/// Strings counted as an affirmative purchase answer (after trim + lowercase)
pub const AFFIRMATIVE_ANSWERS: [&str; 5] = ["1", "yes", "y", "true", "on"];

/// One value of a heterogeneous survey record
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Bool(bool),
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    /// Numeric view of the cell. Returns `None` for anything that does not
    /// parse to a finite number; booleans are not numbers here.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) if v.is_finite() => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// String coercion used by segment filters and respondent identifiers
    pub fn as_text(&self) -> String {
        match self {
            Cell::Bool(b) => b.to_string(),
            Cell::Number(v) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    format!("{}", *v as i64)
                } else {
                    format!("{}", v)
                }
            }
            Cell::Text(s) => s.clone(),
            Cell::Empty => String::new(),
        }
    }
}

/// A raw tabular row as delivered by a record source.
///
/// Keys are column names. A `BTreeMap` keeps iteration order deterministic,
/// which the result cache relies on when hashing snapshots.
pub type RawRecord = BTreeMap<String, Cell>;

/// One (respondent, price) purchase-intent observation
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub respondent: String,
    pub price: f64,
    /// 0 or 1
    pub purchase: u8,
    pub weight: f64,
}

/// One distinct price on the aggregated demand curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    /// Unweighted observation count at this price
    pub sample_count: usize,
    /// Weighted purchase rate in [0, 1]
    pub demand: f64,
    /// price * demand * revenue_scale
    pub revenue: f64,
    /// revenue / max interpolated revenue, filled in by the optimizer
    pub revenue_scaled: f64,
    pub demand_low: Option<f64>,
    pub demand_high: Option<f64>,
    pub revenue_low: Option<f64>,
    pub revenue_high: Option<f64>,
}

/// One synthetic point on the interpolated curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub price: f64,
    pub demand: f64,
    pub revenue: f64,
    pub revenue_scaled: f64,
    pub demand_low: Option<f64>,
    pub demand_high: Option<f64>,
    pub revenue_low: Option<f64>,
    pub revenue_high: Option<f64>,
}

/// Acceptable price interval around the optimum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub low: f64,
    pub high: f64,
}

/// Terminal, immutable analysis bundle. Superseded wholesale whenever the
/// input data, filters, or configuration change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub points: Vec<PricePoint>,
    pub curve: Vec<CurvePoint>,
    pub optimal: CurvePoint,
    pub price_range: Option<PriceRange>,
    /// Distinct respondent identifiers surviving filtering
    pub effective_sample_size: usize,
}

/// How purchase-at-a-price is laid out in the input table
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnMapping {
    /// One row per (respondent, price) pair
    Long {
        price_column: String,
        purchase_column: String,
    },
    /// One purchase column per price; the price is extracted from the
    /// column name with `pattern` (first match wins)
    Wide {
        price_columns: Vec<String>,
        pattern: String,
    },
}

impl std::fmt::Display for ColumnMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnMapping::Long { .. } => write!(f, "long"),
            ColumnMapping::Wide { .. } => write!(f, "wide"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapConfig {
    pub enabled: bool,
    pub iterations: usize,
    /// Fixed seed for reproducible bounds; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            iterations: DEFAULT_BOOTSTRAP_ITERATIONS,
            seed: None,
        }
    }
}

/// How the retention threshold for the acceptable price range is derived
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeMethod {
    /// threshold = max revenue * (percent / 100)
    Percent(f64),
    /// threshold = bootstrap revenue lower bound at the optimum,
    /// falling back to 95% of max revenue when no bound exists
    Statistical,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Column holding the opaque respondent identifier
    pub id_column: String,
    pub mapping: ColumnMapping,
    pub weighting: bool,
    pub weight_column: Option<String>,
    /// Multiplier projecting price * demand to a market-level magnitude
    pub revenue_scale: f64,
    /// segment column -> allowed values (empty set means no restriction)
    pub filters: BTreeMap<String, BTreeSet<String>>,
    pub bootstrap: BootstrapConfig,
    pub curve_steps: usize,
    pub range: Option<RangeMethod>,
    pub out_format: String,
    pub output_dir: PathBuf,
}

/// Where raw survey records come from
#[derive(Debug, Clone)]
pub enum DataSource {
    File(PathBuf),
    Synthetic(SurveyModel),
}

/// Generative models for synthetic willingness-to-buy data
#[derive(Debug, Clone)]
pub enum SurveyModel {
    /// P(buy at p) = 1 / (1 + exp(steepness * (p - midpoint)))
    Logistic {
        respondents: usize,
        prices: Vec<f64>,
        midpoint: f64,
        steepness: f64,
    },
    /// P(buy at p) = clamp(intercept + slope * p, 0, 1)
    Linear {
        respondents: usize,
        prices: Vec<f64>,
        intercept: f64,
        slope: f64,
    },
}
