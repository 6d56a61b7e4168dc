use crate::types::{
    BootstrapConfig, ColumnMapping, Config, DataSource, RangeMethod, SurveyModel,
    DEFAULT_BOOTSTRAP_ITERATIONS, DEFAULT_CURVE_STEPS,
};
use anyhow::{anyhow, Result};
use clap::Parser;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Record source: a CSV file path, or a synthetic survey spec like
    /// logistic(200,10|20|30|40|50,30,0.15) or linear(200,10|20|30,1.2,-0.03)
    #[arg(long, default_value = "logistic(200,10|20|30|40|50,30,0.15)")]
    pub source: String,

    #[arg(long, default_value = "id")]
    pub id_col: String,

    /// Input shape: "long" (price + purchase columns) or "wide"
    /// (one purchase column per price)
    #[arg(long, default_value = "long")]
    pub format: String,

    #[arg(long, default_value = "price")]
    pub price_col: String,

    #[arg(long, default_value = "buy")]
    pub buy_col: String,

    /// Wide-format purchase columns
    #[arg(long, value_delimiter = '|')]
    pub wide_cols: Vec<String>,

    /// Pattern extracting the price from a wide-format column name
    #[arg(long, default_value = r"\d+(\.\d+)?")]
    pub wide_pattern: String,

    #[arg(long, default_value = "false")]
    pub weighting: bool,

    #[arg(long)]
    pub weight_col: Option<String>,

    #[arg(long, default_value = "1.0")]
    pub revenue_scale: f64,

    /// Segment filter, repeatable: --filter "region=north|south"
    #[arg(long)]
    pub filter: Vec<String>,

    #[arg(long, default_value = "false")]
    pub bootstrap: bool,

    #[arg(long, default_value_t = DEFAULT_BOOTSTRAP_ITERATIONS)]
    pub bootstrap_iters: usize,

    /// Fixed bootstrap seed for reproducible bounds
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_CURVE_STEPS)]
    pub steps: usize,

    /// Price range method: "none", "percent", or "statistical"
    #[arg(long, default_value = "none")]
    pub range_method: String,

    /// Retention percentage for the "percent" range method
    #[arg(long, default_value = "80.0")]
    pub retention: f64,

    #[arg(long, default_value = "csv")]
    pub out_format: String,

    #[arg(long, default_value = "./output")]
    pub output_dir: PathBuf,
}

impl Args {
    pub fn into_config(self) -> Result<Config> {
        let mapping = match self.format.as_str() {
            "long" => ColumnMapping::Long {
                price_column: self.price_col,
                purchase_column: self.buy_col,
            },
            "wide" => {
                if self.wide_cols.is_empty() {
                    return Err(anyhow!("Wide format requires --wide-cols"));
                }
                ColumnMapping::Wide {
                    price_columns: self.wide_cols,
                    pattern: self.wide_pattern,
                }
            }
            _ => return Err(anyhow!("Invalid input format: {}", self.format)),
        };

        let range = match self.range_method.as_str() {
            "none" => None,
            "percent" => {
                if self.retention <= 0.0 {
                    return Err(anyhow!("Retention percentage must be positive"));
                }
                Some(RangeMethod::Percent(self.retention))
            }
            "statistical" => Some(RangeMethod::Statistical),
            _ => return Err(anyhow!("Invalid range method: {}", self.range_method)),
        };

        if self.bootstrap && self.bootstrap_iters == 0 {
            return Err(anyhow!("Bootstrap iterations must be positive"));
        }
        if !matches!(self.out_format.as_str(), "csv" | "parquet") {
            return Err(anyhow!("Invalid output format: {}", self.out_format));
        }

        let mut filters = BTreeMap::new();
        for spec in &self.filter {
            let (segment, values) = parse_filter(spec)?;
            filters.insert(segment, values);
        }

        Ok(Config {
            id_column: self.id_col,
            mapping,
            weighting: self.weighting,
            weight_column: self.weight_col,
            revenue_scale: self.revenue_scale,
            filters,
            bootstrap: BootstrapConfig {
                enabled: self.bootstrap,
                iterations: self.bootstrap_iters,
                seed: self.seed,
            },
            curve_steps: self.steps,
            range,
            out_format: self.out_format,
            output_dir: self.output_dir,
        })
    }
}

/// Parse one "segment=value|value" filter spec
fn parse_filter(spec: &str) -> Result<(String, BTreeSet<String>)> {
    let (segment, values) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid filter '{}', expected segment=value|value", spec))?;
    if segment.trim().is_empty() {
        return Err(anyhow!("Invalid filter '{}', empty segment name", spec));
    }
    let allowed: BTreeSet<String> = values
        .split('|')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    Ok((segment.trim().to_string(), allowed))
}

pub fn parse_data_source(source: &str) -> Result<DataSource> {
    let logistic_re = Regex::new(r"^logistic\(([^,]+),([^,]+),([^,]+),([^)]+)\)$")?;
    let linear_re = Regex::new(r"^linear\(([^,]+),([^,]+),([^,]+),([^)]+)\)$")?;

    if let Some(caps) = logistic_re.captures(source) {
        Ok(DataSource::Synthetic(SurveyModel::Logistic {
            respondents: caps[1].parse()?,
            prices: parse_prices(&caps[2])?,
            midpoint: caps[3].parse()?,
            steepness: caps[4].parse()?,
        }))
    } else if let Some(caps) = linear_re.captures(source) {
        Ok(DataSource::Synthetic(SurveyModel::Linear {
            respondents: caps[1].parse()?,
            prices: parse_prices(&caps[2])?,
            intercept: caps[3].parse()?,
            slope: caps[4].parse()?,
        }))
    } else {
        // It's a file path
        Ok(DataSource::File(PathBuf::from(source)))
    }
}

fn parse_prices(spec: &str) -> Result<Vec<f64>> {
    let prices: Vec<f64> = spec
        .split('|')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()?;
    if prices.is_empty() {
        return Err(anyhow!("Synthetic source needs at least one price"));
    }
    Ok(prices)
}
