use crate::types::{Config, PricePoint};
use anyhow::Result;
use arrow::array::{Float64Array, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

/// Writes the aggregated price table (price, n, demand, revenue, bounds)
/// to CSV or Parquet. The table is a direct projection of the PricePoint
/// sequence; nothing is recomputed here.
pub struct OutputWriter;

impl OutputWriter {
    pub fn new() -> Self {
        Self
    }

    pub async fn write_points(&self, config: &Config, points: &[PricePoint]) -> Result<PathBuf> {
        if points.is_empty() {
            anyhow::bail!("No price points to write");
        }

        std::fs::create_dir_all(&config.output_dir)?;
        let output_path = config.output_dir.join(self.generate_filename(config));

        match config.out_format.as_str() {
            "csv" => self.write_csv(&output_path, points)?,
            "parquet" => self.write_parquet(&output_path, points)?,
            other => anyhow::bail!("Unsupported output format: {}", other),
        }

        Ok(output_path)
    }

    fn write_csv(&self, path: &PathBuf, points: &[PricePoint]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "price",
            "n",
            "demand",
            "revenue",
            "revenue_scaled",
            "demand_low",
            "demand_high",
            "revenue_low",
            "revenue_high",
        ])?;

        let fmt_bound = |b: Option<f64>| b.map(|v| v.to_string()).unwrap_or_default();
        for point in points {
            writer.write_record([
                point.price.to_string(),
                point.sample_count.to_string(),
                point.demand.to_string(),
                point.revenue.to_string(),
                point.revenue_scaled.to_string(),
                fmt_bound(point.demand_low),
                fmt_bound(point.demand_high),
                fmt_bound(point.revenue_low),
                fmt_bound(point.revenue_high),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_parquet(&self, path: &PathBuf, points: &[PricePoint]) -> Result<()> {
        let prices: Vec<f64> = points.iter().map(|p| p.price).collect();
        let counts: Vec<u32> = points.iter().map(|p| p.sample_count as u32).collect();
        let demands: Vec<f64> = points.iter().map(|p| p.demand).collect();
        let revenues: Vec<f64> = points.iter().map(|p| p.revenue).collect();
        let scaled: Vec<f64> = points.iter().map(|p| p.revenue_scaled).collect();
        let demand_lows: Vec<Option<f64>> = points.iter().map(|p| p.demand_low).collect();
        let demand_highs: Vec<Option<f64>> = points.iter().map(|p| p.demand_high).collect();
        let revenue_lows: Vec<Option<f64>> = points.iter().map(|p| p.revenue_low).collect();
        let revenue_highs: Vec<Option<f64>> = points.iter().map(|p| p.revenue_high).collect();

        let schema = Schema::new(vec![
            Field::new("price", DataType::Float64, false),
            Field::new("n", DataType::UInt32, false),
            Field::new("demand", DataType::Float64, false),
            Field::new("revenue", DataType::Float64, false),
            Field::new("revenue_scaled", DataType::Float64, false),
            Field::new("demand_low", DataType::Float64, true),
            Field::new("demand_high", DataType::Float64, true),
            Field::new("revenue_low", DataType::Float64, true),
            Field::new("revenue_high", DataType::Float64, true),
        ]);

        let batch = RecordBatch::try_new(
            Arc::new(schema.clone()),
            vec![
                Arc::new(Float64Array::from(prices)) as _,
                Arc::new(UInt32Array::from(counts)) as _,
                Arc::new(Float64Array::from(demands)) as _,
                Arc::new(Float64Array::from(revenues)) as _,
                Arc::new(Float64Array::from(scaled)) as _,
                Arc::new(Float64Array::from(demand_lows)) as _,
                Arc::new(Float64Array::from(demand_highs)) as _,
                Arc::new(Float64Array::from(revenue_lows)) as _,
                Arc::new(Float64Array::from(revenue_highs)) as _,
            ],
        )?;

        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, Arc::new(schema), None)?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }

    /// Filename from the column mapping mode, bootstrap setting, and run date
    fn generate_filename(&self, config: &Config) -> String {
        let date = Utc::now().format("%Y%m%d");
        let bounds = if config.bootstrap.enabled { "bounds" } else { "plain" };
        format!(
            "demand-curve_{}_{}_{}.{}",
            config.mapping, bounds, date, config.out_format
        )
    }
}

impl Default for OutputWriter {
    fn default() -> Self {
        Self::new()
    }
}
