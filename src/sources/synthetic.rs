use crate::sources::RecordSource;
use crate::types::{Cell, RawRecord, SurveyModel, RECORD_BATCH_SIZE};
use anyhow::Result;
use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tokio::sync::mpsc;
use tracing::info;

const REGIONS: [&str; 4] = ["north", "south", "east", "west"];

/// Generates long-format willingness-to-buy records from a demand model.
/// One record per (respondent, price) pair, with a jittered respondent
/// weight and a cycling region segment for filter exercises.
pub struct SyntheticSource {
    model: SurveyModel,
}

impl SyntheticSource {
    pub fn new(model: SurveyModel) -> Self {
        Self { model }
    }

    fn buy_probability(&self, price: f64) -> f64 {
        match &self.model {
            SurveyModel::Logistic {
                midpoint, steepness, ..
            } => 1.0 / (1.0 + (steepness * (price - midpoint)).exp()),
            SurveyModel::Linear {
                intercept, slope, ..
            } => (intercept + slope * price).clamp(0.0, 1.0),
        }
    }

    fn generate_records(&self) -> Vec<RawRecord> {
        let mut rng = StdRng::from_entropy();
        let weight_jitter: Normal<f64> =
            Normal::new(1.0, 0.15).expect("valid distribution parameters");

        let (respondents, prices) = match &self.model {
            SurveyModel::Logistic {
                respondents, prices, ..
            }
            | SurveyModel::Linear {
                respondents, prices, ..
            } => (*respondents, prices.clone()),
        };

        let mut records = Vec::with_capacity(respondents * prices.len());
        for r in 0..respondents {
            let id = format!("resp-{:05}", r);
            let weight = weight_jitter.sample(&mut rng).max(0.1);
            let region = REGIONS[r % REGIONS.len()];

            for &price in &prices {
                let buy = rng.gen_bool(self.buy_probability(price));
                let record: RawRecord = [
                    ("id".to_string(), Cell::Text(id.clone())),
                    ("price".to_string(), Cell::Number(price)),
                    ("buy".to_string(), Cell::Bool(buy)),
                    ("weight".to_string(), Cell::Number(weight)),
                    ("region".to_string(), Cell::Text(region.to_string())),
                ]
                .into_iter()
                .collect();
                records.push(record);
            }
        }

        records
    }
}

#[async_trait]
impl RecordSource for SyntheticSource {
    async fn fetch_records(&self, tx: mpsc::Sender<Vec<RawRecord>>) -> Result<()> {
        info!("Generating synthetic survey using {:?}", self.model);

        let records = self.generate_records();
        let total = records.len();

        for chunk in records.chunks(RECORD_BATCH_SIZE) {
            tx.send(chunk.to_vec()).await?;
        }

        info!("Generated {} synthetic records", total);
        Ok(())
    }
}
