pub mod file;
pub mod synthetic;

use crate::types::{DataSource, RawRecord};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Streams raw survey records in batches over a channel
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_records(&self, tx: mpsc::Sender<Vec<RawRecord>>) -> Result<()>;
}

pub async fn create_source(source: &DataSource) -> Result<Box<dyn RecordSource>> {
    match source {
        DataSource::File(path) => Ok(Box::new(file::CsvSource::new(path.clone()))),
        DataSource::Synthetic(model) => {
            Ok(Box::new(synthetic::SyntheticSource::new(model.clone())))
        }
    }
}
