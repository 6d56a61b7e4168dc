use crate::types::{AnalysisResult, Cell, ColumnMapping, Config, RangeMethod, RawRecord};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Memoizes analysis results per (record snapshot, configuration) pair.
///
/// The engine is a pure function of that pair, so identical resubmissions
/// (common when a UI toggles a filter back and forth) are served without
/// recomputation. Cached entries include the `None` "not configured" outcome.
pub struct ResultCache {
    entries: Mutex<HashMap<String, Option<Arc<AnalysisResult>>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Outer `None` is a miss; inner `None` is a cached empty result
    pub fn lookup(&self, key: &str) -> Option<Option<Arc<AnalysisResult>>> {
        self.entries
            .lock()
            .expect("result cache lock poisoned")
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: String, result: Option<Arc<AnalysisResult>>) {
        self.entries
            .lock()
            .expect("result cache lock poisoned")
            .insert(key, result);
    }

    /// SHA-256 over a canonical byte encoding of the records and every
    /// configuration field that influences the result. Output-only settings
    /// (format, directories) are excluded. Record and filter maps iterate in
    /// key order, so the encoding is deterministic.
    pub fn snapshot_key(records: &[RawRecord], config: &Config) -> String {
        let mut hasher = Sha256::new();

        for record in records {
            for (column, cell) in record {
                hasher.update(column.as_bytes());
                hasher.update([0x1f]);
                feed_cell(&mut hasher, cell);
            }
            hasher.update([0x1e]);
        }

        hasher.update(config.id_column.as_bytes());
        hasher.update([0x1e]);
        match &config.mapping {
            ColumnMapping::Long {
                price_column,
                purchase_column,
            } => {
                hasher.update(b"long");
                hasher.update(price_column.as_bytes());
                hasher.update([0x1f]);
                hasher.update(purchase_column.as_bytes());
            }
            ColumnMapping::Wide {
                price_columns,
                pattern,
            } => {
                hasher.update(b"wide");
                for column in price_columns {
                    hasher.update(column.as_bytes());
                    hasher.update([0x1f]);
                }
                hasher.update(pattern.as_bytes());
            }
        }
        hasher.update([0x1e, config.weighting as u8]);
        if let Some(column) = &config.weight_column {
            hasher.update(column.as_bytes());
        }
        hasher.update(config.revenue_scale.to_bits().to_le_bytes());
        for (segment, allowed) in &config.filters {
            hasher.update(segment.as_bytes());
            hasher.update([0x1f]);
            for value in allowed {
                hasher.update(value.as_bytes());
                hasher.update([0x1f]);
            }
            hasher.update([0x1e]);
        }
        hasher.update([config.bootstrap.enabled as u8]);
        hasher.update((config.bootstrap.iterations as u64).to_le_bytes());
        hasher.update(config.bootstrap.seed.unwrap_or(0).to_le_bytes());
        hasher.update([config.bootstrap.seed.is_some() as u8]);
        hasher.update((config.curve_steps as u64).to_le_bytes());
        match config.range {
            None => hasher.update([0]),
            Some(RangeMethod::Percent(retention)) => {
                hasher.update([1]);
                hasher.update(retention.to_bits().to_le_bytes());
            }
            Some(RangeMethod::Statistical) => hasher.update([2]),
        }

        format!("{:x}", hasher.finalize())
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

fn feed_cell(hasher: &mut Sha256, cell: &Cell) {
    match cell {
        Cell::Bool(b) => hasher.update([0, *b as u8]),
        Cell::Number(v) => {
            hasher.update([1]);
            hasher.update(v.to_bits().to_le_bytes());
        }
        Cell::Text(s) => {
            hasher.update([2]);
            hasher.update(s.as_bytes());
        }
        Cell::Empty => hasher.update([3]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BootstrapConfig;
    use std::collections::BTreeMap;

    fn config() -> Config {
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

    fn record(id: &str) -> RawRecord {
        [("id".to_string(), Cell::Text(id.to_string()))]
            .into_iter()
            .collect()
    }

    #[test]
    fn key_is_stable_and_input_sensitive() {
        let records = vec![record("a"), record("b")];
        let base = ResultCache::snapshot_key(&records, &config());
        assert_eq!(base, ResultCache::snapshot_key(&records, &config()));

        let other_records = vec![record("a"), record("c")];
        assert_ne!(base, ResultCache::snapshot_key(&other_records, &config()));

        let mut other_config = config();
        other_config.revenue_scale = 2.0;
        assert_ne!(base, ResultCache::snapshot_key(&records, &other_config));
    }

    #[test]
    fn output_settings_do_not_affect_key() {
        let records = vec![record("a")];
        let base = ResultCache::snapshot_key(&records, &config());
        let mut other = config();
        other.out_format = "parquet".to_string();
        other.output_dir = "/elsewhere".into();
        assert_eq!(base, ResultCache::snapshot_key(&records, &other));
    }

    #[test]
    fn caches_empty_results_distinctly() {
        let cache = ResultCache::new();
        assert!(cache.lookup("k").is_none());
        cache.insert("k".to_string(), None);
        assert!(matches!(cache.lookup("k"), Some(None)));
    }
}
