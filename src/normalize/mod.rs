use crate::types::{Cell, ColumnMapping, Config, Observation, RawRecord, AFFIRMATIVE_ANSWERS};
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Map an arbitrary cell to a 0/1 purchase indicator.
///
/// Booleans map to themselves, numbers are affirmative iff > 0, strings are
/// affirmative iff their trimmed lowercase form is in [`AFFIRMATIVE_ANSWERS`],
/// and everything else (including a missing cell) is 0.
pub fn map_buy(cell: Option<&Cell>) -> u8 {
    match cell {
        Some(Cell::Bool(b)) => *b as u8,
        Some(Cell::Number(v)) => (*v > 0.0) as u8,
        Some(Cell::Text(s)) => {
            let normalized = s.trim().to_lowercase();
            AFFIRMATIVE_ANSWERS.contains(&normalized.as_str()) as u8
        }
        _ => 0,
    }
}

/// Resolve the weight of one record. Defaults to 1 whenever weighting is
/// disabled, no weight column is configured, or the cell does not parse to a
/// finite positive number. Never 0, so a respondent is never silently erased.
fn resolve_weight(record: &RawRecord, config: &Config) -> f64 {
    if !config.weighting {
        return 1.0;
    }
    let Some(column) = config.weight_column.as_deref() else {
        return 1.0;
    };
    match record.get(column).and_then(Cell::as_number) {
        Some(w) if w > 0.0 => w,
        _ => 1.0,
    }
}

/// True iff the record passes every active segment filter.
///
/// Filters are AND across segments and OR within a segment's allowed set;
/// an empty allowed set means "no restriction" for that segment.
pub fn record_passes(record: &RawRecord, filters: &BTreeMap<String, BTreeSet<String>>) -> bool {
    filters.iter().all(|(segment, allowed)| {
        if allowed.is_empty() {
            return true;
        }
        let value = record.get(segment).map(Cell::as_text).unwrap_or_default();
        allowed.contains(&value)
    })
}

/// Apply the segment filters, keeping record order
pub fn apply_filters<'a>(
    records: &'a [RawRecord],
    filters: &BTreeMap<String, BTreeSet<String>>,
) -> Vec<&'a RawRecord> {
    records
        .iter()
        .filter(|r| record_passes(r, filters))
        .collect()
}

/// Turn filtered raw records into canonical observations.
///
/// Long format yields at most one observation per record; wide format yields
/// one per (record, price column) pair whose column name matches the price
/// extraction pattern. Records with unparseable prices are dropped, malformed
/// purchase cells map to 0, malformed weights default to 1. An unconfigured
/// mapping produces an empty sequence, not an error.
pub fn normalize_records(records: &[&RawRecord], config: &Config) -> Result<Vec<Observation>> {
    if config.id_column.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut observations = Vec::new();

    match &config.mapping {
        ColumnMapping::Long {
            price_column,
            purchase_column,
        } => {
            if price_column.trim().is_empty() || purchase_column.trim().is_empty() {
                return Ok(Vec::new());
            }
            for record in records {
                let Some(price) = record.get(price_column).and_then(Cell::as_number) else {
                    continue;
                };
                observations.push(Observation {
                    respondent: record
                        .get(&config.id_column)
                        .map(Cell::as_text)
                        .unwrap_or_default(),
                    price,
                    purchase: map_buy(record.get(purchase_column)),
                    weight: resolve_weight(record, config),
                });
            }
        }
        ColumnMapping::Wide {
            price_columns,
            pattern,
        } => {
            if price_columns.is_empty() {
                return Ok(Vec::new());
            }
            let re = Regex::new(pattern)
                .with_context(|| format!("Invalid price extraction pattern '{}'", pattern))?;

            // Prices depend only on column names; extract them once.
            // First match wins, and colliding extracted prices are allowed
            // to merge downstream.
            let column_prices: Vec<(&String, f64)> = price_columns
                .iter()
                .filter_map(|column| {
                    let price = re.find(column)?.as_str().parse::<f64>().ok()?;
                    price.is_finite().then_some((column, price))
                })
                .collect();

            for record in records {
                let respondent = record
                    .get(&config.id_column)
                    .map(Cell::as_text)
                    .unwrap_or_default();
                let weight = resolve_weight(record, config);
                for (column, price) in &column_prices {
                    observations.push(Observation {
                        respondent: respondent.clone(),
                        price: *price,
                        purchase: map_buy(record.get(*column)),
                        weight,
                    });
                }
            }
        }
    }

    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BootstrapConfig;

    fn base_config() -> Config {
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

    fn record(entries: &[(&str, Cell)]) -> RawRecord {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn map_buy_is_total() {
        assert_eq!(map_buy(Some(&Cell::Bool(true))), 1);
        assert_eq!(map_buy(Some(&Cell::Bool(false))), 0);
        assert_eq!(map_buy(Some(&Cell::Number(0.5))), 1);
        assert_eq!(map_buy(Some(&Cell::Number(0.0))), 0);
        assert_eq!(map_buy(Some(&Cell::Number(-1.0))), 0);
        assert_eq!(map_buy(Some(&Cell::Text("  YES ".into()))), 1);
        assert_eq!(map_buy(Some(&Cell::Text("on".into()))), 1);
        assert_eq!(map_buy(Some(&Cell::Text("yess".into()))), 0);
        assert_eq!(map_buy(Some(&Cell::Text("no".into()))), 0);
        assert_eq!(map_buy(Some(&Cell::Empty)), 0);
        assert_eq!(map_buy(None), 0);
    }

    #[test]
    fn long_format_drops_unparseable_prices() {
        let records = vec![
            record(&[("id", Cell::Text("a".into())), ("price", Cell::Number(10.0)), ("buy", Cell::Number(1.0))]),
            record(&[("id", Cell::Text("b".into())), ("price", Cell::Text("n/a".into())), ("buy", Cell::Number(1.0))]),
            record(&[("id", Cell::Text("c".into())), ("price", Cell::Number(f64::NAN)), ("buy", Cell::Number(1.0))]),
        ];
        let refs: Vec<&RawRecord> = records.iter().collect();
        let obs = normalize_records(&refs, &base_config()).unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].respondent, "a");
        assert_eq!(obs[0].price, 10.0);
        assert_eq!(obs[0].purchase, 1);
        assert_eq!(obs[0].weight, 1.0);
    }

    #[test]
    fn wide_format_extracts_prices_from_column_names() {
        let mut config = base_config();
        config.mapping = ColumnMapping::Wide {
            price_columns: vec!["Price_10".to_string(), "Price_20".to_string()],
            pattern: r"\d+".to_string(),
        };
        let records = vec![record(&[
            ("id", Cell::Text("r1".into())),
            ("Price_10", Cell::Number(1.0)),
            ("Price_20", Cell::Number(0.0)),
        ])];
        let refs: Vec<&RawRecord> = records.iter().collect();
        let obs = normalize_records(&refs, &config).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!((obs[0].price, obs[0].purchase), (10.0, 1));
        assert_eq!((obs[1].price, obs[1].purchase), (20.0, 0));
        assert_eq!(obs[0].respondent, obs[1].respondent);
    }

    #[test]
    fn wide_format_skips_unmatched_columns() {
        let mut config = base_config();
        config.mapping = ColumnMapping::Wide {
            price_columns: vec!["Price_10".to_string(), "Comment".to_string()],
            pattern: r"\d+".to_string(),
        };
        let records = vec![record(&[
            ("id", Cell::Text("r1".into())),
            ("Price_10", Cell::Number(1.0)),
            ("Comment", Cell::Text("yes".into())),
        ])];
        let refs: Vec<&RawRecord> = records.iter().collect();
        let obs = normalize_records(&refs, &config).unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].price, 10.0);
    }

    #[test]
    fn weight_defaults_never_zero() {
        let mut config = base_config();
        config.weighting = true;
        config.weight_column = Some("w".to_string());
        let records = vec![
            record(&[("id", Cell::Text("a".into())), ("price", Cell::Number(5.0)), ("buy", Cell::Number(1.0)), ("w", Cell::Number(2.5))]),
            record(&[("id", Cell::Text("b".into())), ("price", Cell::Number(5.0)), ("buy", Cell::Number(1.0)), ("w", Cell::Text("bad".into()))]),
            record(&[("id", Cell::Text("c".into())), ("price", Cell::Number(5.0)), ("buy", Cell::Number(1.0)), ("w", Cell::Number(0.0))]),
        ];
        let refs: Vec<&RawRecord> = records.iter().collect();
        let obs = normalize_records(&refs, &config).unwrap();
        assert_eq!(obs[0].weight, 2.5);
        assert_eq!(obs[1].weight, 1.0);
        assert_eq!(obs[2].weight, 1.0);
    }

    #[test]
    fn unconfigured_mapping_yields_empty() {
        let mut config = base_config();
        config.id_column = String::new();
        let records = vec![record(&[("price", Cell::Number(5.0))])];
        let refs: Vec<&RawRecord> = records.iter().collect();
        assert!(normalize_records(&refs, &config).unwrap().is_empty());
    }

    #[test]
    fn segment_filters_and_across_or_within() {
        let mut filters = BTreeMap::new();
        filters.insert(
            "region".to_string(),
            ["north".to_string(), "south".to_string()].into_iter().collect(),
        );
        filters.insert("tier".to_string(), BTreeSet::new()); // no restriction

        let north = record(&[("region", Cell::Text("north".into())), ("tier", Cell::Number(1.0))]);
        let east = record(&[("region", Cell::Text("east".into())), ("tier", Cell::Number(1.0))]);
        let missing = record(&[("tier", Cell::Number(1.0))]);

        assert!(record_passes(&north, &filters));
        assert!(!record_passes(&east, &filters));
        assert!(!record_passes(&missing, &filters));

        let records = vec![north, east];
        assert_eq!(apply_filters(&records, &filters).len(), 1);
    }
}
