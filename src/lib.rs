pub mod aggregation;
pub mod analysis;
pub mod bootstrap;
pub mod cache;
pub mod cli;
pub mod display;
pub mod interpolate;
pub mod normalize;
pub mod optimize;
pub mod output;
pub mod sources;
pub mod types;

// Re-exports for library users
pub use analysis::{analyze, AnalysisSession, AnalysisStatus};
pub use aggregation::aggregate_curve;
pub use bootstrap::bootstrap_bounds;
pub use interpolate::interpolate_curve;
pub use normalize::{apply_filters, map_buy, normalize_records, record_passes};
pub use optimize::{find_optimum, find_range};
pub use sources::{create_source, RecordSource};
pub use types::{
    AnalysisResult, BootstrapConfig, Cell, ColumnMapping, Config, CurvePoint, DataSource,
    Observation, PricePoint, PriceRange, RangeMethod, RawRecord, SurveyModel,
    DEFAULT_BOOTSTRAP_ITERATIONS, DEFAULT_CURVE_STEPS, RECORD_BATCH_SIZE,
};
