pub mod analytics;
pub mod cache;
pub mod calibration;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod fuzzy;
pub mod index;
pub mod ingest;
pub mod models;
pub mod normalizer;
pub mod orchestrator;
pub mod scoring;
pub mod traits;
pub mod validator;

pub use analytics::{AnalyticsSummary, BenchmarkReport, BenchmarkSample, SearchLogEntry};
pub use cache::{catalog_fingerprint, procedure_key, query_key, CacheEntry, TtlCache};
pub use calibration::{
    CalibrationCatalog, CalibrationGuide, HttpProcedureSource, OfflineSource, TroubleshootingGuide,
};
pub use cleaner::clean;
pub use config::{CatalogConfig, DatabaseConfig, SearchConfig};
pub use error::{CacheError, ExportError, FetchError, LoadError};
pub use index::{IndexStats, SearchIndex};
pub use ingest::{read_dataset, read_dataset_file, Column, RawDataset, RawRow};
pub use models::{
    AdvancedCriteria, CalibrationKind, CalibrationProcedure, Dataset, DurationRange, Feature,
    SearchFilters, SearchMethod, SearchOutcome, SearchStats, VehicleMatch, VehicleRecord,
};
pub use normalizer::{extract_brands, extract_numbers, normalize};
pub use orchestrator::{CatalogSnapshot, CatalogStatistics, LoadSummary, SearchEngine};
pub use traits::{Clock, ProcedureSource, SystemClock};
pub use validator::{validate, ValidationReport, ValidationStatistics};
