use crate::analytics::{
    AnalyticsSummary, BenchmarkReport, BenchmarkSample, SearchAnalytics, SearchLogEntry,
};
use crate::cache::{catalog_fingerprint, query_key, TtlCache};
use crate::cleaner::clean;
use crate::config::{DatabaseConfig, SearchConfig};
use crate::error::{ExportError, LoadError};
use crate::index::{IndexStats, SearchIndex};
use crate::ingest::{read_dataset, read_dataset_file, RawDataset};
use crate::normalizer::normalize;
use crate::scoring::{
    apply_filters, brand_model_relevance, meets_criteria, rank, relevance, QueryTerms, MAX_SCORE,
};
use crate::traits::{Clock, SystemClock};
use crate::validator::{ranked_counts, round2, validate, ValidationReport};
use crate::{
    AdvancedCriteria, Dataset, SearchFilters, SearchMethod, SearchOutcome, SearchStats,
    VehicleMatch, VehicleRecord,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, info, warn};

const TOP_ADAS_BRANDS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadSummary {
    pub source: String,
    pub rows: usize,
    pub columns: usize,
    pub load_time_ms: f64,
    pub loaded_at: DateTime<Utc>,
    pub validation: Option<ValidationReport>,
}

/// A dataset, the index built from it and how it got loaded. Never mutated
/// after construction; a reload installs a new snapshot.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    pub dataset: Dataset,
    pub index: SearchIndex,
    pub summary: Option<LoadSummary>,
    pub fingerprint: String,
}

impl CatalogSnapshot {
    pub fn new(dataset: Dataset, summary: Option<LoadSummary>) -> Self {
        let index = SearchIndex::build(&dataset);
        let fingerprint = catalog_fingerprint(&dataset.records);
        Self {
            dataset,
            index,
            summary,
            fingerprint,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdasStatistics {
    pub total_vehicles: usize,
    pub vehicles_with_adas: usize,
    pub adas_percentage: f64,
    pub windshield_adas: usize,
    pub bumper_adas: usize,
    pub calibration_kinds: Vec<(String, usize)>,
    pub top_brands_with_adas: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogStatistics {
    pub adas: AdasStatistics,
    pub index: IndexStats,
    pub load: Option<LoadSummary>,
    pub analytics: AnalyticsSummary,
    pub cached_searches: usize,
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    metadata: ExportMetadata,
    data: &'a [VehicleRecord],
}

#[derive(Serialize)]
struct ExportMetadata {
    created_at: DateTime<Utc>,
    total_records: usize,
    source: Option<String>,
}

pub struct SearchEngine {
    snapshot: RwLock<Arc<CatalogSnapshot>>,
    cache: TtlCache<Vec<VehicleMatch>>,
    analytics: Mutex<SearchAnalytics>,
    config: SearchConfig,
    database: DatabaseConfig,
    clock: Arc<dyn Clock>,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(SearchConfig::default(), DatabaseConfig::default())
    }
}

impl SearchEngine {
    pub fn new(config: SearchConfig, database: DatabaseConfig) -> Self {
        Self::with_clock(config, database, Arc::new(SystemClock))
    }

    pub fn with_clock(config: SearchConfig, database: DatabaseConfig, clock: Arc<dyn Clock>) -> Self {
        let ttl = Duration::hours(config.cache_ttl_hours);
        let cache = match &config.cache_path {
            Some(path) => TtlCache::persistent(path.clone(), ttl, clock.clone()),
            None => TtlCache::with_clock(ttl, clock.clone()),
        };
        Self::with_cache(config, database, cache, clock)
    }

    pub fn with_cache(
        config: SearchConfig,
        database: DatabaseConfig,
        cache: TtlCache<Vec<VehicleMatch>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(CatalogSnapshot::default())),
            cache,
            analytics: Mutex::new(SearchAnalytics::new(config.analytics_capacity)),
            config,
            database,
            clock,
        }
    }

    /// The snapshot searches currently run against.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn load_from_path(&self, path: &Path) -> Result<LoadSummary, LoadError> {
        let raw = read_dataset_file(path, &self.database)?;
        self.load_dataset(raw, &path.display().to_string())
    }

    pub fn load_from_reader<R: Read>(&self, reader: R, source: &str) -> Result<LoadSummary, LoadError> {
        let raw = read_dataset(reader, &self.database)?;
        self.load_dataset(raw, source)
    }

    pub fn load_demo(&self) -> Result<LoadSummary, LoadError> {
        self.load_dataset(RawDataset::demo(), "demo")
    }

    /// Validates, cleans and indexes `raw`, then swaps it in. On error the
    /// previous snapshot stays active.
    pub fn load_dataset(&self, raw: RawDataset, source: &str) -> Result<LoadSummary, LoadError> {
        let started = Instant::now();
        let missing = raw.missing_required_columns();

        let report = if self.database.auto_validate || !missing.is_empty() {
            Some(validate(&raw))
        } else {
            None
        };

        if !missing.is_empty() {
            let columns = missing
                .iter()
                .map(|column| column.header().to_string())
                .collect::<Vec<_>>();
            warn!(source, columns = ?columns, "catalog rejected");
            return Err(LoadError::MissingColumns {
                columns,
                report: Box::new(report.unwrap_or_else(|| validate(&raw))),
            });
        }

        if raw.rows.is_empty() {
            return Err(LoadError::EmptySource(source.to_string()));
        }

        if let Some(report) = &report {
            for error in &report.errors {
                warn!(source, %error, "catalog validation error");
            }
        }

        let dataset = clean(&raw);
        let summary = LoadSummary {
            source: source.to_string(),
            rows: dataset.len(),
            columns: raw.columns.len(),
            load_time_ms: round2(started.elapsed().as_secs_f64() * 1000.0),
            loaded_at: self.clock.now(),
            validation: report,
        };

        let snapshot = Arc::new(CatalogSnapshot::new(dataset, Some(summary.clone())));
        let duplicate_ids = snapshot.index.stats(&snapshot.dataset).duplicate_ids;
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;

        info!(
            source,
            rows = summary.rows,
            duplicate_ids,
            elapsed_ms = summary.load_time_ms,
            quality_score = summary.validation.as_ref().map(|report| report.quality_score),
            "catalog loaded"
        );

        Ok(summary)
    }

    pub fn search(&self, query: &str, filters: &SearchFilters, max_results: usize) -> SearchOutcome {
        let started = Instant::now();
        let snapshot = self.snapshot();
        let key = query_key(&snapshot.fingerprint, query, filters);

        if let Some(results) = self.cache.get(&key) {
            self.analytics().count_search(true);
            debug!(query, results = results.len(), "search cache hit");
            let stats = SearchStats {
                elapsed_ms: 0.0,
                total_results: results.len(),
                cache_hit: true,
                method: SearchMethod::Cache,
                normalized_query: normalize(query),
                message: empty_message(query, &results),
            };
            return SearchOutcome { results, stats };
        }

        self.analytics().count_search(false);
        let terms = QueryTerms::new(query);
        if terms.normalized.is_empty() {
            return SearchOutcome {
                results: Vec::new(),
                stats: SearchStats {
                    elapsed_ms: elapsed_ms(started),
                    total_results: 0,
                    cache_hit: false,
                    method: SearchMethod::Rejected,
                    normalized_query: String::new(),
                    message: Some("query is empty after normalization".to_string()),
                },
            };
        }

        let (results, method) = match exact_id_match(&snapshot, &terms.normalized) {
            Some(found) => (vec![found], SearchMethod::ExactId),
            None => (
                rank(snapshot.dataset.iter(), self.config.text_threshold, |record| {
                    relevance(&terms, record)
                }),
                SearchMethod::Text,
            ),
        };
        debug!(query, %method, candidates = results.len(), "search scored");

        let mut results = apply_filters(results, filters);
        results.truncate(max_results);
        self.cache.set(key, results.clone());

        self.finish(query, terms.normalized, results, method, started)
    }

    /// Brand/model only variant. Not cached.
    pub fn quick_search(&self, query: &str, max_results: usize) -> SearchOutcome {
        let started = Instant::now();
        self.analytics().count_search(false);

        let terms = QueryTerms::new(query);
        if terms.normalized.is_empty() {
            return SearchOutcome {
                results: Vec::new(),
                stats: SearchStats {
                    elapsed_ms: elapsed_ms(started),
                    total_results: 0,
                    cache_hit: false,
                    method: SearchMethod::Rejected,
                    normalized_query: String::new(),
                    message: Some("query is empty after normalization".to_string()),
                },
            };
        }

        let snapshot = self.snapshot();
        let mut results = rank(
            snapshot.dataset.iter(),
            self.config.brand_model_threshold,
            |record| brand_model_relevance(&terms, record),
        );
        results.truncate(max_results);

        self.finish(query, terms.normalized, results, SearchMethod::BrandModel, started)
    }

    fn finish(
        &self,
        query: &str,
        normalized_query: String,
        results: Vec<VehicleMatch>,
        method: SearchMethod,
        started: Instant,
    ) -> SearchOutcome {
        self.analytics().record(SearchLogEntry {
            timestamp: self.clock.now(),
            query: query.to_string(),
            results_count: results.len(),
            method,
        });

        let stats = SearchStats {
            elapsed_ms: elapsed_ms(started),
            total_results: results.len(),
            cache_hit: false,
            method,
            normalized_query,
            message: empty_message(query, &results),
        };
        SearchOutcome { results, stats }
    }

    /// Brands first, in catalog order, then the most common abbreviations.
    pub fn suggestions(&self, partial: &str, limit: usize) -> Vec<String> {
        if partial.trim().chars().count() < self.config.suggestion_min_chars {
            return Vec::new();
        }
        let needle = normalize(partial);
        if needle.is_empty() {
            return Vec::new();
        }

        let snapshot = self.snapshot();
        let mut seen = HashSet::new();
        let mut suggestions = Vec::new();

        for record in snapshot.dataset.iter() {
            if normalize(&record.brand).contains(&needle) && seen.insert(record.brand.clone()) {
                suggestions.push(record.brand.clone());
            }
        }

        if suggestions.len() < limit {
            let abbreviations = ranked_counts(
                snapshot
                    .dataset
                    .iter()
                    .filter_map(|record| record.abbreviation.as_deref()),
            );
            for (abbreviation, _) in abbreviations
                .into_iter()
                .take(self.config.popular_abbreviations)
            {
                if normalize(&abbreviation).contains(&needle) && seen.insert(abbreviation.clone()) {
                    suggestions.push(abbreviation);
                }
            }
        }

        suggestions.truncate(limit);
        suggestions
    }

    /// Filters the whole catalog without scoring; every match gets the same score.
    pub fn advanced_search(&self, criteria: &AdvancedCriteria) -> Vec<VehicleMatch> {
        let snapshot = self.snapshot();
        snapshot
            .dataset
            .iter()
            .filter(|record| meets_criteria(record, criteria))
            .take(self.config.advanced_limit)
            .map(|record| VehicleMatch {
                record: record.clone(),
                score: self.config.advanced_score,
            })
            .collect()
    }

    pub fn analytics_summary(&self) -> AnalyticsSummary {
        self.analytics().summary(self.config.recent_searches)
    }

    pub fn statistics(&self) -> CatalogStatistics {
        let snapshot = self.snapshot();
        let dataset = &snapshot.dataset;
        let with_adas = dataset
            .iter()
            .filter(|record| record.has_adas)
            .collect::<Vec<_>>();

        let adas_percentage = if dataset.is_empty() {
            0.0
        } else {
            round2(with_adas.len() as f64 * 100.0 / dataset.len() as f64)
        };

        let kinds = with_adas
            .iter()
            .map(|record| record.calibration_kind.to_string())
            .collect::<Vec<_>>();
        let mut top_brands = ranked_counts(with_adas.iter().map(|record| record.brand.as_str()));
        top_brands.truncate(TOP_ADAS_BRANDS);

        CatalogStatistics {
            adas: AdasStatistics {
                total_vehicles: dataset.len(),
                vehicles_with_adas: with_adas.len(),
                adas_percentage,
                windshield_adas: dataset.iter().filter(|record| record.windshield_adas).count(),
                bumper_adas: dataset.iter().filter(|record| record.bumper_adas).count(),
                calibration_kinds: ranked_counts(kinds.iter().map(String::as_str)),
                top_brands_with_adas: top_brands,
            },
            index: snapshot.index.stats(dataset),
            load: snapshot.summary.clone(),
            analytics: self.analytics_summary(),
            cached_searches: self.cache.len(),
        }
    }

    pub fn is_data_fresh(&self) -> bool {
        let freshness = Duration::hours(self.database.freshness_hours);
        self.snapshot()
            .summary
            .as_ref()
            .is_some_and(|summary| self.clock.now() - summary.loaded_at < freshness)
    }

    pub fn export_json(&self, path: &Path) -> Result<(), ExportError> {
        let snapshot = self.snapshot();
        let document = ExportDocument {
            metadata: ExportMetadata {
                created_at: self.clock.now(),
                total_records: snapshot.dataset.len(),
                source: snapshot.summary.as_ref().map(|summary| summary.source.clone()),
            },
            data: &snapshot.dataset.records,
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&document)?)?;
        info!(path = %path.display(), records = snapshot.dataset.len(), "catalog exported");
        Ok(())
    }

    pub fn benchmark(&self, queries: &[String]) -> BenchmarkReport {
        let filters = SearchFilters::default();
        let samples = queries
            .iter()
            .map(|query| {
                let started = Instant::now();
                let outcome = self.search(query, &filters, self.config.default_max_results);
                BenchmarkSample {
                    query: query.clone(),
                    elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
                    results_count: outcome.stats.total_results,
                    cache_hit: outcome.stats.cache_hit,
                }
            })
            .collect();

        BenchmarkReport::from_samples(samples)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn analytics(&self) -> MutexGuard<'_, SearchAnalytics> {
        self.analytics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn exact_id_match(snapshot: &CatalogSnapshot, normalized: &str) -> Option<VehicleMatch> {
    if !normalized.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let id = normalized.parse::<u64>().ok()?;
    snapshot
        .index
        .by_id(&snapshot.dataset, id)
        .map(|record| VehicleMatch {
            record: record.clone(),
            score: MAX_SCORE,
        })
}

fn empty_message(query: &str, results: &[VehicleMatch]) -> Option<String> {
    results
        .is_empty()
        .then(|| format!("no vehicles matched '{}'", query.trim()))
}

fn elapsed_ms(started: Instant) -> f64 {
    round2(started.elapsed().as_secs_f64() * 1000.0)
}
