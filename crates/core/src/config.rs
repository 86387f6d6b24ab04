use std::path::PathBuf;
use url::Url;

/// Options for reading and preparing a catalog source.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub delimiter: u8,
    pub auto_validate: bool,
    /// A loaded catalog counts as fresh for this many hours.
    pub freshness_hours: i64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            delimiter: b';',
            auto_validate: true,
            freshness_hours: 24,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Minimum relevance a record needs on the fuzzy text path.
    pub text_threshold: f64,
    /// Minimum relevance a record needs on the brand/model quick path.
    pub brand_model_threshold: f64,
    pub default_max_results: usize,
    pub advanced_limit: usize,
    pub advanced_score: f64,
    pub analytics_capacity: usize,
    pub recent_searches: usize,
    pub suggestion_min_chars: usize,
    pub popular_abbreviations: usize,
    pub cache_ttl_hours: i64,
    pub cache_path: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            text_threshold: 60.0,
            brand_model_threshold: 70.0,
            default_max_results: 10,
            advanced_limit: 50,
            advanced_score: 95.0,
            analytics_capacity: 50,
            recent_searches: 10,
            suggestion_min_chars: 2,
            popular_abbreviations: 20,
            cache_ttl_hours: 24,
            cache_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub endpoint: Option<Url>,
    pub fetch_timeout_secs: u64,
    pub cache_ttl_hours: i64,
    pub cache_path: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            fetch_timeout_secs: 15,
            cache_ttl_hours: 24,
            cache_path: None,
        }
    }
}
