use crate::validator::round2;
use crate::SearchMethod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchLogEntry {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub results_count: usize,
    pub method: SearchMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsSummary {
    pub total_searches: u64,
    pub cache_hits: u64,
    pub cache_hit_rate: f64,
    pub recent_searches: Vec<SearchLogEntry>,
}

/// Usage counters plus a newest-first log capped at `capacity` entries.
#[derive(Debug, Clone)]
pub struct SearchAnalytics {
    total_searches: u64,
    cache_hits: u64,
    log: VecDeque<SearchLogEntry>,
    capacity: usize,
}

impl SearchAnalytics {
    pub fn new(capacity: usize) -> Self {
        Self {
            total_searches: 0,
            cache_hits: 0,
            log: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn count_search(&mut self, cache_hit: bool) {
        self.total_searches += 1;
        if cache_hit {
            self.cache_hits += 1;
        }
    }

    pub fn record(&mut self, entry: SearchLogEntry) {
        self.log.push_front(entry);
        self.log.truncate(self.capacity);
    }

    pub fn log(&self) -> impl Iterator<Item = &SearchLogEntry> {
        self.log.iter()
    }

    pub fn summary(&self, recent: usize) -> AnalyticsSummary {
        let rate = if self.total_searches == 0 {
            0.0
        } else {
            self.cache_hits as f64 * 100.0 / self.total_searches as f64
        };

        AnalyticsSummary {
            total_searches: self.total_searches,
            cache_hits: self.cache_hits,
            cache_hit_rate: round2(rate),
            recent_searches: self.log.iter().take(recent).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkSample {
    pub query: String,
    pub elapsed_ms: f64,
    pub results_count: usize,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkReport {
    pub total_queries: usize,
    pub total_ms: f64,
    pub average_ms: f64,
    pub fastest_ms: Option<f64>,
    pub slowest_ms: Option<f64>,
    pub samples: Vec<BenchmarkSample>,
}

impl BenchmarkReport {
    pub fn from_samples(samples: Vec<BenchmarkSample>) -> Self {
        let total_ms = samples.iter().map(|sample| sample.elapsed_ms).sum::<f64>();
        let average_ms = if samples.is_empty() {
            0.0
        } else {
            total_ms / samples.len() as f64
        };
        let fastest_ms = samples
            .iter()
            .map(|sample| sample.elapsed_ms)
            .min_by(f64::total_cmp);
        let slowest_ms = samples
            .iter()
            .map(|sample| sample.elapsed_ms)
            .max_by(f64::total_cmp);

        Self {
            total_queries: samples.len(),
            total_ms,
            average_ms,
            fastest_ms,
            slowest_ms,
            samples,
        }
    }

    pub fn cache_hit_rate(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let hits = self.samples.iter().filter(|sample| sample.cache_hit).count();
        hits as f64 * 100.0 / self.samples.len() as f64
    }

    pub fn optimization_hints(&self) -> Vec<String> {
        if self.samples.is_empty() {
            return vec!["run a benchmark first to collect timings".to_string()];
        }

        let mut hints = Vec::new();
        if self.average_ms > 500.0 {
            hints.push(format!(
                "average search time {:.1} ms is high; review the text scoring path",
                self.average_ms
            ));
        }
        if self.cache_hit_rate() < 30.0 {
            hints.push(format!(
                "cache hit rate {:.1}% is low; consider a longer cache ttl",
                self.cache_hit_rate()
            ));
        }

        let slow = self
            .samples
            .iter()
            .filter(|sample| sample.elapsed_ms > self.average_ms * 2.0)
            .count();
        if slow > 0 {
            hints.push(format!("{slow} queries took more than twice the average"));
        }

        hints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(query: &str) -> SearchLogEntry {
        SearchLogEntry {
            timestamp: Utc::now(),
            query: query.to_string(),
            results_count: 1,
            method: SearchMethod::Text,
        }
    }

    #[test]
    fn log_keeps_newest_entries_only() {
        let mut analytics = SearchAnalytics::new(3);
        for query in ["a", "b", "c", "d", "e"] {
            analytics.record(entry(query));
        }

        let queries = analytics.log().map(|entry| entry.query.as_str()).collect::<Vec<_>>();
        assert_eq!(queries, vec!["e", "d", "c"]);
        assert_eq!(analytics.summary(2).recent_searches.len(), 2);
    }

    #[test]
    fn hit_rate_is_a_percentage() {
        let mut analytics = SearchAnalytics::new(10);
        analytics.count_search(false);
        analytics.count_search(true);
        analytics.count_search(false);

        let summary = analytics.summary(10);
        assert_eq!(summary.total_searches, 3);
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.cache_hit_rate, 33.33);
    }

    #[test]
    fn benchmark_flags_slow_queries_and_cold_cache() {
        let samples = ["a", "b", "c", "d"]
            .iter()
            .zip([10.0, 10.0, 10.0, 90.0])
            .map(|(query, elapsed_ms)| BenchmarkSample {
                query: query.to_string(),
                elapsed_ms,
                results_count: 0,
                cache_hit: false,
            })
            .collect();

        let report = BenchmarkReport::from_samples(samples);
        assert_eq!(report.average_ms, 30.0);
        assert_eq!(report.fastest_ms, Some(10.0));
        assert_eq!(report.slowest_ms, Some(90.0));

        let hints = report.optimization_hints();
        assert_eq!(hints.len(), 2);
        assert!(hints[1].starts_with("1 queries"));
    }
}
