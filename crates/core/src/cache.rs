use crate::error::CacheError;
use crate::normalizer::normalize;
use crate::traits::{Clock, SystemClock};
use crate::{SearchFilters, VehicleRecord};
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub timestamp: DateTime<Utc>,
}

/// Key/value store with one TTL for every entry. Expired entries are dropped
/// when they are read, never swept in the background.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    path: Option<PathBuf>,
}

impl<V> TtlCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    pub fn in_memory(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
            path: None,
        }
    }

    /// Opens a file-backed cache. A missing or unreadable file yields an empty cache.
    pub fn persistent(path: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let path = path.into();
        let entries = match load_entries(&path) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(path = %path.display(), %error, "discarding unreadable cache file");
                HashMap::new()
            }
        };

        Self {
            entries: Mutex::new(entries),
            ttl,
            clock,
            path: Some(path),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();

        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => now - entry.timestamp >= self.ttl,
        };

        if expired {
            debug!(key, "cache entry expired");
            entries.remove(key);
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            timestamp: self.clock.now(),
        };

        let mut entries = self.lock();
        entries.insert(key.into(), entry);

        if let Some(path) = &self.path {
            if let Err(error) = save_entries(path, &entries) {
                warn!(path = %path.display(), %error, "cache write failed, keeping entries in memory");
            }
        }
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// True if `key` is stored and not expired. Does not evict.
    pub fn contains_live(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.lock()
            .get(key)
            .is_some_and(|entry| now - entry.timestamp < self.ttl)
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.clear();
        if let Some(path) = &self.path {
            if let Err(error) = save_entries(path, &entries) {
                warn!(path = %path.display(), %error, "cache write failed");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load_entries<V: DeserializeOwned>(
    path: &Path,
) -> Result<HashMap<String, CacheEntry<V>>, CacheError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(error) => return Err(error.into()),
    };

    if raw.trim().is_empty() {
        return Ok(HashMap::new());
    }

    Ok(serde_json::from_str(&raw)?)
}

fn save_entries<V: Serialize>(
    path: &Path,
    entries: &HashMap<String, CacheEntry<V>>,
) -> Result<(), CacheError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let payload = serde_json::to_string_pretty(entries)?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, payload)?;
    fs::rename(&staging, path)?;
    Ok(())
}

/// Digest of the cleaned records. Search keys embed it so cached results
/// never outlive the catalog they were computed from.
pub fn catalog_fingerprint(records: &[VehicleRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        let id = record.id.map(|id| id.to_string()).unwrap_or_default();
        let year = record.year.map(|year| year.to_string()).unwrap_or_default();
        let flags = [
            record.has_adas,
            record.windshield_adas,
            record.bumper_adas,
            record.rear_camera,
            record.matrix_lights,
        ]
        .map(|flag| if flag { '1' } else { '0' })
        .iter()
        .collect::<String>();

        for field in [
            id.as_str(),
            year.as_str(),
            record.brand.as_str(),
            record.model_name.as_str(),
            record.abbreviation.as_deref().unwrap_or_default(),
            flags.as_str(),
            record.calibration_kind.label(),
        ] {
            hasher.update(field.as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update([0x1e]);
    }
    format!("{:x}", hasher.finalize())
}

/// Stable key for a search request against one catalog. Filters serialize
/// with a fixed field order and unset filters are omitted, so equal requests
/// share a key.
pub fn query_key(catalog: &str, query: &str, filters: &SearchFilters) -> String {
    let mut material = format!("{catalog}_{}", normalize(query));
    if !filters.is_empty() {
        let canonical = serde_json::to_value(filters)
            .map(|value| value.to_string())
            .unwrap_or_default();
        material.push('_');
        material.push_str(&canonical);
    }
    digest(&material)
}

pub fn procedure_key(brand: &str, model: Option<&str>, year: Option<i32>) -> String {
    let material = format!(
        "{}_{}_{}",
        brand.trim(),
        model.unwrap_or_default().trim(),
        year.map(|year| year.to_string()).unwrap_or_default()
    )
    .to_uppercase()
    .replace(' ', "_");
    digest(&material)
}

fn digest(material: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ManualClock;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn cache_with_clock() -> (TtlCache<Vec<u32>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (TtlCache::with_clock(Duration::hours(24), clock.clone()), clock)
    }

    #[test]
    fn value_survives_until_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", vec![1, 2, 3]);
        assert_eq!(cache.get("k"), Some(vec![1, 2, 3]));

        clock.advance(Duration::hours(23));
        assert_eq!(cache.get("k"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", vec![1]);

        clock.advance(Duration::hours(24));
        assert!(!cache.contains_live("k"));
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn set_overwrites_and_restamps() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", vec![1]);
        clock.advance(Duration::hours(20));
        cache.set("k", vec![2]);
        clock.advance(Duration::hours(20));
        assert_eq!(cache.get("k"), Some(vec![2]));
    }

    #[test]
    fn persisted_entries_reload_with_timestamps() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("search_cache.json");
        let clock = Arc::new(ManualClock::default());

        let cache: TtlCache<Vec<u32>> =
            TtlCache::persistent(&path, Duration::hours(24), clock.clone());
        cache.set("k", vec![7]);
        assert!(path.exists());

        let reopened: TtlCache<Vec<u32>> =
            TtlCache::persistent(&path, Duration::hours(24), clock.clone());
        assert_eq!(reopened.get("k"), Some(vec![7]));

        clock.advance(Duration::hours(25));
        let expired: TtlCache<Vec<u32>> = TtlCache::persistent(&path, Duration::hours(24), clock);
        assert_eq!(expired.get("k"), None);
        Ok(())
    }

    #[test]
    fn corrupt_or_missing_files_load_empty() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let corrupt = dir.path().join("corrupt.json");
        fs::write(&corrupt, b"{ not json")?;

        let cache: TtlCache<Vec<u32>> =
            TtlCache::persistent(&corrupt, Duration::hours(1), Arc::new(SystemClock));
        assert!(cache.is_empty());

        cache.set("k", vec![1]);
        let repaired: TtlCache<Vec<u32>> =
            TtlCache::persistent(&corrupt, Duration::hours(1), Arc::new(SystemClock));
        assert_eq!(repaired.get("k"), Some(vec![1]));

        let missing: TtlCache<Vec<u32>> = TtlCache::persistent(
            dir.path().join("absent.json"),
            Duration::hours(1),
            Arc::new(SystemClock),
        );
        assert!(missing.is_empty());
        Ok(())
    }

    #[test]
    fn query_key_ignores_case_and_punctuation() {
        let filters = SearchFilters::default();
        assert_eq!(
            query_key("demo", "BMW 118i", &filters),
            query_key("demo", "  bmw-118I ", &filters)
        );
        assert_ne!(
            query_key("demo", "BMW 118i", &filters),
            query_key("demo", "BMW 120i", &filters)
        );
    }

    #[test]
    fn query_key_is_scoped_to_the_catalog() {
        let dataset = crate::cleaner::clean(&crate::ingest::RawDataset::demo());
        let full = catalog_fingerprint(&dataset.records);
        let partial = catalog_fingerprint(&dataset.records[1..]);

        assert_eq!(full, catalog_fingerprint(&dataset.records));
        assert_ne!(full, partial);

        let filters = SearchFilters::default();
        assert_ne!(
            query_key(&full, "92983", &filters),
            query_key(&partial, "92983", &filters)
        );
    }

    #[test]
    fn procedure_key_covers_all_inputs() {
        let base = procedure_key("BMW", Some("118i"), Some(2024));
        assert_eq!(base, procedure_key("bmw", Some("118I"), Some(2024)));
        assert_ne!(base, procedure_key("BMW", Some("118i"), Some(2023)));
        assert_ne!(base, procedure_key("BMW", None, Some(2024)));
    }

    proptest! {
        #[test]
        fn query_key_is_construction_order_independent(
            brand in proptest::option::of("[A-Z]{1,8}"),
            year in proptest::option::of(2000i32..2030),
            has_adas in proptest::option::of(any::<bool>()),
        ) {
            let mut forward = SearchFilters::default();
            forward.brand = brand.clone();
            forward.year = year;
            forward.has_adas = has_adas;

            let mut backward = SearchFilters::default();
            backward.has_adas = has_adas;
            backward.year = year;
            backward.brand = brand;

            prop_assert_eq!(query_key("demo", "polo", &forward), query_key("demo", "polo", &backward));
        }
    }
}
