//! Relevance scoring for the free-text and brand/model search paths.

use crate::fuzzy::{partial_ratio, ratio};
use crate::normalizer::{extract_brands, extract_numbers, normalize};
use crate::validator::round2;
use crate::{AdvancedCriteria, SearchFilters, VehicleMatch, VehicleRecord};

pub const MAX_SCORE: f64 = 100.0;

const BRAND_IN_QUERY: f64 = 50.0;
const EXTRACTED_BRAND: f64 = 40.0;
const MODEL_WEIGHT: f64 = 0.6;
const ABBREVIATION_WEIGHT: f64 = 0.4;
const YEAR_NUMBER: f64 = 30.0;
const ID_NUMBER: f64 = 25.0;
const ID_NUMBER_MIN_DIGITS: usize = 3;
const ADAS_BONUS: f64 = 10.0;
const COMBINED_WEIGHT: f64 = 0.3;

/// A query broken down once so every record can be scored against it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTerms {
    pub raw_upper: String,
    pub normalized: String,
    pub numbers: Vec<String>,
    pub brands: Vec<&'static str>,
}

impl QueryTerms {
    pub fn new(query: &str) -> Self {
        let normalized = normalize(query);
        Self {
            raw_upper: query.trim().to_uppercase(),
            numbers: extract_numbers(&normalized),
            brands: extract_brands(&normalized),
            normalized,
        }
    }
}

/// Uncapped weighted total. Several records can pass 100, so ranking orders
/// on this value and only the reported score is capped.
pub fn relevance(terms: &QueryTerms, record: &VehicleRecord) -> f64 {
    let mut score = 0.0;

    if !record.brand.is_empty() && terms.raw_upper.contains(&record.brand) {
        score += BRAND_IN_QUERY;
    }

    score += terms
        .brands
        .iter()
        .filter(|brand| record.brand.contains(*brand))
        .count() as f64
        * EXTRACTED_BRAND;

    score += partial_ratio(&terms.normalized, &normalize(&record.model_name)) * MODEL_WEIGHT;

    if let Some(abbreviation) = &record.abbreviation {
        score += ratio(&terms.normalized, &normalize(abbreviation)) * ABBREVIATION_WEIGHT;
    }

    if let Some(year) = record.year {
        let year = year.to_string();
        score += terms
            .numbers
            .iter()
            .filter(|number| year.contains(number.as_str()))
            .count() as f64
            * YEAR_NUMBER;
    }

    if let Some(id) = record.id {
        let id = id.to_string();
        score += terms
            .numbers
            .iter()
            .filter(|number| number.len() >= ID_NUMBER_MIN_DIGITS && id.contains(number.as_str()))
            .count() as f64
            * ID_NUMBER;
    }

    if record.has_adas {
        score += ADAS_BONUS;
    }

    score += partial_ratio(&terms.normalized, &record.search_text) * COMBINED_WEIGHT;

    score
}

/// Cheaper score that only looks at brand and model text.
pub fn brand_model_relevance(terms: &QueryTerms, record: &VehicleRecord) -> f64 {
    let target = normalize(&format!("{} {}", record.brand, record.model_name));
    partial_ratio(&terms.normalized, &target).min(MAX_SCORE)
}

/// Scores every record and keeps those strictly above `threshold`,
/// best first. Equal scores keep catalog order. Matches carry the score
/// capped at [`MAX_SCORE`].
pub fn rank<'a, F>(
    records: impl Iterator<Item = &'a VehicleRecord>,
    threshold: f64,
    score: F,
) -> Vec<VehicleMatch>
where
    F: Fn(&VehicleRecord) -> f64,
{
    let mut scored = records
        .filter_map(|record| {
            let value = score(record);
            (value > threshold).then_some((value, record))
        })
        .collect::<Vec<_>>();

    scored.sort_by(|left, right| right.0.total_cmp(&left.0));
    scored
        .into_iter()
        .map(|(value, record)| VehicleMatch {
            record: record.clone(),
            score: round2(value.min(MAX_SCORE)),
        })
        .collect()
}

pub fn passes_filters(record: &VehicleRecord, filters: &SearchFilters) -> bool {
    if let Some(brand) = &filters.brand {
        if !record.brand.to_uppercase().contains(&brand.trim().to_uppercase()) {
            return false;
        }
    }

    if let Some(year) = filters.year {
        if record.year != Some(year) {
            return false;
        }
    }

    if let Some(has_adas) = filters.has_adas {
        if record.has_adas != has_adas {
            return false;
        }
    }

    if let Some(kind) = &filters.calibration_kind {
        if !record.calibration_kind.matches(kind) {
            return false;
        }
    }

    true
}

pub fn apply_filters(matches: Vec<VehicleMatch>, filters: &SearchFilters) -> Vec<VehicleMatch> {
    if filters.is_empty() {
        return matches;
    }

    matches
        .into_iter()
        .filter(|found| passes_filters(&found.record, filters))
        .collect()
}

pub fn meets_criteria(record: &VehicleRecord, criteria: &AdvancedCriteria) -> bool {
    if let Some(brand) = &criteria.brand {
        if !record.brand.to_uppercase().contains(&brand.trim().to_uppercase()) {
            return false;
        }
    }

    if let Some((from, to)) = criteria.year_range {
        match record.year {
            Some(year) if year >= from && year <= to => {}
            _ => return false,
        }
    }

    if let Some(has_adas) = criteria.has_adas {
        if record.has_adas != has_adas {
            return false;
        }
    }

    if let Some(kind) = &criteria.calibration_kind {
        if !record.calibration_kind.matches(kind) {
            return false;
        }
    }

    criteria
        .features
        .iter()
        .all(|feature| record.has_feature(*feature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::clean;
    use crate::ingest::RawDataset;
    use crate::{Dataset, Feature};

    fn demo() -> Dataset {
        clean(&RawDataset::demo())
    }

    #[test]
    fn brand_and_model_query_ranks_the_named_vehicle_first() {
        let dataset = demo();
        let terms = QueryTerms::new("BMW 118i");
        let ranked = rank(dataset.iter(), 60.0, |record| relevance(&terms, record));

        assert!(!ranked.is_empty());
        assert_eq!(ranked[0].record.id, Some(92983));
        assert_eq!(ranked[0].score, MAX_SCORE);
    }

    #[test]
    fn reported_scores_stay_within_bounds() {
        let dataset = demo();
        for query in ["BMW 118i 2024 92983", "", "volvo xc60 t5 momentum awd", "zzzz"] {
            let terms = QueryTerms::new(query);
            for found in rank(dataset.iter(), -1.0, |record| relevance(&terms, record)) {
                assert!((0.0..=MAX_SCORE).contains(&found.score), "{query}: {}", found.score);
            }
        }
    }

    #[test]
    fn capped_ties_still_rank_by_full_score() {
        let dataset = demo();
        let ranked = rank(dataset.iter().take(3), 0.0, |record| match record.id {
            Some(87621) => 180.0,
            Some(_) => 120.0,
            None => 0.0,
        });

        assert_eq!(ranked[0].record.id, Some(87621));
        assert!(ranked.iter().all(|found| found.score == MAX_SCORE));
    }

    #[test]
    fn empty_brand_earns_no_brand_bonus() {
        let mut record = demo().records[0].clone();
        record.brand.clear();
        record.has_adas = false;
        record.abbreviation = None;
        record.search_text = String::new();
        record.model_name = String::from("Q");

        let terms = QueryTerms::new("anything");
        assert_eq!(relevance(&terms, &record), 0.0);
    }

    #[test]
    fn numbers_match_year_and_long_id_fragments() {
        let dataset = demo();
        let bmw = &dataset.records[0];

        let with_year = relevance(&QueryTerms::new("zz 2024"), bmw);
        let with_id = relevance(&QueryTerms::new("zz 929"), bmw);
        let short_number = relevance(&QueryTerms::new("zz 92"), bmw);

        assert!(with_year >= YEAR_NUMBER);
        assert!(with_id >= ID_NUMBER);
        assert!(short_number < with_id);
    }

    #[test]
    fn ranking_is_stable_for_equal_scores() {
        let dataset = demo();
        let ranked = rank(dataset.iter(), -1.0, |_| 42.0);
        let ids = ranked.iter().map(|found| found.record.id).collect::<Vec<_>>();
        let expected = dataset.iter().map(|record| record.id).collect::<Vec<_>>();
        assert_eq!(ids, expected);
    }

    #[test]
    fn threshold_is_exclusive() {
        let dataset = demo();
        assert!(rank(dataset.iter(), 42.0, |_| 42.0).is_empty());
    }

    #[test]
    fn filters_narrow_on_every_field() {
        let dataset = demo();
        let everything = rank(dataset.iter(), -1.0, |_| 1.0);

        let filters = SearchFilters {
            brand: Some("volks".to_string()),
            ..SearchFilters::default()
        };
        let volkswagen = apply_filters(everything.clone(), &filters);
        assert_eq!(volkswagen.len(), 1);
        assert_eq!(volkswagen[0].record.id, Some(95432));

        let filters = SearchFilters {
            year: Some(2025),
            calibration_kind: Some("Dinamica".to_string()),
            ..SearchFilters::default()
        };
        let ids = apply_filters(everything, &filters)
            .iter()
            .filter_map(|found| found.record.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![73291, 88901]);
    }

    #[test]
    fn criteria_require_every_feature() {
        let dataset = demo();
        let criteria = AdvancedCriteria {
            year_range: Some((2024, 2025)),
            features: vec![Feature::RearCamera, Feature::MatrixLights],
            ..AdvancedCriteria::default()
        };

        let ids = dataset
            .iter()
            .filter(|record| meets_criteria(record, &criteria))
            .filter_map(|record| record.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![87621, 91234, 92345]);
    }

    #[test]
    fn brand_model_path_ignores_numbers_elsewhere() {
        let dataset = demo();
        let terms = QueryTerms::new("polo tsi");
        let ranked = rank(dataset.iter(), 70.0, |record| brand_model_relevance(&terms, record));
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].record.id, Some(95432));
    }
}
