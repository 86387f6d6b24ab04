use crate::cleaner::{normalize_flag, parse_whole_number};
use crate::ingest::{Column, RawDataset};
use crate::normalizer::is_known_brand;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const MIN_MODEL_YEAR: i64 = 2000;
pub const FIPE_ID_RANGE: (i64, i64) = (1_000, 9_999_999);
const ALLOWED_ADAS_VALUES: [&str; 4] = ["Sim", "Não", "sim", "não"];
const UNKNOWN_BRAND_PREVIEW: usize = 10;
const TOP_BRANDS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ValidationStatistics {
    pub total_columns: usize,
    pub missing_data_percentage: f64,
    pub unique_brands: usize,
    pub vehicles_with_adas: usize,
    pub adas_percentage: f64,
    pub top_brands: Vec<(String, usize)>,
}

/// Outcome of one validation pass. Errors and warnings are advisory; only
/// `validation_passed == false` caused by missing columns stops a load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    pub generated_at: DateTime<Utc>,
    pub total_rows: usize,
    pub validation_passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub quality_score: f64,
    pub statistics: ValidationStatistics,
}

pub fn validate(dataset: &RawDataset) -> ValidationReport {
    validate_for_year(dataset, Utc::now().year())
}

/// Same as [`validate`] with an explicit reference year for the plausibility window.
pub fn validate_for_year(dataset: &RawDataset, current_year: i32) -> ValidationReport {
    let mut report = ValidationReport {
        generated_at: Utc::now(),
        total_rows: dataset.rows.len(),
        validation_passed: true,
        errors: Vec::new(),
        warnings: Vec::new(),
        quality_score: 0.0,
        statistics: ValidationStatistics {
            total_columns: dataset.columns.len(),
            ..ValidationStatistics::default()
        },
    };

    validate_structure(dataset, &mut report);
    validate_integrity(dataset, &mut report);
    validate_domain(dataset, current_year, &mut report);
    report.quality_score = quality_score(&report);

    report
}

fn validate_structure(dataset: &RawDataset, report: &mut ValidationReport) {
    let missing = dataset.missing_required_columns();
    if !missing.is_empty() {
        let names = missing
            .iter()
            .map(|column| column.header())
            .collect::<Vec<_>>()
            .join(", ");
        report
            .errors
            .push(format!("missing required columns: {names}"));
        report.validation_passed = false;
    }

    if dataset.rows.is_empty() {
        report.errors.push("dataset is empty".to_string());
        report.validation_passed = false;
    }
}

fn validate_integrity(dataset: &RawDataset, report: &mut ValidationReport) {
    if dataset.has_column(Column::FipeId) {
        let mut seen = HashSet::new();
        let mut duplicates = 0usize;
        let mut out_of_range = 0usize;

        for raw in dataset.rows.iter().filter_map(|row| row.get(Column::FipeId)) {
            let key = parse_whole_number(raw)
                .map(|id| id.to_string())
                .unwrap_or_else(|| raw.to_string());
            if !seen.insert(key) {
                duplicates += 1;
            }

            let in_range = parse_whole_number(raw)
                .is_some_and(|id| id >= FIPE_ID_RANGE.0 && id <= FIPE_ID_RANGE.1);
            if !in_range {
                out_of_range += 1;
            }
        }

        if duplicates > 0 {
            report
                .warnings
                .push(format!("found {duplicates} duplicated FIPE ids"));
        }
        if out_of_range > 0 {
            report.warnings.push(format!(
                "{out_of_range} FIPE ids are non-numeric or outside {}..={}",
                FIPE_ID_RANGE.0, FIPE_ID_RANGE.1
            ));
        }
    }

    for column in Column::REQUIRED {
        if !dataset.has_column(column) {
            continue;
        }
        let missing = dataset
            .rows
            .iter()
            .filter(|row| row.get(column).is_none())
            .count();
        if missing > 0 {
            report.warnings.push(format!(
                "column '{}': {missing} missing values",
                column.header()
            ));
        }
    }

    let total_cells = dataset.total_cells();
    report.statistics.missing_data_percentage = if total_cells == 0 {
        0.0
    } else {
        round2(dataset.blank_cells() as f64 * 100.0 / total_cells as f64)
    };
}

fn validate_domain(dataset: &RawDataset, current_year: i32, report: &mut ValidationReport) {
    if dataset.has_column(Column::BrandName) {
        let mut seen = HashSet::new();
        let unknown = dataset
            .rows
            .iter()
            .filter_map(|row| row.get(Column::BrandName))
            .filter(|brand| seen.insert(brand.to_string()))
            .filter(|brand| !is_known_brand(brand))
            .collect::<Vec<_>>();

        if !unknown.is_empty() {
            let preview = unknown
                .iter()
                .take(UNKNOWN_BRAND_PREVIEW)
                .copied()
                .collect::<Vec<_>>()
                .join(", ");
            let hidden = unknown.len().saturating_sub(UNKNOWN_BRAND_PREVIEW);
            let suffix = if hidden > 0 {
                format!(" (+{hidden} more)")
            } else {
                String::new()
            };
            report
                .warnings
                .push(format!("unrecognised brands: {preview}{suffix}"));
        }

        report.statistics.unique_brands = seen.len();
        report.statistics.top_brands = ranked_counts(
            dataset
                .rows
                .iter()
                .filter_map(|row| row.get(Column::BrandName)),
        )
        .into_iter()
        .take(TOP_BRANDS)
        .collect();
    }

    if dataset.has_column(Column::ModelYear) {
        let latest = i64::from(current_year) + 2;
        let years = dataset
            .rows
            .iter()
            .filter_map(|row| row.get(Column::ModelYear))
            .collect::<Vec<_>>();

        let unparsable = years
            .iter()
            .filter(|raw| parse_whole_number(raw).is_none())
            .count();
        let parsed = years
            .iter()
            .filter_map(|raw| parse_whole_number(raw))
            .collect::<Vec<_>>();
        let future = parsed.iter().filter(|year| **year > latest).count();
        let old = parsed.iter().filter(|year| **year < MIN_MODEL_YEAR).count();

        if future > 0 {
            report
                .warnings
                .push(format!("found {future} vehicles with model year after {latest}"));
        }
        if old > 0 {
            report.warnings.push(format!(
                "found {old} vehicles with model year before {MIN_MODEL_YEAR}"
            ));
        }
        if unparsable > 0 {
            report
                .warnings
                .push(format!("found {unparsable} non-numeric model years"));
        }
    }

    if dataset.has_column(Column::Adas) {
        let invalid = dataset
            .rows
            .iter()
            .filter_map(|row| row.get(Column::Adas))
            .filter(|value| !ALLOWED_ADAS_VALUES.contains(value))
            .count();
        if invalid > 0 {
            report
                .errors
                .push(format!("found {invalid} invalid values in column ADAS"));
        }

        let with_adas = dataset
            .rows
            .iter()
            .filter(|row| row.get(Column::Adas).and_then(normalize_flag) == Some("Sim"))
            .count();
        report.statistics.vehicles_with_adas = with_adas;
        report.statistics.adas_percentage = if dataset.rows.is_empty() {
            0.0
        } else {
            round2(with_adas as f64 * 100.0 / dataset.rows.len() as f64)
        };
    }
}

fn quality_score(report: &ValidationReport) -> f64 {
    let score = 100.0
        - report.errors.len() as f64 * 20.0
        - report.warnings.len() as f64 * 5.0
        - report.statistics.missing_data_percentage * 2.0;
    score.clamp(0.0, 100.0)
}

/// Occurrence counts, most frequent first; ties keep first-seen order.
pub(crate) fn ranked_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut order = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        let count = counts.entry(value).or_insert(0);
        if *count == 0 {
            order.push(value);
        }
        *count += 1;
    }

    let mut ranked = order
        .into_iter()
        .map(|value| (value.to_string(), counts.get(value).copied().unwrap_or_default()))
        .collect::<Vec<_>>();
    ranked.sort_by(|left, right| right.1.cmp(&left.1));
    ranked
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
