use crate::normalizer::normalize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum CalibrationKind {
    Static,
    Dynamic,
    StaticDynamic,
    #[default]
    Unknown,
}

impl CalibrationKind {
    /// Parses the catalog's "Tipo de Regulagem" wording, accents and case ignored.
    pub fn parse(label: &str) -> Self {
        let normalized = normalize(label);
        let is_static = normalized.contains("ESTATIC") || normalized.contains("STATIC");
        let is_dynamic = normalized.contains("DINAMIC") || normalized.contains("DYNAMIC");

        match (is_static, is_dynamic) {
            (true, true) => CalibrationKind::StaticDynamic,
            (true, false) => CalibrationKind::Static,
            (false, true) => CalibrationKind::Dynamic,
            (false, false) => CalibrationKind::Unknown,
        }
    }

    /// Catalog spelling, as it appears in source files.
    pub fn label(&self) -> &'static str {
        match self {
            CalibrationKind::Static => "Estatica",
            CalibrationKind::Dynamic => "Dinamica",
            CalibrationKind::StaticDynamic => "Estatica/Dinamica",
            CalibrationKind::Unknown => "",
        }
    }

    /// Substring match against both the catalog spelling and the English name.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = normalize(needle);
        if needle.is_empty() {
            return true;
        }
        normalize(self.label()).contains(&needle) || normalize(&self.to_string()).contains(&needle)
    }
}

impl fmt::Display for CalibrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CalibrationKind::Static => "Static",
            CalibrationKind::Dynamic => "Dynamic",
            CalibrationKind::StaticDynamic => "Static+Dynamic",
            CalibrationKind::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Feature {
    WindshieldAdas,
    BumperAdas,
    RearCamera,
    MatrixLights,
}

/// One cleaned catalog row. `None` marks a value that was blank or failed coercion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleRecord {
    pub id: Option<u64>,
    pub year: Option<i32>,
    pub brand: String,
    pub model_name: String,
    pub abbreviation: Option<String>,
    pub has_adas: bool,
    pub windshield_adas: bool,
    pub bumper_adas: bool,
    pub rear_camera: bool,
    pub matrix_lights: bool,
    pub calibration_kind: CalibrationKind,
    pub search_text: String,
}

impl VehicleRecord {
    pub fn has_feature(&self, feature: Feature) -> bool {
        match feature {
            Feature::WindshieldAdas => self.windshield_adas,
            Feature::BumperAdas => self.bumper_adas,
            Feature::RearCamera => self.rear_camera,
            Feature::MatrixLights => self.matrix_lights,
        }
    }
}

/// Ordered, cleaned catalog. Replaced wholesale on reload, never edited in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Dataset {
    pub records: Vec<VehicleRecord>,
}

impl Dataset {
    pub fn new(records: Vec<VehicleRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VehicleRecord> {
        self.records.iter()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleMatch {
    pub record: VehicleRecord,
    pub score: f64,
}

/// Post-scoring narrowing applied by `search`. Unset fields do not filter and
/// are left out of the cache key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_adas: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_kind: Option<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.brand.is_none()
            && self.year.is_none()
            && self.has_adas.is_none()
            && self.calibration_kind.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AdvancedCriteria {
    pub brand: Option<String>,
    /// Inclusive on both ends.
    pub year_range: Option<(i32, i32)>,
    pub has_adas: Option<bool>,
    pub calibration_kind: Option<String>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SearchMethod {
    Cache,
    ExactId,
    Text,
    BrandModel,
    Rejected,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Cache => "cache",
            SearchMethod::ExactId => "exact-id",
            SearchMethod::Text => "text",
            SearchMethod::BrandModel => "brand-model",
            SearchMethod::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchStats {
    pub elapsed_ms: f64,
    pub total_results: usize,
    pub cache_hit: bool,
    pub method: SearchMethod,
    pub normalized_query: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchOutcome {
    pub results: Vec<VehicleMatch>,
    pub stats: SearchStats,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DurationRange {
    pub min_minutes: u32,
    pub max_minutes: u32,
}

impl fmt::Display for DurationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} min", self.min_minutes, self.max_minutes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibrationProcedure {
    pub brand: String,
    pub title: String,
    pub source: String,
    pub calibration_types: Vec<String>,
    pub steps: Vec<String>,
    pub requirements: Vec<String>,
    pub warnings: Vec<String>,
    pub estimated_duration: DurationRange,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub model_notes: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}
