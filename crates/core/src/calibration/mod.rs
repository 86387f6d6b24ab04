pub mod knowledge;
pub mod online;

use crate::cache::{procedure_key, TtlCache};
use crate::config::CatalogConfig;
use crate::normalizer::normalize;
use crate::traits::{Clock, ProcedureSource, SystemClock};
use crate::{CalibrationKind, CalibrationProcedure};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use knowledge::offline_procedure;
pub use online::{HttpProcedureSource, OfflineSource};

pub const STATIC_KEYWORDS: [&str; 5] = ["target", "posicion", "superficie", "estatica", "nivel"];
pub const DYNAMIC_KEYWORDS: [&str; 5] = ["test drive", "pista", "velocidade", "dinamica", "conducao"];

/// A procedure narrowed to the steps relevant for one calibration kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibrationGuide {
    pub procedure: CalibrationProcedure,
    pub focus: CalibrationKind,
    /// Empty when nothing matched or no single kind was requested.
    pub focused_steps: Vec<String>,
}

impl CalibrationGuide {
    pub fn steps(&self) -> &[String] {
        if self.focused_steps.is_empty() {
            &self.procedure.steps
        } else {
            &self.focused_steps
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TroubleshootingIssue {
    pub problem: String,
    pub solutions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TroubleshootingGuide {
    pub brand: String,
    pub error_code: Option<String>,
    pub common_issues: Vec<TroubleshootingIssue>,
}

const COMMON_ISSUES: [(&str, [&str; 3]); 2] = [
    (
        "Calibração não inicia",
        [
            "Verificar conexão OBD",
            "Limpar códigos de defeito",
            "Verificar tensão da bateria",
        ],
    ),
    (
        "Erro durante processo",
        [
            "Reposicionar targets",
            "Verificar iluminação ambiente",
            "Confirmar nivelamento do veículo",
        ],
    ),
];

/// Calibration procedures by brand, model and year: cached, fetched online
/// when possible, otherwise served from the built-in knowledge base.
pub struct CalibrationCatalog {
    source: Box<dyn ProcedureSource>,
    cache: TtlCache<CalibrationProcedure>,
    clock: Arc<dyn Clock>,
}

impl Default for CalibrationCatalog {
    fn default() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_source(
            Box::new(OfflineSource),
            TtlCache::with_clock(Duration::hours(24), clock.clone()),
            clock,
        )
    }
}

impl CalibrationCatalog {
    /// Builds the HTTP source when an endpoint is configured. A client that
    /// cannot be built leaves the catalog offline.
    pub fn from_config(config: &CatalogConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ttl = Duration::hours(config.cache_ttl_hours);
        let cache = match &config.cache_path {
            Some(path) => TtlCache::persistent(path.clone(), ttl, clock.clone()),
            None => TtlCache::with_clock(ttl, clock.clone()),
        };

        let source: Box<dyn ProcedureSource> = match &config.endpoint {
            Some(endpoint) => {
                let timeout = std::time::Duration::from_secs(config.fetch_timeout_secs);
                match HttpProcedureSource::new(endpoint.clone(), timeout) {
                    Ok(source) => Box::new(source),
                    Err(error) => {
                        warn!(%endpoint, %error, "procedure endpoint unusable, staying offline");
                        Box::new(OfflineSource)
                    }
                }
            }
            None => Box::new(OfflineSource),
        };

        Self::with_source(source, cache, clock)
    }

    pub fn with_source(
        source: Box<dyn ProcedureSource>,
        cache: TtlCache<CalibrationProcedure>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            cache,
            clock,
        }
    }

    pub fn get_procedure(
        &self,
        brand: &str,
        model: Option<&str>,
        year: Option<i32>,
    ) -> CalibrationProcedure {
        let key = procedure_key(brand, model, year);
        if let Some(procedure) = self.cache.get(&key) {
            debug!(brand, "procedure cache hit");
            return procedure;
        }

        let procedure = match self.source.fetch(brand, model, year) {
            Ok(procedure) => {
                info!(brand, source = %procedure.source, "procedure fetched online");
                procedure
            }
            Err(error) => {
                if !matches!(error, crate::FetchError::Disabled) {
                    warn!(brand, %error, "online procedure fetch failed, using knowledge base");
                }
                offline_procedure(brand, model, year, self.clock.now())
            }
        };

        self.cache.set(key, procedure.clone());
        procedure
    }

    pub fn step_by_step(
        &self,
        brand: &str,
        model: Option<&str>,
        year: Option<i32>,
        kind: CalibrationKind,
    ) -> CalibrationGuide {
        let procedure = self.get_procedure(brand, model, year);
        let keywords: &[&str] = match kind {
            CalibrationKind::Static => &STATIC_KEYWORDS,
            CalibrationKind::Dynamic => &DYNAMIC_KEYWORDS,
            CalibrationKind::StaticDynamic | CalibrationKind::Unknown => &[],
        };

        let keywords = keywords
            .iter()
            .map(|keyword| normalize(keyword))
            .collect::<Vec<_>>();
        let focused_steps = procedure
            .steps
            .iter()
            .filter(|step| {
                let step = normalize(step);
                keywords.iter().any(|keyword| step.contains(keyword.as_str()))
            })
            .cloned()
            .collect();

        CalibrationGuide {
            procedure,
            focus: kind,
            focused_steps,
        }
    }

    pub fn troubleshooting(&self, brand: &str, error_code: Option<&str>) -> TroubleshootingGuide {
        TroubleshootingGuide {
            brand: brand.trim().to_uppercase(),
            error_code: error_code
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string),
            common_issues: COMMON_ISSUES
                .iter()
                .map(|(problem, solutions)| TroubleshootingIssue {
                    problem: problem.to_string(),
                    solutions: solutions.iter().map(|solution| solution.to_string()).collect(),
                })
                .collect(),
        }
    }

    pub fn cached_procedures(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ManualClock;
    use crate::{DurationRange, FetchError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct FailingSource {
        calls: Arc<AtomicUsize>,
    }

    impl ProcedureSource for FailingSource {
        fn fetch(
            &self,
            _brand: &str,
            _model: Option<&str>,
            _year: Option<i32>,
        ) -> Result<CalibrationProcedure, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::InvalidPayload("timed out".to_string()))
        }
    }

    struct FixedSource;

    impl ProcedureSource for FixedSource {
        fn fetch(
            &self,
            brand: &str,
            _model: Option<&str>,
            _year: Option<i32>,
        ) -> Result<CalibrationProcedure, FetchError> {
            Ok(CalibrationProcedure {
                brand: brand.to_string(),
                title: "remote".to_string(),
                source: "remote".to_string(),
                calibration_types: Vec::new(),
                steps: vec!["Passo remoto".to_string()],
                requirements: Vec::new(),
                warnings: Vec::new(),
                estimated_duration: DurationRange {
                    min_minutes: 10,
                    max_minutes: 20,
                },
                equipment: Vec::new(),
                model_notes: Vec::new(),
                fetched_at: chrono::Utc::now(),
            })
        }
    }

    fn failing_catalog() -> (CalibrationCatalog, Arc<AtomicUsize>, Arc<ManualClock>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let clock = Arc::new(ManualClock::default());
        let catalog = CalibrationCatalog::with_source(
            Box::new(FailingSource {
                calls: calls.clone(),
            }),
            TtlCache::with_clock(Duration::hours(24), clock.clone()),
            clock.clone(),
        );
        (catalog, calls, clock)
    }

    #[test]
    fn failed_fetch_falls_back_and_is_cached() {
        let (catalog, calls, clock) = failing_catalog();

        let first = catalog.get_procedure("BMW", Some("X1 sDrive20i"), Some(2019));
        assert_eq!(first.source, knowledge::KNOWLEDGE_BASE_SOURCE);
        assert_eq!(
            first.model_notes.last().map(String::as_str),
            Some("Primeira geração ADAS BMW - procedimentos simplificados")
        );

        let second = catalog.get_procedure("bmw", Some("x1 sdrive20i"), Some(2019));
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::hours(24));
        catalog.get_procedure("BMW", Some("X1 sDrive20i"), Some(2019));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn online_result_is_used_when_available() {
        let catalog = CalibrationCatalog::with_source(
            Box::new(FixedSource),
            TtlCache::in_memory(Duration::hours(1)),
            Arc::new(SystemClock),
        );
        let procedure = catalog.get_procedure("AUDI", None, None);
        assert_eq!(procedure.source, "remote");
        assert_eq!(catalog.cached_procedures(), 1);
    }

    #[test]
    fn static_guide_keeps_positioning_steps() {
        let catalog = CalibrationCatalog::default();
        let guide = catalog.step_by_step("VOLKSWAGEN", Some("Polo"), None, CalibrationKind::Static);

        assert_eq!(
            guide.focused_steps,
            vec![
                "Posicionar veículo conforme especificações VW".to_string(),
                "Instalar targets de calibração específicos VW/Audi".to_string(),
            ]
        );
        assert_eq!(guide.steps().len(), 2);
    }

    #[test]
    fn dynamic_guide_matches_accented_steps() {
        let catalog = CalibrationCatalog::default();
        let guide = catalog.step_by_step("BMW", None, None, CalibrationKind::Dynamic);

        assert_eq!(
            guide.focused_steps,
            vec![
                "Escolher tipo de calibração (Estática/Dinâmica)".to_string(),
                "Realizar test drive para validação (se dinâmica)".to_string(),
            ]
        );
    }

    #[test]
    fn guide_keeps_year_bracket_notes() {
        let catalog = CalibrationCatalog::default();
        let guide = catalog.step_by_step("BMW", Some("X1"), Some(2024), CalibrationKind::Dynamic);

        assert_eq!(
            guide.procedure.model_notes.last().map(String::as_str),
            Some("Sistemas ADAS de última geração - calibração mais sensível")
        );
    }

    #[test]
    fn unfocused_guide_falls_back_to_every_step() {
        let catalog = CalibrationCatalog::default();
        let guide = catalog.step_by_step("FIAT", None, None, CalibrationKind::Unknown);
        assert!(guide.focused_steps.is_empty());
        assert_eq!(guide.steps().len(), 7);
    }

    #[test]
    fn procedures_persist_across_catalogs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config = CatalogConfig {
            cache_path: Some(dir.path().join("procedure_cache.json")),
            ..CatalogConfig::default()
        };

        let first = CalibrationCatalog::from_config(&config);
        let procedure = first.get_procedure("VOLVO", Some("XC60"), Some(2024));

        let second = CalibrationCatalog::from_config(&config);
        assert_eq!(second.cached_procedures(), 1);
        assert_eq!(second.get_procedure("VOLVO", Some("XC60"), Some(2024)), procedure);
        Ok(())
    }

    #[test]
    fn troubleshooting_lists_common_issues() {
        let guide = CalibrationCatalog::default().troubleshooting("jeep", Some(" "));
        assert_eq!(guide.brand, "JEEP");
        assert_eq!(guide.error_code, None);
        assert_eq!(guide.common_issues.len(), 2);
        assert_eq!(guide.common_issues[1].solutions[0], "Reposicionar targets");
    }
}
