use crate::traits::{Clock, ProcedureSource, SystemClock};
use crate::{CalibrationProcedure, DurationRange, FetchError};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const DEFAULT_DURATION: DurationRange = DurationRange {
    min_minutes: 45,
    max_minutes: 90,
};

/// Fetches procedures from an HTTP endpoint:
/// `GET <endpoint>?brand=..&model=..&year=..` answering with JSON.
pub struct HttpProcedureSource {
    client: Client,
    endpoint: Url,
    clock: Arc<dyn Clock>,
}

impl HttpProcedureSource {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            clock: Arc::new(SystemClock),
        })
    }

    fn request_url(&self, brand: &str, model: Option<&str>, year: Option<i32>) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("brand", brand.trim());
            if let Some(model) = model.map(str::trim).filter(|model| !model.is_empty()) {
                query.append_pair("model", model);
            }
            if let Some(year) = year {
                query.append_pair("year", &year.to_string());
            }
        }
        url
    }
}

impl ProcedureSource for HttpProcedureSource {
    fn fetch(
        &self,
        brand: &str,
        model: Option<&str>,
        year: Option<i32>,
    ) -> Result<CalibrationProcedure, FetchError> {
        let url = self.request_url(brand, model, year);
        let response = self.client.get(url).send()?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                endpoint: self.endpoint.to_string(),
                status: response.status().to_string(),
            });
        }

        let payload: ProcedurePayload = response.json()?;
        payload.into_procedure(brand, self.endpoint.as_str(), self.clock.now())
    }
}

/// Source used when no endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

impl ProcedureSource for OfflineSource {
    fn fetch(
        &self,
        _brand: &str,
        _model: Option<&str>,
        _year: Option<i32>,
    ) -> Result<CalibrationProcedure, FetchError> {
        Err(FetchError::Disabled)
    }
}

#[derive(Debug, Deserialize)]
struct ProcedurePayload {
    brand: Option<String>,
    title: Option<String>,
    source: Option<String>,
    #[serde(default)]
    calibration_types: Vec<String>,
    #[serde(default)]
    steps: Vec<String>,
    #[serde(default)]
    requirements: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
    estimated_duration: Option<DurationRange>,
    #[serde(default)]
    equipment: Vec<String>,
    #[serde(default)]
    model_notes: Vec<String>,
}

impl ProcedurePayload {
    fn into_procedure(
        self,
        requested_brand: &str,
        endpoint: &str,
        fetched_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<CalibrationProcedure, FetchError> {
        let steps = self
            .steps
            .into_iter()
            .map(|step| step.trim().to_string())
            .filter(|step| !step.is_empty())
            .collect::<Vec<_>>();

        if steps.is_empty() {
            return Err(FetchError::InvalidPayload(format!(
                "procedure for {} has no steps",
                requested_brand.trim()
            )));
        }

        let brand = self
            .brand
            .filter(|brand| !brand.trim().is_empty())
            .unwrap_or_else(|| requested_brand.trim().to_uppercase());

        Ok(CalibrationProcedure {
            title: self
                .title
                .unwrap_or_else(|| format!("{brand} ADAS calibration")),
            source: self.source.unwrap_or_else(|| endpoint.to_string()),
            brand,
            calibration_types: self.calibration_types,
            steps,
            requirements: self.requirements,
            warnings: self.warnings,
            estimated_duration: self.estimated_duration.unwrap_or(DEFAULT_DURATION),
            equipment: self.equipment,
            model_notes: self.model_notes,
            fetched_at,
        })
    }
}
