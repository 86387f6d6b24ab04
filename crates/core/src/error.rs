use crate::validator::ValidationReport;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed catalog source: {0}")]
    Csv(#[from] csv::Error),

    #[error("catalog source has no rows: {0}")]
    EmptySource(String),

    #[error("missing required columns: {}", columns.join(", "))]
    MissingColumns {
        columns: Vec<String>,
        report: Box<ValidationReport>,
    },
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("procedure endpoint {endpoint} returned {status}")]
    Status { endpoint: String, status: String },

    #[error("invalid procedure payload: {0}")]
    InvalidPayload(String),

    #[error("online procedure source is disabled")]
    Disabled,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = LoadError> = std::result::Result<T, E>;
