use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("API error: {status} {reason}")]
    Api { status: u16, reason: String },

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Analytics dashboard container not found: {0}")]
    MissingContainer(String),

    #[error("No data available")]
    NoData,

    #[error("Unknown time range: {0}")]
    InvalidTimeRange(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
