use thiserror::Error;

/// Errors from reading or validating view configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid colour '{0}': expected #rrggbb")]
    InvalidColor(String),

    #[error("smoothing window must be at least 1")]
    InvalidWindow,

    #[error("unknown granularity '{0}': expected day, week or month")]
    InvalidGranularity(String),

    #[error("reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing config file: {0}")]
    Json(#[from] serde_json::Error),
}
