use crate::resolvers::error::ResolveError;
use crate::sources::error::SourceError;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediatorError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed building the global view: {0}")]
    GlobalView(#[from] PolarsError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {variable} does not hold valid JSON")]
    Json {
        variable: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Environment variable {variable} must be a whole number, got '{value}'")]
    InvalidNumber {
        variable: &'static str,
        value: String,
    },

    #[error("Unknown source name '{0}'")]
    UnknownSource(String),
}
