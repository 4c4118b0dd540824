use crate::types::source_kind::SourceKind;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a source could not be turned into a table.
///
/// The loader never lets these escape: a failed source is logged and replaced
/// by an empty [`crate::SourceTable`].
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Failed to read local source '{0}'")]
    LocalRead(PathBuf, #[source] std::io::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server returned an HTML page instead of a table for {0}")]
    HtmlResponse(String),

    #[error("No encoding/delimiter combination produced more than one column for {0}")]
    Undecodable(SourceKind),

    #[error("Station listing ('var estaciones = ...;') not found in page")]
    MissingStationListing,

    #[error("Station listing has no 'estaciones' array")]
    MissingStationArray,

    #[error("Failed to parse station listing JSON")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to normalize table for {kind}")]
    Frame {
        kind: SourceKind,
        #[source]
        source: PolarsError,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
