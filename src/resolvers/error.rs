use crate::types::source_kind::SourceKind;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Missing required column '{column}' in {source_kind} table")]
    MissingColumn {
        source_kind: SourceKind,
        column: String,
    },

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
