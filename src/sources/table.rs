//! The normalized table every acquisition path produces.

use crate::sources::error::SourceError;
use crate::types::source_kind::{SourceKind, PROVENANCE_COLUMN};
use polars::prelude::*;

/// A normalized upstream table.
///
/// Column names are lower-cased, spaces become underscores and anything
/// outside `[a-zA-Z0-9_]` is removed. A `source_name` column tags every row
/// with the source's name. Rows in which every field is null are dropped.
///
/// An empty table stands for "source unavailable": the loader returns one
/// whenever acquisition fails, and the resolvers treat it as absent.
#[derive(Debug, Clone)]
pub struct SourceTable {
    kind: SourceKind,
    frame: DataFrame,
}

impl SourceTable {
    /// Normalizes a freshly decoded frame.
    pub fn new(kind: SourceKind, mut frame: DataFrame) -> Result<Self, SourceError> {
        let to_frame_error = |source| SourceError::Frame { kind, source };

        let names: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|name| normalize_column_name(name.as_str()))
            .collect();
        frame.set_column_names(names).map_err(to_frame_error)?;

        let mut frame = drop_empty_rows(frame).map_err(to_frame_error)?;
        let tags = vec![kind.name(); frame.height()];
        frame
            .with_column(Column::new(PROVENANCE_COLUMN.into(), tags))
            .map_err(to_frame_error)?;

        Ok(Self { kind, frame })
    }

    /// The "source unavailable" table.
    pub fn empty(kind: SourceKind) -> Self {
        Self {
            kind,
            frame: DataFrame::empty(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

/// Applies the column-name normalization rule to a single name.
///
/// ```
/// use agroview::normalize_column_name;
///
/// assert_eq!(normalize_column_name("Temp Aire"), "temp_aire");
/// assert_eq!(normalize_column_name("Año (kg)"), "ao_kg");
/// ```
pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect::<String>()
        .trim()
        .to_string()
}

fn drop_empty_rows(frame: DataFrame) -> PolarsResult<DataFrame> {
    if frame.width() == 0 {
        return Ok(frame);
    }
    let mut keep = BooleanChunked::full("keep".into(), false, frame.height());
    for column in frame.get_columns() {
        keep = &keep | &column.as_materialized_series().is_not_null();
    }
    frame.filter(&keep)
}
