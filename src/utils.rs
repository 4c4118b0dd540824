use polars::prelude::*;

/// Builds a zero-row frame with the given column layout.
pub(crate) fn empty_frame(columns: &[(&str, DataType)]) -> DataFrame {
    let schema: Schema = columns
        .iter()
        .map(|(name, dtype)| Field::new((*name).into(), dtype.clone()))
        .collect();
    DataFrame::empty_with_schema(&schema)
}

/// `true` when every name in `columns` is present in `df`.
pub(crate) fn has_columns(df: &DataFrame, columns: &[&str]) -> bool {
    columns.iter().all(|name| df.column(name).is_ok())
}

/// Returns the first name in `columns` that `df` lacks.
pub(crate) fn first_missing_column<'a>(df: &DataFrame, columns: &[&'a str]) -> Option<&'a str> {
    columns.iter().copied().find(|name| df.column(name).is_err())
}

/// Reads `source` as text and maps every value through `f` into a new string
/// column named `target`. Nulls stay null; `f` returning `None` yields null.
pub(crate) fn map_str_column(
    df: &DataFrame,
    source: &str,
    target: &str,
    f: impl Fn(&str) -> Option<String>,
) -> PolarsResult<Column> {
    let text = df.column(source)?.cast(&DataType::String)?;
    let values: Vec<Option<String>> = text.str()?.into_iter().map(|v| v.and_then(&f)).collect();
    Ok(Column::new(target.into(), values))
}

/// Reads `source` as text and parses every value through `f` into a new
/// `Float64` column named `target`.
pub(crate) fn map_f64_column(
    df: &DataFrame,
    source: &str,
    target: &str,
    f: impl Fn(&str) -> Option<f64>,
) -> PolarsResult<Column> {
    let text = df.column(source)?.cast(&DataType::String)?;
    let values: Vec<Option<f64>> = text.str()?.into_iter().map(|v| v.and_then(&f)).collect();
    Ok(Column::new(target.into(), values))
}

pub(crate) fn get_opt_float(column: &Column, idx: usize) -> Option<f64> {
    column
        .f64()
        .ok()
        .and_then(|ca| ca.get(idx))
        .filter(|value| value.is_finite())
}

pub(crate) fn get_opt_str(column: &Column, idx: usize) -> Option<String> {
    column
        .str()
        .ok()
        .and_then(|ca| ca.get(idx))
        .map(str::to_string)
}

/// Trims and lower-cases an identifier so both sides of a join agree.
pub(crate) fn normalize_key(raw: &str) -> Option<String> {
    let key = raw.trim().to_lowercase();
    (!key.is_empty()).then_some(key)
}

/// Keeps the first row for every distinct non-null value of the `key` column
/// and drops rows whose key is null.
pub(crate) fn keep_first_by(df: &DataFrame, key: &str) -> PolarsResult<DataFrame> {
    let subset = [key.to_string()];
    df.clone()
        .lazy()
        .filter(col(key).is_not_null())
        .collect()?
        .unique_stable(Some(subset.as_slice()), UniqueKeepStrategy::First, None)
}
