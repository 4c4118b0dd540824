//! Turns the hourly station readings into monthly, per-region climate
//! aggregates.

use crate::parsing::{parse_decimal, parse_timestamp, CANONICAL_TIMESTAMP_FORMAT};
use crate::resolvers::error::ResolveError;
use crate::sources::table::SourceTable;
use crate::types::frames::{MonthlyClimate, MONTH, PROVENANCE, REGION};
use crate::types::month::Month;
use crate::types::region::Region;
use crate::types::source_kind::{columns, Aggregation, MetricKind};
use crate::utils::{
    empty_frame, first_missing_column, has_columns, keep_first_by, map_f64_column, map_str_column,
    normalize_key,
};
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use polars::prelude::*;

const TIMESTAMP_KEY: &str = "timestamp";
const STATION_KEY: &str = "station_key";
const STATION_LABEL: &str = "station_label";

/// Aggregates the three climate metrics by (month, region).
///
/// Readings are matched to a region through the station directory. A
/// reading whose station is not listed is dropped. When the directory itself
/// is unavailable the resolver can fall back to using the station identifier
/// as the region label; the result then carries
/// [`MonthlyClimate::region_fallback`].
#[derive(Debug, Clone, Copy)]
pub struct ClimateResolver {
    directory_fallback: bool,
}

impl ClimateResolver {
    pub fn new(directory_fallback: bool) -> Self {
        Self { directory_fallback }
    }

    /// `readings` holds the temperature, humidity and precipitation tables in
    /// any order; each is recognized by its [`SourceKind`](crate::SourceKind).
    /// A metric without a table, or whose table lacks a required column,
    /// counts as absent.
    pub fn resolve(
        &self,
        readings: &[&SourceTable],
        directory: &SourceTable,
    ) -> Result<MonthlyClimate, ResolveError> {
        let mut provenance = Vec::new();
        let mut metric_frames = Vec::with_capacity(MetricKind::ALL.len());
        for metric in MetricKind::ALL {
            let table = readings
                .iter()
                .find(|table| table.kind() == metric.source());
            match table.map(|table| prepare_readings(table, metric)).transpose()? {
                Some(Some(frame)) => {
                    provenance.push(metric.source().name());
                    metric_frames.push(frame);
                }
                _ => metric_frames.push(empty_readings(metric)),
            }
        }

        if provenance.is_empty() {
            warn!("No climate source available, skipping climate integration");
            return Ok(MonthlyClimate::empty());
        }

        let labels = station_labels(&metric_frames)?;
        let metric_frames = metric_frames
            .into_iter()
            .map(|frame| frame.drop(STATION_LABEL))
            .collect::<PolarsResult<Vec<_>>>()?;
        let merged = merge_metrics(metric_frames)?;
        let (mut located, region_fallback) = match station_regions(directory)? {
            Some(stations) => {
                let located = merged
                    .clone()
                    .lazy()
                    .join(
                        stations.lazy(),
                        [col(STATION_KEY)],
                        [col(STATION_KEY)],
                        JoinArgs::new(JoinType::Inner),
                    )
                    .collect()?;
                info!(
                    "Climate readings: {} station-hours located, {} dropped without a directory entry",
                    located.height(),
                    merged.height().saturating_sub(located.height())
                );
                (located, false)
            }
            None if self.directory_fallback => {
                warn!("Station directory unavailable, using station identifiers as regions");
                let located = merged
                    .lazy()
                    .join(
                        labels.lazy(),
                        [col(STATION_KEY)],
                        [col(STATION_KEY)],
                        JoinArgs::new(JoinType::Left),
                    )
                    .with_column(col(STATION_LABEL).alias(REGION))
                    .collect()?;
                (located, true)
            }
            None => {
                warn!("Station directory unavailable and fallback disabled, skipping climate integration");
                return Ok(MonthlyClimate::empty());
            }
        };

        if located.height() == 0 {
            return Ok(MonthlyClimate::empty());
        }

        let month = map_str_column(&located, TIMESTAMP_KEY, MONTH, |timestamp| {
            NaiveDateTime::parse_from_str(timestamp, CANONICAL_TIMESTAMP_FORMAT)
                .ok()
                .map(|datetime| Month::from_datetime(&datetime).to_string())
        })?;
        located.with_column(month)?;

        let aggregates: Vec<Expr> = MetricKind::ALL.iter().map(aggregate_expr).collect();
        let mut output = vec![col(MONTH), col(REGION)];
        output.extend(
            MetricKind::ALL
                .iter()
                .map(|metric| col(metric.aggregate_column())),
        );
        output.push(col(PROVENANCE));

        let frame = located
            .lazy()
            .group_by_stable([col(MONTH), col(REGION)])
            .agg(aggregates)
            .with_column(lit(provenance.join(", ")).alias(PROVENANCE))
            .select(output)
            .collect()?;

        debug!("Climate aggregated into {} (month, region) rows", frame.height());
        Ok(MonthlyClimate::new(frame, region_fallback))
    }
}

/// Reduces one metric table to `timestamp`, `station_key`, the trimmed
/// `station_label` and the reading, dropping rows whose timestamp or station cannot be read. Returns `None`
/// when the table is empty or lacks a required column.
fn prepare_readings(
    table: &SourceTable,
    metric: MetricKind,
) -> Result<Option<DataFrame>, ResolveError> {
    if table.is_empty() {
        return Ok(None);
    }
    let df = table.frame();
    let required = [columns::TIMESTAMP, columns::STATION_ID, metric.value_column()];
    if let Some(column) = first_missing_column(df, &required) {
        warn!(
            "{} is missing column '{}', treating it as unavailable",
            table.name(),
            column
        );
        return Ok(None);
    }

    let timestamp = map_str_column(df, columns::TIMESTAMP, TIMESTAMP_KEY, |raw| {
        parse_timestamp(raw).map(|datetime| datetime.format(CANONICAL_TIMESTAMP_FORMAT).to_string())
    })?;
    let station = map_str_column(df, columns::STATION_ID, STATION_KEY, normalize_key)?;
    let label = map_str_column(df, columns::STATION_ID, STATION_LABEL, |raw| {
        let label = raw.trim();
        (!label.is_empty()).then(|| label.to_string())
    })?;
    let reading = map_f64_column(
        df,
        metric.value_column(),
        metric.reading_column(),
        parse_decimal,
    )?;

    let frame = DataFrame::new(vec![timestamp, station, label, reading])?
        .lazy()
        .filter(col(TIMESTAMP_KEY).is_not_null().and(col(STATION_KEY).is_not_null()))
        .collect()?;
    let dropped = df.height() - frame.height();
    if dropped > 0 {
        info!(
            "{}: dropped {} rows with an unreadable timestamp or station",
            table.name(),
            dropped
        );
    }
    Ok(Some(frame))
}

fn empty_readings(metric: MetricKind) -> DataFrame {
    empty_frame(&[
        (TIMESTAMP_KEY, DataType::String),
        (STATION_KEY, DataType::String),
        (STATION_LABEL, DataType::String),
        (metric.reading_column(), DataType::Float64),
    ])
}

/// Station key to the identifier as first spelled in the readings, used as
/// the region label when there is no directory.
fn station_labels(frames: &[DataFrame]) -> PolarsResult<DataFrame> {
    let mut labels = empty_frame(&[
        (STATION_KEY, DataType::String),
        (STATION_LABEL, DataType::String),
    ]);
    for frame in frames {
        labels.vstack_mut(&frame.select([STATION_KEY, STATION_LABEL])?)?;
    }
    keep_first_by(&labels, STATION_KEY)
}

/// Full outer join of the per-metric frames on (timestamp, station).
fn merge_metrics(frames: Vec<DataFrame>) -> PolarsResult<DataFrame> {
    let keys = [col(TIMESTAMP_KEY), col(STATION_KEY)];
    let merged = frames.into_iter().map(DataFrame::lazy).reduce(|merged, frame| {
        merged.join(
            frame,
            keys.clone(),
            keys.clone(),
            JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
        )
    });
    match merged {
        Some(merged) => merged.collect(),
        None => Ok(DataFrame::empty()),
    }
}

/// Station key to canonical region, one entry per station. `None` when the
/// directory is unavailable or unusable.
fn station_regions(directory: &SourceTable) -> Result<Option<DataFrame>, ResolveError> {
    if directory.is_empty() {
        return Ok(None);
    }
    let df = directory.frame();
    if !has_columns(df, &[columns::STATION_ID, columns::DEPARTMENT]) {
        warn!(
            "{} lacks station or department columns, treating it as unavailable",
            directory.name()
        );
        return Ok(None);
    }

    let key = map_str_column(df, columns::STATION_ID, STATION_KEY, normalize_key)?;
    let region = map_str_column(df, columns::DEPARTMENT, REGION, |name| {
        Region::from_name(name).map(|region| region.name().to_string())
    })?;
    let stations = DataFrame::new(vec![key, region])?
        .lazy()
        .filter(col(REGION).is_not_null())
        .collect()?;
    let stations = keep_first_by(&stations, STATION_KEY)?;
    Ok((stations.height() > 0).then_some(stations))
}

/// Sum or mean of one reading column, rounded to one decimal. A group with no
/// readings for the metric stays null rather than summing to zero.
fn aggregate_expr(metric: &MetricKind) -> Expr {
    let reading = col(metric.reading_column());
    let aggregated = match metric.aggregation() {
        Aggregation::Sum => when(reading.clone().count().gt(lit(0)))
            .then(reading.sum())
            .otherwise(lit(NULL).cast(DataType::Float64)),
        Aggregation::Mean => reading.mean(),
    };
    aggregated.round(1).alias(metric.aggregate_column())
}
