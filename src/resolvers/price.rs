//! Matches retail price observations to their establishment's department and
//! averages them by month.

use crate::parsing::{parse_decimal, parse_timestamp};
use crate::resolvers::error::ResolveError;
use crate::sources::table::SourceTable;
use crate::types::frames::{MonthlyPrice, MEAN_PRICE, MONTH, REGION};
use crate::types::month::Month;
use crate::types::region::Region;
use crate::types::source_kind::columns;
use crate::utils::{first_missing_column, keep_first_by, map_f64_column, map_str_column, normalize_key};
use log::{info, warn};
use polars::prelude::*;

const ESTABLISHMENT_KEY: &str = "establishment_key";
const REGION_ID: &str = "region_id";
const PRICE: &str = "price";
const REGION_ID_COUNT: &str = "region_id_count";

#[derive(Debug, Clone, Copy, Default)]
pub struct PriceResolver;

impl PriceResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        prices: &SourceTable,
        establishments: &SourceTable,
    ) -> Result<MonthlyPrice, ResolveError> {
        if prices.is_empty() || establishments.is_empty() {
            warn!("Price sources unavailable, skipping price integration");
            return Ok(MonthlyPrice::empty());
        }
        let observations = price_observations(prices)?;
        let regions = establishment_regions(establishments)?;

        let matched = observations
            .lazy()
            .join(
                regions.lazy(),
                [col(ESTABLISHMENT_KEY)],
                [col(ESTABLISHMENT_KEY)],
                JoinArgs::new(JoinType::Inner),
            )
            .collect()?;
        info!(
            "Prices: {} of {} observations matched an establishment",
            matched.height(),
            prices.frame().height()
        );
        if matched.height() == 0 {
            return Ok(MonthlyPrice::empty());
        }

        let matched_rows = matched.height();
        let usable = matched
            .lazy()
            .filter(col(MONTH).is_not_null().and(col(PRICE).is_not_null()))
            .collect()?;
        let unparsed = matched_rows - usable.height();
        let unknown_regions = usable.column(REGION)?.null_count();
        if unparsed > 0 || unknown_regions > 0 {
            info!(
                "Prices: dropped {} rows with an unreadable date or price and {} outside the known regions",
                unparsed, unknown_regions
            );
        }

        // Grouped on the canonical region so two upstream ids spelling the same
        // department ("3", "03") still give one row per (month, region).
        let grouped = usable
            .lazy()
            .filter(col(REGION).is_not_null())
            .group_by_stable([col(REGION), col(MONTH)])
            .agg([
                col(PRICE).mean().round(2).alias(MEAN_PRICE),
                col(REGION_ID).first(),
                col(REGION_ID).n_unique().alias(REGION_ID_COUNT),
            ])
            .collect()?;
        let merged_ids = grouped
            .clone()
            .lazy()
            .filter(col(REGION_ID_COUNT).gt(lit(1)))
            .collect()?
            .height();
        if merged_ids > 0 {
            info!(
                "Prices: {} (month, region) groups merged observations filed under several region ids",
                merged_ids
            );
        }

        let frame = grouped
            .lazy()
            .select([col(MONTH), col(REGION), col(MEAN_PRICE)])
            .collect()?;
        Ok(MonthlyPrice::new(frame))
    }
}

/// `establishment_key`, `month` and `price` of every observation.
fn price_observations(prices: &SourceTable) -> Result<DataFrame, ResolveError> {
    let df = prices.frame();
    let required = [columns::PRICE_ESTABLISHMENT, columns::TIMESTAMP, columns::PRICE];
    if let Some(column) = first_missing_column(df, &required) {
        return Err(ResolveError::MissingColumn {
            source_kind: prices.kind(),
            column: column.to_string(),
        });
    }
    Ok(DataFrame::new(vec![
        map_str_column(df, columns::PRICE_ESTABLISHMENT, ESTABLISHMENT_KEY, normalize_key)?,
        map_str_column(df, columns::TIMESTAMP, MONTH, |raw| {
            parse_timestamp(raw).map(|datetime| Month::from_datetime(&datetime).to_string())
        })?,
        map_f64_column(df, columns::PRICE, PRICE, parse_decimal)?,
    ])?)
}

/// `establishment_key`, `region_id` and canonical `region` of every
/// establishment, first entry per key. Unknown departments become null.
fn establishment_regions(establishments: &SourceTable) -> Result<DataFrame, ResolveError> {
    let df = establishments.frame();
    let required = [
        columns::ESTABLISHMENT_ID,
        columns::REGION_ID,
        columns::REGION_NAME,
    ];
    if let Some(column) = first_missing_column(df, &required) {
        return Err(ResolveError::MissingColumn {
            source_kind: establishments.kind(),
            column: column.to_string(),
        });
    }
    let regions = DataFrame::new(vec![
        map_str_column(df, columns::ESTABLISHMENT_ID, ESTABLISHMENT_KEY, normalize_key)?,
        map_str_column(df, columns::REGION_ID, REGION_ID, |raw| {
            Some(raw.trim().to_string())
        })?,
        map_str_column(df, columns::REGION_NAME, REGION, |name| {
            Region::from_name(name).map(|region| region.name().to_string())
        })?,
    ])?;
    Ok(keep_first_by(&regions, ESTABLISHMENT_KEY)?)
}
