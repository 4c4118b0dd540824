//! Reshapes the wide production table (one column per month) into national
//! monthly totals for one species.

use crate::config::MediatorConfig;
use crate::parsing::{parse_quantity, DashPolicy, Quantity};
use crate::resolvers::error::ResolveError;
use crate::sources::table::SourceTable;
use crate::types::frames::{MonthlyProduction, MONTH, TOTAL_QUANTITY};
use crate::types::month::Month;
use crate::types::source_kind::{columns, PROVENANCE_COLUMN};
use log::{debug, info, warn};
use polars::prelude::*;
use std::collections::BTreeMap;

const RAW_QUANTITY: &str = "raw_quantity";
const QUANTITY: &str = "quantity";

#[derive(Debug, Clone)]
pub struct ProductionResolver {
    target_species: String,
    /// Lower-cased variety name to species.
    species_aliases: BTreeMap<String, String>,
    dash_policy: DashPolicy,
}

#[derive(Debug, Default)]
struct CellCounts {
    parsed: usize,
    dashes: usize,
    unparsable: usize,
}

impl ProductionResolver {
    pub fn new(
        target_species: impl Into<String>,
        species_aliases: &BTreeMap<String, String>,
        dash_policy: DashPolicy,
    ) -> Self {
        Self {
            target_species: target_species.into(),
            species_aliases: species_aliases
                .iter()
                .map(|(variety, species)| (variety.trim().to_lowercase(), species.clone()))
                .collect(),
            dash_policy,
        }
    }

    pub fn from_config(config: &MediatorConfig) -> Self {
        Self::new(
            config.target_species.clone(),
            &config.species_aliases,
            config.dash_policy,
        )
    }

    /// The species a raw `especie` value stands for, after alias mapping.
    fn canonical_species<'a>(&'a self, raw: &'a str) -> &'a str {
        let raw = raw.trim();
        self.species_aliases
            .get(&raw.to_lowercase())
            .map(String::as_str)
            .unwrap_or(raw)
    }

    fn is_target(&self, raw: &str) -> bool {
        self.canonical_species(raw)
            .trim()
            .eq_ignore_ascii_case(self.target_species.trim())
    }

    pub fn resolve(&self, production: &SourceTable) -> Result<MonthlyProduction, ResolveError> {
        if production.is_empty() {
            warn!("Production source unavailable, skipping production integration");
            return Ok(MonthlyProduction::empty());
        }
        let df = production.frame();
        let species = df
            .column(columns::SPECIES)
            .map_err(|_| ResolveError::MissingColumn {
                source_kind: production.kind(),
                column: columns::SPECIES.to_string(),
            })?
            .cast(&DataType::String)?;
        let mask: BooleanChunked = species
            .str()?
            .into_iter()
            .map(|value| Some(value.is_some_and(|value| self.is_target(value))))
            .collect();
        let records = df.filter(&mask)?;
        debug!(
            "Production: {} of {} records are {}",
            records.height(),
            df.height(),
            self.target_species
        );

        if records.height() == 0 {
            info!("Production: no {} records", self.target_species);
            return Ok(MonthlyProduction::empty());
        }

        // Wide to long: one (month, raw cell) frame per month column, stacked.
        let stacked: Vec<LazyFrame> = records
            .get_column_names()
            .into_iter()
            .filter(|name| {
                !columns::PRODUCTION_IDENTIFIERS.contains(&name.as_str())
                    && name.as_str() != PROVENANCE_COLUMN
            })
            .filter_map(|name| match Month::from_label(name.as_str()) {
                Some(month) => Some(records.clone().lazy().select([
                    lit(month.to_string()).alias(MONTH),
                    col(name.as_str()).cast(DataType::String).alias(RAW_QUANTITY),
                ])),
                None => {
                    debug!("Production: ignoring column '{}'", name);
                    None
                }
            })
            .collect();
        if stacked.is_empty() {
            warn!("Production source has no month columns, skipping production integration");
            return Ok(MonthlyProduction::empty());
        }
        let mut long = concat(stacked, UnionArgs::default())?.collect()?;

        let mut counts = CellCounts::default();
        let quantities: Vec<Option<f64>> = long
            .column(RAW_QUANTITY)?
            .str()?
            .into_iter()
            .map(|raw| {
                let quantity = parse_quantity(raw?, self.dash_policy);
                match quantity {
                    Quantity::Value(_) => counts.parsed += 1,
                    Quantity::DashAsZero => counts.dashes += 1,
                    Quantity::Unparsable => counts.unparsable += 1,
                }
                quantity.value()
            })
            .collect();
        long.with_column(Column::new(QUANTITY.into(), quantities))?;

        if counts.dashes > 0 {
            info!(
                "Production: {} dash cells read as zero under the {:?} policy",
                counts.dashes, self.dash_policy
            );
        }
        if counts.unparsable > 0 {
            info!(
                "Production: dropped {} cells that are not quantities",
                counts.unparsable
            );
        }

        let frame = long
            .lazy()
            .filter(col(QUANTITY).is_not_null())
            .group_by([col(MONTH)])
            .agg([col(QUANTITY).sum().alias(TOTAL_QUANTITY)])
            .sort_by_exprs([col(MONTH)], SortMultipleOptions::default())
            .collect()?;
        info!(
            "Production: {} monthly totals from {} values",
            frame.height(),
            counts.parsed + counts.dashes
        );
        Ok(MonthlyProduction::new(frame))
    }
}
