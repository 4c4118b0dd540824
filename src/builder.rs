//! Joins the three monthly branches into the final [`GlobalView`].

use crate::types::frames::{
    MonthlyClimate, MonthlyPrice, MonthlyProduction, HUMIDITY_MEAN, MEAN_PRICE, MONTH,
    PRECIP_TOTAL, REGION, TEMP_MEAN, TOTAL_QUANTITY,
};
use crate::types::global_view::{GlobalView, GlobalViewRow};
use crate::types::month::Month;
use crate::utils::{get_opt_float, get_opt_str};
use log::{debug, info};
use polars::prelude::*;

const OUTPUT_COLUMNS: [&str; 7] = [
    MONTH,
    REGION,
    PRECIP_TOTAL,
    TEMP_MEAN,
    HUMIDITY_MEAN,
    TOTAL_QUANTITY,
    MEAN_PRICE,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalViewBuilder;

impl GlobalViewBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds the view. Climate seeds the (month, region) keyspace when it
    /// has rows, price otherwise. Production only ever joins by month; alone
    /// it yields rows without a region.
    pub fn build(
        &self,
        climate: &MonthlyClimate,
        production: &MonthlyProduction,
        price: &MonthlyPrice,
    ) -> PolarsResult<GlobalView> {
        if climate.is_empty() && production.is_empty() && price.is_empty() {
            info!("Every branch is empty, no data to integrate");
            return Ok(GlobalView::no_data());
        }

        let climate_lf = climate.frame.clone().lazy().select([
            col(MONTH),
            col(REGION),
            col(PRECIP_TOTAL),
            col(TEMP_MEAN),
            col(HUMIDITY_MEAN),
        ]);
        let production_lf = production.frame.clone().lazy();
        let price_lf = price.frame.clone().lazy();

        let joined = if !climate.is_empty() {
            debug!("Global view seeded from climate");
            let base = full_join(climate_lf, production_lf, &[MONTH]);
            full_join(base, price_lf, &[MONTH, REGION])
        } else if !price.is_empty() {
            debug!("Global view seeded from price");
            let base = full_join(price_lf, production_lf, &[MONTH]);
            full_join(base, climate_lf, &[MONTH, REGION])
        } else {
            debug!("Global view seeded from production, rows carry no region");
            let base = production_lf.with_column(lit(NULL).cast(DataType::String).alias(REGION));
            let base = full_join(base, climate_lf, &[MONTH, REGION]);
            full_join(base, price_lf, &[MONTH, REGION])
        };

        let frame = joined
            .filter(col(MONTH).is_not_null().or(col(REGION).is_not_null()))
            .select(OUTPUT_COLUMNS.map(col))
            .sort_by_exprs(
                [col(MONTH), col(REGION)],
                SortMultipleOptions::default()
                    .with_nulls_last(true)
                    .with_maintain_order(true),
            )
            .collect()?;

        let rows = extract_rows(&frame)?;
        info!("Global view built with {} rows", rows.len());
        Ok(GlobalView {
            rows,
            region_fallback: climate.region_fallback && !climate.is_empty(),
        })
    }
}

fn full_join(left: LazyFrame, right: LazyFrame, keys: &[&str]) -> LazyFrame {
    let keys: Vec<Expr> = keys.iter().map(|key| col(*key)).collect();
    left.join(
        right,
        keys.clone(),
        keys,
        JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
    )
}

fn extract_rows(frame: &DataFrame) -> PolarsResult<Vec<GlobalViewRow>> {
    let month = frame.column(MONTH)?;
    let region = frame.column(REGION)?;
    let precip_total = frame.column(PRECIP_TOTAL)?;
    let temp_mean = frame.column(TEMP_MEAN)?;
    let humidity_mean = frame.column(HUMIDITY_MEAN)?;
    let total_quantity = frame.column(TOTAL_QUANTITY)?;
    let mean_price = frame.column(MEAN_PRICE)?;

    let mut rows = Vec::with_capacity(frame.height());
    for idx in 0..frame.height() {
        let Some(month) = get_opt_str(month, idx).and_then(|text| text.parse::<Month>().ok())
        else {
            debug!("Skipping row {} without a month", idx);
            continue;
        };
        let mut row = GlobalViewRow {
            month,
            region: get_opt_str(region, idx),
            precip_total: get_opt_float(precip_total, idx),
            temp_mean: get_opt_float(temp_mean, idx),
            humidity_mean: get_opt_float(humidity_mean, idx),
            total_quantity: get_opt_float(total_quantity, idx),
            mean_price: get_opt_float(mean_price, idx),
            provenance: String::new(),
        };
        row.provenance = GlobalViewRow::provenance_label(
            row.has_climate(),
            row.total_quantity.is_some(),
            row.mean_price.is_some(),
        );
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn climate(rows: &[(&str, &str, f64)], region_fallback: bool) -> MonthlyClimate {
        let frame = df!(
            MONTH => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            REGION => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            PRECIP_TOTAL => rows.iter().map(|r| Some(r.2)).collect::<Vec<_>>(),
            TEMP_MEAN => rows.iter().map(|_| None::<f64>).collect::<Vec<_>>(),
            HUMIDITY_MEAN => rows.iter().map(|_| None::<f64>).collect::<Vec<_>>(),
            "provenance" => rows.iter().map(|_| "INUMET_precipitaciones").collect::<Vec<_>>()
        )
        .unwrap();
        MonthlyClimate::new(frame, region_fallback)
    }

    fn production(rows: &[(&str, f64)]) -> MonthlyProduction {
        MonthlyProduction::new(
            df!(
                MONTH => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
                TOTAL_QUANTITY => rows.iter().map(|r| r.1).collect::<Vec<_>>()
            )
            .unwrap(),
        )
    }

    fn price(rows: &[(&str, &str, f64)]) -> MonthlyPrice {
        MonthlyPrice::new(
            df!(
                MONTH => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
                REGION => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
                MEAN_PRICE => rows.iter().map(|r| r.2).collect::<Vec<_>>()
            )
            .unwrap(),
        )
    }

    fn keys(view: &GlobalView) -> Vec<(String, Option<String>)> {
        view.rows
            .iter()
            .map(|row| (row.month.to_string(), row.region.clone()))
            .collect()
    }

    #[test]
    fn test_all_empty_is_no_data() {
        let view = GlobalViewBuilder::new()
            .build(
                &MonthlyClimate::empty(),
                &MonthlyProduction::empty(),
                &MonthlyPrice::empty(),
            )
            .unwrap();
        assert!(view.is_empty());
    }

    #[test]
    fn test_climate_base_with_production_and_price() {
        let view = GlobalViewBuilder::new()
            .build(
                &climate(
                    &[("2023-02", "Salto", 4.0), ("2023-01", "Canelones", 12.5)],
                    false,
                ),
                &production(&[("2023-01", 1000.0), ("2023-03", 50.0)]),
                &price(&[("2023-01", "Canelones", 30.0), ("2023-01", "Rocha", 45.5)]),
            )
            .unwrap();

        assert_eq!(
            keys(&view),
            vec![
                ("2023-01".to_string(), Some("Canelones".to_string())),
                ("2023-01".to_string(), Some("Rocha".to_string())),
                ("2023-02".to_string(), Some("Salto".to_string())),
                ("2023-03".to_string(), None),
            ]
        );

        let canelones = &view.rows[0];
        assert_eq!(canelones.precip_total, Some(12.5));
        assert_eq!(canelones.total_quantity, Some(1000.0));
        assert_eq!(canelones.mean_price, Some(30.0));
        assert_eq!(canelones.provenance, "climate, production, price");

        // Price-only region has no production because the production month
        // joined onto the climate rows before price was added.
        let rocha = &view.rows[1];
        assert_eq!(rocha.precip_total, None);
        assert_eq!(rocha.mean_price, Some(45.5));
        assert_eq!(rocha.provenance, "price");

        let salto = &view.rows[2];
        assert_eq!(salto.provenance, "climate");

        let production_only = &view.rows[3];
        assert_eq!(production_only.total_quantity, Some(50.0));
        assert_eq!(production_only.provenance, "production");
        assert!(!view.region_fallback);
    }

    #[test]
    fn test_price_base_broadcasts_production() {
        let view = GlobalViewBuilder::new()
            .build(
                &MonthlyClimate::empty(),
                &production(&[("2023-01", 10.0)]),
                &price(&[("2023-01", "Rocha", 1.0), ("2023-01", "Canelones", 2.0)]),
            )
            .unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.rows[0].region.as_deref(), Some("Canelones"));
        assert!(view
            .rows
            .iter()
            .all(|row| row.total_quantity == Some(10.0) && row.provenance == "production, price"));
    }

    #[test]
    fn test_production_only_rows_have_no_region() {
        let view = GlobalViewBuilder::new()
            .build(
                &MonthlyClimate::empty(),
                &production(&[("2007-02", 0.0), ("2007-01", 1234.5)]),
                &MonthlyPrice::empty(),
            )
            .unwrap();
        assert_eq!(
            keys(&view),
            vec![("2007-01".to_string(), None), ("2007-02".to_string(), None)]
        );
        assert_eq!(view.rows[1].total_quantity, Some(0.0));
        assert_eq!(view.rows[1].provenance, "production");
    }

    #[test]
    fn test_region_fallback_is_carried() {
        let view = GlobalViewBuilder::new()
            .build(
                &climate(&[("2023-01", "B", 1.0)], true),
                &MonthlyProduction::empty(),
                &MonthlyPrice::empty(),
            )
            .unwrap();
        assert!(view.region_fallback);
        assert_eq!(view.rows[0].region.as_deref(), Some("B"));
    }

    #[test]
    fn test_non_finite_values_become_null() {
        let view = GlobalViewBuilder::new()
            .build(
                &climate(&[("2023-01", "Rocha", f64::NAN)], false),
                &MonthlyProduction::empty(),
                &MonthlyPrice::empty(),
            )
            .unwrap();
        assert_eq!(view.rows[0].precip_total, None);
        assert_eq!(view.rows[0].provenance, "");
    }
}
