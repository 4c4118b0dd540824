//! Typed wrappers around the polars frames the resolvers hand to the builder.
//!
//! Each wrapper guarantees a fixed column layout, including when it is empty,
//! so the builder can join them without checking schemas first.

use crate::utils::empty_frame;
use polars::prelude::{DataFrame, DataType};

pub const MONTH: &str = "month";
pub const REGION: &str = "region";
pub const PRECIP_TOTAL: &str = "precip_total";
pub const TEMP_MEAN: &str = "temp_mean";
pub const HUMIDITY_MEAN: &str = "humidity_mean";
pub const TOTAL_QUANTITY: &str = "total_quantity";
pub const MEAN_PRICE: &str = "mean_price";
pub const PROVENANCE: &str = "provenance";

/// Monthly, per-region climate aggregates.
///
/// Columns: `month` (`YYYY-MM`), `region`, `precip_total`, `temp_mean`,
/// `humidity_mean` and `provenance`.
#[derive(Debug, Clone)]
pub struct MonthlyClimate {
    pub frame: DataFrame,
    /// Set when no station directory was available and station identifiers
    /// were used as region labels. Rows of such a frame may carry region
    /// values outside the 19 departments.
    pub region_fallback: bool,
}

impl MonthlyClimate {
    pub(crate) fn new(frame: DataFrame, region_fallback: bool) -> Self {
        Self {
            frame,
            region_fallback,
        }
    }

    pub fn empty() -> Self {
        Self::new(
            empty_frame(&[
                (MONTH, DataType::String),
                (REGION, DataType::String),
                (PRECIP_TOTAL, DataType::Float64),
                (TEMP_MEAN, DataType::Float64),
                (HUMIDITY_MEAN, DataType::Float64),
                (PROVENANCE, DataType::String),
            ]),
            false,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

/// National monthly production totals. Columns: `month`, `total_quantity`.
#[derive(Debug, Clone)]
pub struct MonthlyProduction {
    pub frame: DataFrame,
}

impl MonthlyProduction {
    pub(crate) fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn empty() -> Self {
        Self::new(empty_frame(&[
            (MONTH, DataType::String),
            (TOTAL_QUANTITY, DataType::Float64),
        ]))
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

/// Monthly, per-region mean prices. Columns: `month`, `region`, `mean_price`.
#[derive(Debug, Clone)]
pub struct MonthlyPrice {
    pub frame: DataFrame,
}

impl MonthlyPrice {
    pub(crate) fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn empty() -> Self {
        Self::new(empty_frame(&[
            (MONTH, DataType::String),
            (REGION, DataType::String),
            (MEAN_PRICE, DataType::Float64),
        ]))
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_frames_have_full_schema() {
        let climate = MonthlyClimate::empty();
        assert!(climate.is_empty());
        assert!(!climate.region_fallback);
        assert_eq!(climate.frame.width(), 6);

        let production = MonthlyProduction::empty();
        assert!(production.is_empty());
        assert_eq!(
            production.frame.column(TOTAL_QUANTITY).unwrap().dtype(),
            &DataType::Float64
        );

        let price = MonthlyPrice::empty();
        assert!(price.is_empty());
        assert_eq!(price.frame.column(REGION).unwrap().dtype(), &DataType::String);
    }
}
