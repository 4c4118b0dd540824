//! The unified monthly, per-region schema produced by the mediator.

use crate::types::month::Month;
use serde::Serialize;

/// Provenance labels, in the order they appear in a row's label.
pub const CLIMATE_LABEL: &str = "climate";
pub const PRODUCTION_LABEL: &str = "production";
pub const PRICE_LABEL: &str = "price";

/// One row of the global view.
///
/// Every measure is optional: a `None` means the corresponding source had no
/// data for this (month, region). `region` is `None` only for production
/// months that no regional source covers. Serialized with `month` as
/// `YYYY-MM` and missing values as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalViewRow {
    pub month: Month,
    pub region: Option<String>,
    pub precip_total: Option<f64>,
    pub temp_mean: Option<f64>,
    pub humidity_mean: Option<f64>,
    pub total_quantity: Option<f64>,
    pub mean_price: Option<f64>,
    /// Which of climate, production and price contributed to this row.
    pub provenance: String,
}

impl GlobalViewRow {
    pub(crate) fn provenance_label(
        has_climate: bool,
        has_production: bool,
        has_price: bool,
    ) -> String {
        [
            (has_climate, CLIMATE_LABEL),
            (has_production, PRODUCTION_LABEL),
            (has_price, PRICE_LABEL),
        ]
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, label)| *label)
        .collect::<Vec<_>>()
        .join(", ")
    }

    pub fn has_climate(&self) -> bool {
        self.precip_total.is_some() || self.temp_mean.is_some() || self.humidity_mean.is_some()
    }
}

/// The finalized integration result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalView {
    #[serde(rename = "data")]
    pub rows: Vec<GlobalViewRow>,
    /// `true` when the climate rows were keyed by raw station identifiers
    /// because the station directory was unavailable.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub region_fallback: bool,
}

impl GlobalView {
    /// The explicit "no data" result.
    pub fn no_data() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Renders `{"data": [...]}`, adding `"region_fallback": true` when the
    /// degraded climate mode was used.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
