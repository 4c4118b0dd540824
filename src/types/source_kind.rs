//! Defines the logical upstream sources the mediator integrates and the column
//! layout each of them is expected to have after normalization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the provenance column every [`crate::SourceTable`] carries.
pub const PROVENANCE_COLUMN: &str = "source_name";

/// Station directory page of the national meteorological institute.
pub const STATION_DIRECTORY_URL: &str =
    "https://www.inumet.gub.uy/tiempo/estaciones-meteorologicas-automaticas";

/// Upstream column names, as they look after normalization.
pub(crate) mod columns {
    pub const TIMESTAMP: &str = "fecha";
    pub const STATION_ID: &str = "estacion_id";
    pub const DEPARTMENT: &str = "departamento";

    pub const SPECIES: &str = "especie";
    /// Columns of the production table that identify a record rather than
    /// hold a monthly quantity.
    pub const PRODUCTION_IDENTIFIERS: [&str; 4] = ["grupo", "variedad", "especie", "unidad"];

    pub const PRICE_ESTABLISHMENT: &str = "establecimiento";
    pub const PRICE: &str = "precio";
    pub const ESTABLISHMENT_ID: &str = "idestablecimientos";
    pub const REGION_ID: &str = "iddepto";
    pub const REGION_NAME: &str = "depto";
}

/// One of the seven upstream feeds.
///
/// The variant's [`name`](SourceKind::name) doubles as the provenance label
/// written into the source's table, and as the key used to override its
/// location through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Hourly air temperature readings, one row per station and hour.
    #[serde(rename = "INUMET_temperatura")]
    Temperature,
    /// Hourly relative humidity readings.
    #[serde(rename = "INUMET_humedad")]
    Humidity,
    /// Hourly accumulated precipitation readings.
    #[serde(rename = "INUMET_precipitaciones")]
    Precipitation,
    /// Station → department directory, scraped from an HTML page.
    #[serde(rename = "INUMET_estaciones")]
    StationDirectory,
    /// Retail price observations keyed by establishment.
    #[serde(rename = "MEF_precios")]
    Prices,
    /// Establishment directory carrying each establishment's department.
    #[serde(rename = "MEF_establecimientos")]
    Establishments,
    /// Wide monthly production table, one column per month.
    #[serde(rename = "UAM_produccion")]
    Production,
}

impl SourceKind {
    /// Acquisition order. Climate first, then prices, then production.
    pub const ALL: [SourceKind; 7] = [
        SourceKind::Temperature,
        SourceKind::Humidity,
        SourceKind::Precipitation,
        SourceKind::StationDirectory,
        SourceKind::Prices,
        SourceKind::Establishments,
        SourceKind::Production,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Temperature => "INUMET_temperatura",
            SourceKind::Humidity => "INUMET_humedad",
            SourceKind::Precipitation => "INUMET_precipitaciones",
            SourceKind::StationDirectory => "INUMET_estaciones",
            SourceKind::Prices => "MEF_precios",
            SourceKind::Establishments => "MEF_establecimientos",
            SourceKind::Production => "UAM_produccion",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// File name of the local snapshot, for the sources distributed as CSV.
    pub(crate) fn default_file_name(&self) -> Option<&'static str> {
        match self {
            SourceKind::Temperature => Some("inumet_temperatura_del_aire.csv"),
            SourceKind::Humidity => Some("inumet_humedad_relativa.csv"),
            SourceKind::Precipitation => Some("inumet_precipitacion_acumulada_horaria.csv"),
            SourceKind::StationDirectory => None,
            SourceKind::Prices => Some("filtered_precios.csv"),
            SourceKind::Establishments => Some("establecimiento.csv"),
            SourceKind::Production => Some("volumen_de_ingresos_frutas.csv"),
        }
    }

    /// `true` for the one source obtained by scraping rather than CSV decoding.
    pub fn is_scraped(&self) -> bool {
        matches!(self, SourceKind::StationDirectory)
    }

    /// The climate metric carried by this source, if it is a reading table.
    pub fn metric(&self) -> Option<MetricKind> {
        match self {
            SourceKind::Temperature => Some(MetricKind::Temperature),
            SourceKind::Humidity => Some(MetricKind::Humidity),
            SourceKind::Precipitation => Some(MetricKind::Precipitation),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a metric is rolled up from station-hours to a (month, region) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
}

/// The three hourly climate metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Temperature,
    Humidity,
    Precipitation,
}

impl MetricKind {
    /// Provenance order used when labelling the monthly climate table.
    pub const ALL: [MetricKind; 3] = [
        MetricKind::Precipitation,
        MetricKind::Temperature,
        MetricKind::Humidity,
    ];

    pub fn source(&self) -> SourceKind {
        match self {
            MetricKind::Temperature => SourceKind::Temperature,
            MetricKind::Humidity => SourceKind::Humidity,
            MetricKind::Precipitation => SourceKind::Precipitation,
        }
    }

    /// Column holding the reading in the normalized upstream table.
    pub(crate) fn value_column(&self) -> &'static str {
        match self {
            MetricKind::Temperature => "temp_aire",
            MetricKind::Humidity => "hum_relativa",
            MetricKind::Precipitation => "precip_horario",
        }
    }

    /// Column holding the reading once the three tables are merged.
    pub(crate) fn reading_column(&self) -> &'static str {
        match self {
            MetricKind::Temperature => "temperature",
            MetricKind::Humidity => "humidity",
            MetricKind::Precipitation => "precipitation",
        }
    }

    /// Column holding the monthly aggregate.
    pub(crate) fn aggregate_column(&self) -> &'static str {
        match self {
            MetricKind::Temperature => "temp_mean",
            MetricKind::Humidity => "humidity_mean",
            MetricKind::Precipitation => "precip_total",
        }
    }

    pub fn aggregation(&self) -> Aggregation {
        match self {
            MetricKind::Precipitation => Aggregation::Sum,
            MetricKind::Temperature | MetricKind::Humidity => Aggregation::Mean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in SourceKind::ALL {
            assert_eq!(SourceKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.to_string(), kind.name());
        }
        assert_eq!(SourceKind::from_name("unknown"), None);
    }

    #[test]
    fn test_serde_uses_source_names() {
        let json = serde_json::to_string(&SourceKind::Production).unwrap();
        assert_eq!(json, "\"UAM_produccion\"");
        let kind: SourceKind = serde_json::from_str("\"MEF_precios\"").unwrap();
        assert_eq!(kind, SourceKind::Prices);
    }

    #[test]
    fn test_only_station_directory_is_scraped() {
        let scraped: Vec<SourceKind> = SourceKind::ALL
            .into_iter()
            .filter(SourceKind::is_scraped)
            .collect();
        assert_eq!(scraped, vec![SourceKind::StationDirectory]);
        assert!(SourceKind::StationDirectory.default_file_name().is_none());
    }

    #[test]
    fn test_metric_mapping() {
        for metric in MetricKind::ALL {
            assert_eq!(metric.source().metric(), Some(metric));
        }
        assert_eq!(MetricKind::Precipitation.aggregation(), Aggregation::Sum);
        assert_eq!(MetricKind::Humidity.aggregation(), Aggregation::Mean);
        assert_eq!(SourceKind::Prices.metric(), None);
    }
}
