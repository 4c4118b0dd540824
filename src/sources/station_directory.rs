//! Extracts the station → department directory embedded in the weather
//! service's station page.
//!
//! The page assigns a JSON document to a script variable
//! (`var estaciones = {...};`) whose `estaciones` array lists one object per
//! station.

use crate::sources::error::SourceError;
use crate::types::source_kind::columns;
use crate::types::station::Station;
use log::debug;
use polars::prelude::*;
use serde_json::Value;

const LISTING_MARKER: &str = "var estaciones";

/// Finds the JSON text assigned to `var estaciones`, up to the first `;`.
fn listing_json(html: &str) -> Option<&str> {
    let start = html.find(LISTING_MARKER)? + LISTING_MARKER.len();
    let rest = html[start..].trim_start().strip_prefix('=')?;
    let end = rest.find(';')?;
    Some(rest[..end].trim())
}

/// Parses every station in the page whose department is one of the 19
/// regions. Stations in other departments are dropped.
pub fn parse_stations(html: &str) -> Result<Vec<Station>, SourceError> {
    let json = listing_json(html).ok_or(SourceError::MissingStationListing)?;
    let listing: Value = serde_json::from_str(json)?;
    let entries = listing
        .get("estaciones")
        .and_then(Value::as_array)
        .ok_or(SourceError::MissingStationArray)?;

    let stations: Vec<Station> = entries
        .iter()
        .filter_map(Value::as_object)
        .filter_map(Station::from_listing_entry)
        .collect();
    debug!(
        "Station listing: kept {} of {} entries with a known department",
        stations.len(),
        entries.len()
    );
    Ok(stations)
}

/// Lays the stations out as the directory table the climate resolver joins
/// against: `estacion_id` and `departamento` (canonical region name).
pub fn stations_frame(stations: &[Station]) -> PolarsResult<DataFrame> {
    let ids: Vec<&str> = stations.iter().map(|s| s.id.as_str()).collect();
    let regions: Vec<&str> = stations.iter().map(|s| s.region.name()).collect();
    DataFrame::new(vec![
        Column::new(columns::STATION_ID.into(), ids),
        Column::new(columns::DEPARTMENT.into(), regions),
    ])
}
