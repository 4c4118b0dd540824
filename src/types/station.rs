//! A weather station as listed in the station directory page.

use crate::sources::table::normalize_column_name;
use crate::types::region::Region;
use serde_json::{Map, Value};

/// A station and the department it belongs to.
///
/// Only stations whose department resolves to one of the 19 [`Region`]s can
/// be represented; everything else is discarded while scraping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    /// The station's display name, which the hourly reading tables use as
    /// their station identifier.
    pub id: String,
    pub region: Region,
}

impl Station {
    /// Reads a station from one entry of the directory's `estaciones` array.
    ///
    /// Keys are matched after column-name normalization, so `NombreEstacion`
    /// and `nombre_estacion` are both accepted.
    pub(crate) fn from_listing_entry(entry: &Map<String, Value>) -> Option<Self> {
        let field = |wanted: &[&str]| {
            entry.iter().find_map(|(key, value)| {
                let key = normalize_column_name(key);
                wanted.contains(&key.as_str()).then(|| value_as_text(value)).flatten()
            })
        };
        let id = field(&["nombreestacion", "nombre_estacion", "estacion"])?;
        let region = Region::from_name(&field(&["departamento"])?)?;
        let id = id.trim().to_string();
        (!id.is_empty()).then_some(Self { id, region })
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_reads_station_with_canonical_region() {
        let station = Station::from_listing_entry(&entry(json!({
            "NombreEstacion": " Las Brujas ",
            "Departamento": "CANELONES",
            "Latitud": -34.67
        })))
        .unwrap();
        assert_eq!(station.id, "Las Brujas");
        assert_eq!(station.region, Region::Canelones);
    }

    #[test]
    fn test_rejects_unknown_department() {
        assert!(Station::from_listing_entry(&entry(json!({
            "nombreEstacion": "Base Artigas",
            "departamento": "Antártida"
        })))
        .is_none());
    }

    #[test]
    fn test_rejects_missing_fields() {
        assert!(Station::from_listing_entry(&entry(json!({"departamento": "Salto"}))).is_none());
        assert!(Station::from_listing_entry(&entry(json!({"nombreEstacion": "Salto"}))).is_none());
        assert!(Station::from_listing_entry(&entry(json!({
            "nombreEstacion": "  ",
            "departamento": "Salto"
        })))
        .is_none());
    }

    #[test]
    fn test_numeric_identifiers_are_accepted() {
        let station = Station::from_listing_entry(&entry(json!({
            "estacion": 86360,
            "departamento": "Salto"
        })))
        .unwrap();
        assert_eq!(station.id, "86360");
    }
}
