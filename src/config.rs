//! Runtime configuration of the mediator.
//!
//! Everything has a default matching the published feeds. Source locations
//! and the cache time-to-live can be overridden from the environment without
//! code changes:
//!
//! * `AGROVIEW_CONFIG`: a complete or partial [`MediatorConfig`] as JSON.
//! * `AGROVIEW_SOURCES`: a JSON object mapping source names
//!   (e.g. `"MEF_precios"`) to a path or URL.
//! * `AGROVIEW_CACHE_TTL_SECS`: cache time-to-live in whole seconds.

use crate::error::ConfigError;
use crate::parsing::DashPolicy;
use crate::types::source_kind::{SourceKind, STATION_DIRECTORY_URL};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_ENV: &str = "AGROVIEW_CONFIG";
pub const SOURCES_ENV: &str = "AGROVIEW_SOURCES";
pub const CACHE_TTL_ENV: &str = "AGROVIEW_CACHE_TTL_SECS";

const DEFAULT_DATA_DIR: &str = "data";

/// Variety names folded onto their species before filtering production rows.
const DEFAULT_SPECIES_ALIASES: [(&str, &str); 9] = [
    ("Manzana Roja", "Manzana"),
    ("Red Delicious", "Manzana"),
    ("Manzana Red Deliciosa", "Manzana"),
    ("Granny Smith", "Manzana"),
    ("Manzana Granny Smith", "Manzana"),
    ("Fuji", "Manzana"),
    ("Manzana Fuji", "Manzana"),
    ("Otras rojas", "Manzana"),
    ("Otras verdes", "Manzana"),
];

/// Settings for one mediator instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediatorConfig {
    /// Location (local path or URL) of every source, keyed by source name.
    pub sources: BTreeMap<String, String>,
    /// Species kept from the production table.
    pub target_species: String,
    pub species_aliases: BTreeMap<String, String>,
    pub dash_policy: DashPolicy,
    /// Use station identifiers as regions when the station directory is
    /// unavailable, instead of dropping the climate branch.
    pub directory_fallback: bool,
    /// Pause between two source fetches.
    pub throttle_ms: u64,
    pub request_timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(Path::new(DEFAULT_DATA_DIR)),
            target_species: "Manzana".to_string(),
            species_aliases: DEFAULT_SPECIES_ALIASES
                .iter()
                .map(|(variety, species)| (variety.to_string(), species.to_string()))
                .collect(),
            dash_policy: DashPolicy::Zero,
            directory_fallback: true,
            throttle_ms: 100,
            request_timeout_secs: 30,
            cache_ttl_secs: 600,
        }
    }
}

/// Default locations: local CSV snapshots under `data_dir`, and the live
/// station directory page.
pub fn default_sources(data_dir: &Path) -> BTreeMap<String, String> {
    SourceKind::ALL
        .into_iter()
        .map(|kind| {
            let location = match kind.default_file_name() {
                Some(file_name) => data_dir.join(file_name).to_string_lossy().into_owned(),
                None => STATION_DIRECTORY_URL.to_string(),
            };
            (kind.name().to_string(), location)
        })
        .collect()
}

impl MediatorConfig {
    /// Default configuration with the CSV snapshots read from `data_dir`.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            sources: default_sources(data_dir.as_ref()),
            ..Self::default()
        }
    }

    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads overrides through `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_ENV) {
            Some(json) => serde_json::from_str(&json).map_err(|source| ConfigError::Json {
                variable: CONFIG_ENV,
                source,
            })?,
            None => Self::default(),
        };

        if let Some(json) = lookup(SOURCES_ENV) {
            let overrides: BTreeMap<String, String> =
                serde_json::from_str(&json).map_err(|source| ConfigError::Json {
                    variable: SOURCES_ENV,
                    source,
                })?;
            config.override_sources(overrides)?;
        }

        if let Some(raw) = lookup(CACHE_TTL_ENV) {
            config.cache_ttl_secs = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                variable: CACHE_TTL_ENV,
                value: raw.clone(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Replaces the locations of the named sources.
    pub fn override_sources(
        &mut self,
        overrides: BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        for (name, location) in overrides {
            if SourceKind::from_name(&name).is_none() {
                return Err(ConfigError::UnknownSource(name));
            }
            self.sources.insert(name, location);
        }
        Ok(())
    }

    /// Location configured for `kind`, if any.
    pub fn location(&self, kind: SourceKind) -> Option<&str> {
        self.sources.get(kind.name()).map(String::as_str)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self
            .sources
            .keys()
            .find(|name| SourceKind::from_name(name).is_none())
        {
            Some(name) => Err(ConfigError::UnknownSource(name.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_cover_every_source() {
        let config = MediatorConfig::default();
        for kind in SourceKind::ALL {
            assert!(config.location(kind).is_some(), "no location for {kind}");
        }
        assert_eq!(
            config.location(SourceKind::StationDirectory),
            Some(STATION_DIRECTORY_URL)
        );
        assert!(config
            .location(SourceKind::Prices)
            .unwrap()
            .ends_with("filtered_precios.csv"));
        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
        assert!(config.directory_fallback);
    }

    #[test]
    fn test_no_variables_means_defaults() {
        let config = MediatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, MediatorConfig::default());
    }

    #[test]
    fn test_source_and_ttl_overrides() {
        let config = MediatorConfig::from_lookup(lookup(&[
            (SOURCES_ENV, r#"{"MEF_precios": "https://example.org/precios.csv"}"#),
            (CACHE_TTL_ENV, " 60 "),
        ]))
        .unwrap();
        assert_eq!(
            config.location(SourceKind::Prices),
            Some("https://example.org/precios.csv")
        );
        // Untouched sources keep their defaults.
        assert_eq!(
            config.location(SourceKind::StationDirectory),
            Some(STATION_DIRECTORY_URL)
        );
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_config_json() {
        let config = MediatorConfig::from_lookup(lookup(&[(
            CONFIG_ENV,
            r#"{"target_species": "Pera", "dash_policy": "missing", "directory_fallback": false}"#,
        )]))
        .unwrap();
        assert_eq!(config.target_species, "Pera");
        assert_eq!(config.dash_policy, DashPolicy::Missing);
        assert!(!config.directory_fallback);
        assert_eq!(config.throttle(), Duration::from_millis(100));
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let result = MediatorConfig::from_lookup(lookup(&[(
            SOURCES_ENV,
            r#"{"NOT_A_SOURCE": "x.csv"}"#,
        )]));
        assert!(matches!(result, Err(ConfigError::UnknownSource(name)) if name == "NOT_A_SOURCE"));
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        let result = MediatorConfig::from_lookup(lookup(&[(SOURCES_ENV, "not json")]));
        assert!(matches!(result, Err(ConfigError::Json { variable, .. }) if variable == SOURCES_ENV));

        let result = MediatorConfig::from_lookup(lookup(&[(CACHE_TTL_ENV, "ten")]));
        assert!(matches!(result, Err(ConfigError::InvalidNumber { .. })));
    }

    #[test]
    fn test_with_data_dir() {
        let config = MediatorConfig::with_data_dir("/srv/feeds");
        assert_eq!(
            config.location(SourceKind::Temperature),
            Some(Path::new("/srv/feeds").join("inumet_temperatura_del_aire.csv").to_str().unwrap())
        );
    }
}
