//! The entry point: acquires every source, resolves the three branches and
//! builds the global view.

use crate::builder::GlobalViewBuilder;
use crate::cache::ViewCache;
use crate::config::MediatorConfig;
use crate::error::MediatorError;
use crate::resolvers::climate::ClimateResolver;
use crate::resolvers::error::ResolveError;
use crate::resolvers::price::PriceResolver;
use crate::resolvers::production::ProductionResolver;
use crate::sources::loader::SourceLoader;
use crate::sources::table::SourceTable;
use crate::types::frames::{MonthlyClimate, MonthlyPrice, MonthlyProduction};
use crate::types::global_view::GlobalView;
use crate::types::source_kind::SourceKind;
use bon::bon;
use log::{info, warn};
use std::sync::Arc;

/// One [`SourceTable`] per [`SourceKind`]. Sources that could not be
/// acquired hold an empty table.
#[derive(Debug, Clone)]
pub struct AcquiredSources {
    /// Indexed by the kind's position in [`SourceKind::ALL`].
    tables: [SourceTable; 7],
}

impl AcquiredSources {
    /// Every source unavailable.
    pub fn empty() -> Self {
        Self {
            tables: SourceKind::ALL.map(SourceTable::empty),
        }
    }

    /// Collects tables, later tables replacing earlier ones of the same kind.
    /// Kinds without a table stay empty.
    pub fn from_tables(tables: impl IntoIterator<Item = SourceTable>) -> Self {
        let mut sources = Self::empty();
        for table in tables {
            sources.insert(table);
        }
        sources
    }

    pub fn insert(&mut self, table: SourceTable) {
        let idx = table.kind() as usize;
        self.tables[idx] = table;
    }

    /// The table acquired for `kind`.
    pub fn table(&self, kind: SourceKind) -> &SourceTable {
        &self.tables[kind as usize]
    }

    /// Number of sources that yielded rows.
    pub fn available(&self) -> usize {
        self.tables.iter().filter(|t| !t.is_empty()).count()
    }
}

/// Integrates the climate, production and price feeds into a [`GlobalView`].
///
/// # Examples
///
/// ```rust,no_run
/// # use agroview::{Mediator, MediatorConfig, MediatorError, ViewCache};
/// # use std::time::Duration;
/// # async fn run() -> Result<(), MediatorError> {
/// let mediator = Mediator::builder()
///     .config(MediatorConfig::with_data_dir("data"))
///     .cache(ViewCache::new(Duration::from_secs(600)))
///     .build()?;
///
/// let view = mediator.global_view().await?;
/// println!("{}", view.to_json().unwrap_or_default());
/// # Ok(())
/// # }
/// ```
pub struct Mediator {
    config: MediatorConfig,
    loader: SourceLoader,
    cache: Option<ViewCache>,
}

#[bon]
impl Mediator {
    /// Creates a mediator. Without a `config` the defaults apply; without a
    /// `cache` every [`Mediator::global_view`] call rebuilds the view.
    #[builder]
    pub fn new(
        config: Option<MediatorConfig>,
        cache: Option<ViewCache>,
    ) -> Result<Self, MediatorError> {
        let config = config.unwrap_or_default();
        let loader = SourceLoader::new(config.request_timeout())?;
        Ok(Self {
            config,
            loader,
            cache,
        })
    }

    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    /// Fetches every source in turn, pausing for the configured throttle
    /// between two fetches. Never fails: unavailable sources come back empty.
    pub async fn acquire(&self) -> AcquiredSources {
        let mut sources = AcquiredSources::empty();
        for (idx, kind) in SourceKind::ALL.into_iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(self.config.throttle()).await;
            }
            let Some(location) = self.config.location(kind) else {
                warn!("No location configured for {}, treating it as unavailable", kind);
                continue;
            };
            sources.insert(self.loader.load(kind, location).await);
        }
        info!(
            "Acquired {} of {} sources",
            sources.available(),
            SourceKind::ALL.len()
        );
        sources
    }

    /// Resolves and joins already acquired sources. A resolver that fails is
    /// logged and its branch left empty; only a failure while joining the
    /// branches is returned.
    pub fn integrate(&self, sources: &AcquiredSources) -> Result<GlobalView, MediatorError> {
        let climate = ClimateResolver::new(self.config.directory_fallback)
            .resolve(
                &[
                    sources.table(SourceKind::Precipitation),
                    sources.table(SourceKind::Temperature),
                    sources.table(SourceKind::Humidity),
                ],
                sources.table(SourceKind::StationDirectory),
            )
            .unwrap_or_else(|e| degrade("climate", e, MonthlyClimate::empty()));

        let production = ProductionResolver::from_config(&self.config)
            .resolve(sources.table(SourceKind::Production))
            .unwrap_or_else(|e| degrade("production", e, MonthlyProduction::empty()));

        let price = PriceResolver::new()
            .resolve(
                sources.table(SourceKind::Prices),
                sources.table(SourceKind::Establishments),
            )
            .unwrap_or_else(|e| degrade("price", e, MonthlyPrice::empty()));

        let view = GlobalViewBuilder::new().build(&climate, &production, &price)?;
        if view.is_empty() {
            warn!("No source produced data, returning an empty view");
        }
        Ok(view)
    }

    /// Acquires every source and integrates them.
    pub async fn run(&self) -> Result<GlobalView, MediatorError> {
        let sources = self.acquire().await;
        self.integrate(&sources)
    }

    /// The global view, served from the injected [`ViewCache`] while it is
    /// fresh.
    pub async fn global_view(&self) -> Result<Arc<GlobalView>, MediatorError> {
        match &self.cache {
            Some(cache) => cache.get_or_refresh(|| self.run()).await,
            None => Ok(Arc::new(self.run().await?)),
        }
    }

    /// Drops the cached view, if any, so the next access rebuilds it.
    pub async fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate().await;
        }
    }
}

fn degrade<T>(branch: &str, error: ResolveError, empty: T) -> T {
    warn!("The {} branch failed and is left empty: {}", branch, error);
    empty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::region::Region;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    const STATION_PAGE: &str = r#"<html><script>
        var estaciones = {"estaciones": [
            {"NombreEstacion": "A", "Departamento": "Canelones"},
            {"NombreEstacion": "Melilla", "Departamento": "Montevideo"}
        ]};
    </script></html>"#;

    const PRECIPITATION: &str = "fecha;estacion_id;precip_horario\n\
        2023-01-01 00:00:00;A;1,5\n\
        2023-01-01 01:00:00;A;2,5\n\
        2023-01-01 00:00:00;B;7\n\
        2023-02-01 00:00:00;Melilla;0,2\n";

    const TEMPERATURE: &str = "fecha;estacion_id;temp_aire\n\
        2023-01-01 00:00:00;A;20\n\
        2023-01-01 01:00:00;A;22\n\
        2023-02-01 00:00:00;Melilla;25,5\n";

    const HUMIDITY: &str = "fecha,estacion_id,hum_relativa\n\
        2023-01-01 00:00:00,A,80\n";

    const PRICES: &str = "establecimiento;fecha;precio\n\
        1;2023-01-10;40\n\
        1;2023-01-20;44,5\n\
        2;2023-01-15;100\n";

    const ESTABLISHMENTS: &str = "idestablecimientos;iddepto;depto\n\
        1;3;CANELONES\n\
        2;10;Montevideo\n";

    const PRODUCTION: &str = "grupo;especie;unidad;ene23;feb23\n\
        Frutas;Manzana Fuji;kg;1.234,5;-\n\
        Frutas;Pera;kg;10;10\n";

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn write(self, kind: SourceKind, contents: &str) -> Self {
            let name = kind.default_file_name().unwrap_or("estaciones.html");
            fs::write(self.dir.path().join(name), contents).unwrap();
            self
        }

        fn full(self) -> Self {
            self.write(SourceKind::Precipitation, PRECIPITATION)
                .write(SourceKind::Temperature, TEMPERATURE)
                .write(SourceKind::Humidity, HUMIDITY)
                .write(SourceKind::StationDirectory, STATION_PAGE)
                .write(SourceKind::Prices, PRICES)
                .write(SourceKind::Establishments, ESTABLISHMENTS)
                .write(SourceKind::Production, PRODUCTION)
        }

        fn config(&self) -> MediatorConfig {
            let mut config = MediatorConfig::with_data_dir(self.dir.path());
            config.throttle_ms = 0;
            let page = self.dir.path().join("estaciones.html");
            config.override_sources(BTreeMap::from([(
                SourceKind::StationDirectory.name().to_string(),
                page.to_string_lossy().into_owned(),
            )]))
            .unwrap();
            config
        }

        fn mediator(&self) -> Mediator {
            Mediator::builder().config(self.config()).build().unwrap()
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }
    }

    #[tokio::test]
    async fn test_full_integration() {
        let fixture = Fixture::new().full();
        let view = fixture.mediator().run().await.unwrap();

        assert!(!view.region_fallback);
        let keys: Vec<(String, Option<String>)> = view
            .rows
            .iter()
            .map(|row| (row.month.to_string(), row.region.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2023-01".to_string(), Some("Canelones".to_string())),
                ("2023-01".to_string(), Some("Montevideo".to_string())),
                ("2023-02".to_string(), Some("Montevideo".to_string())),
            ]
        );

        // Station "B" is not in the directory, so its 7 mm are not counted.
        let canelones = &view.rows[0];
        assert_eq!(canelones.precip_total, Some(4.0));
        assert_eq!(canelones.temp_mean, Some(21.0));
        assert_eq!(canelones.humidity_mean, Some(80.0));
        assert_eq!(canelones.total_quantity, Some(1234.5));
        assert_eq!(canelones.mean_price, Some(42.25));
        assert_eq!(canelones.provenance, "climate, production, price");

        let montevideo_january = &view.rows[1];
        assert_eq!(montevideo_january.precip_total, None);
        assert_eq!(montevideo_january.mean_price, Some(100.0));
        assert_eq!(montevideo_january.provenance, "price");

        let montevideo_february = &view.rows[2];
        assert_eq!(montevideo_february.temp_mean, Some(25.5));
        assert_eq!(montevideo_february.total_quantity, Some(0.0));
        assert_eq!(montevideo_february.provenance, "climate, production");

        for row in &view.rows {
            let region = row.region.as_deref().unwrap();
            assert!(Region::is_canonical(region), "{region} is not a region");
        }
    }

    #[tokio::test]
    async fn test_missing_directory_falls_back_to_station_ids() {
        let fixture = Fixture::new()
            .write(SourceKind::Precipitation, PRECIPITATION)
            .write(SourceKind::Temperature, TEMPERATURE);
        let view = fixture_view(&fixture).await;

        assert!(view.region_fallback);
        let b = view
            .rows
            .iter()
            .find(|row| row.region.as_deref() == Some("B"))
            .unwrap();
        assert_eq!(b.precip_total, Some(7.0));
        assert!(view.to_json().unwrap().contains("\"region_fallback\":true"));
    }

    #[tokio::test]
    async fn test_climate_only_leaves_other_columns_null() {
        let fixture = Fixture::new()
            .write(SourceKind::Precipitation, PRECIPITATION)
            .write(SourceKind::Temperature, TEMPERATURE)
            .write(SourceKind::Humidity, HUMIDITY)
            .write(SourceKind::StationDirectory, STATION_PAGE);
        let view = fixture_view(&fixture).await;

        assert_eq!(view.len(), 2);
        for row in &view.rows {
            assert!(row.has_climate());
            assert_eq!(row.total_quantity, None);
            assert_eq!(row.mean_price, None);
            assert_eq!(row.provenance, "climate");
        }
    }

    #[tokio::test]
    async fn test_production_only_totals() {
        let fixture = Fixture::new().write(SourceKind::Production, PRODUCTION);
        let view = fixture_view(&fixture).await;

        let totals: Vec<(String, Option<f64>)> = view
            .rows
            .iter()
            .map(|row| (row.month.to_string(), row.total_quantity))
            .collect();
        assert_eq!(
            totals,
            vec![
                ("2023-01".to_string(), Some(1234.5)),
                ("2023-02".to_string(), Some(0.0)),
            ]
        );
        assert!(view.rows.iter().all(|row| row.region.is_none()));
    }

    #[tokio::test]
    async fn test_nothing_available_is_no_data() {
        let fixture = Fixture::new();
        let view = fixture_view(&fixture).await;
        assert!(view.is_empty());
        assert_eq!(view.to_json().unwrap(), "{\"data\":[]}");
    }

    #[tokio::test]
    async fn test_runs_are_byte_identical() {
        let fixture = Fixture::new().full();
        let mediator = fixture.mediator();
        let first = mediator.run().await.unwrap().to_json().unwrap();
        let second = mediator.run().await.unwrap().to_json().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_global_view_is_cached_until_invalidated() {
        let fixture = Fixture::new().full();
        let mediator = Mediator::builder()
            .config(fixture.config())
            .cache(ViewCache::new(Duration::from_secs(600)))
            .build()
            .unwrap();

        let first = mediator.global_view().await.unwrap();
        // Changing the snapshot does not show through a fresh cache entry.
        fs::remove_file(fixture.path().join("filtered_precios.csv")).unwrap();
        let second = mediator.global_view().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        mediator.invalidate_cache().await;
        let third = mediator.global_view().await.unwrap();
        assert!(third.rows.iter().all(|row| row.mean_price.is_none()));
    }

    #[test]
    fn test_sources_are_stored_by_kind() {
        let prices = SourceTable::new(
            SourceKind::Prices,
            polars::df!("establecimiento" => ["1"], "precio" => ["40"]).unwrap(),
        )
        .unwrap();
        let sources = AcquiredSources::from_tables([prices]);

        assert_eq!(sources.available(), 1);
        assert_eq!(sources.table(SourceKind::Prices).kind(), SourceKind::Prices);
        assert_eq!(sources.table(SourceKind::Prices).frame().height(), 1);
        assert!(sources.table(SourceKind::Production).is_empty());
        assert_eq!(
            sources.table(SourceKind::Production).kind(),
            SourceKind::Production
        );
    }

    #[test]
    fn test_integrate_is_pure() {
        let mediator = Mediator::builder().build().unwrap();
        let view = mediator.integrate(&AcquiredSources::empty()).unwrap();
        assert!(view.is_empty());
    }

    async fn fixture_view(fixture: &Fixture) -> GlobalView {
        fixture.mediator().run().await.unwrap()
    }
}
