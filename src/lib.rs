mod builder;
mod cache;
mod config;
mod error;
mod mediator;
mod parsing;
mod resolvers;
mod sources;
mod types;
mod utils;

pub use error::{ConfigError, MediatorError};
pub use mediator::*;

pub use builder::GlobalViewBuilder;
pub use cache::ViewCache;
pub use config::{MediatorConfig, CACHE_TTL_ENV, CONFIG_ENV, SOURCES_ENV};
pub use parsing::{parse_decimal, parse_quantity, parse_timestamp, DashPolicy, Quantity};

pub use types::frames::*;
pub use types::global_view::*;
pub use types::month::{Month, ParseMonthError};
pub use types::region::Region;
pub use types::source_kind::{
    Aggregation, MetricKind, SourceKind, PROVENANCE_COLUMN, STATION_DIRECTORY_URL,
};
pub use types::station::Station;

pub use resolvers::climate::ClimateResolver;
pub use resolvers::price::PriceResolver;
pub use resolvers::production::ProductionResolver;
pub use sources::decoder::{decode_table, CsvCandidate, TextEncoding, DELIMITERS};
pub use sources::loader::SourceLoader;
pub use sources::station_directory::{parse_stations, stations_frame};
pub use sources::table::{normalize_column_name, SourceTable};

pub use resolvers::error::ResolveError;
pub use sources::error::SourceError;
