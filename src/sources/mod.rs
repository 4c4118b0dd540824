pub mod decoder;
pub mod error;
pub mod loader;
pub mod station_directory;
pub mod table;
