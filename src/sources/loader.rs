use crate::sources::decoder::decode_table;
use crate::sources::error::SourceError;
use crate::sources::station_directory::{parse_stations, stations_frame};
use crate::sources::table::SourceTable;
use crate::types::source_kind::SourceKind;
use log::{debug, info, warn};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tokio::{fs, task};

/// Fetches upstream sources from local files or over HTTP and normalizes them
/// into [`SourceTable`]s.
pub struct SourceLoader {
    download_client: Client,
}

impl SourceLoader {
    pub fn new(request_timeout: Duration) -> Result<SourceLoader, SourceError> {
        let download_client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(SourceError::ClientBuild)?;
        Ok(SourceLoader { download_client })
    }

    /// Loads a source, degrading every failure to an empty table.
    pub async fn load(&self, kind: SourceKind, location: &str) -> SourceTable {
        match self.try_load(kind, location).await {
            Ok(table) => {
                info!(
                    "Loaded {} from {}: {} rows, {} columns",
                    kind,
                    location,
                    table.frame().height(),
                    table.frame().width()
                );
                table
            }
            Err(e) => {
                warn!("Source {} unavailable ({}): {}", kind, location, e);
                SourceTable::empty(kind)
            }
        }
    }

    /// Loads a source, reporting why it failed.
    pub async fn try_load(
        &self,
        kind: SourceKind,
        location: &str,
    ) -> Result<SourceTable, SourceError> {
        let bytes = self.fetch(location).await?;

        if kind.is_scraped() {
            let html = String::from_utf8_lossy(&bytes);
            let stations = parse_stations(&html)?;
            let frame = stations_frame(&stations).map_err(|source| SourceError::Frame { kind, source })?;
            return SourceTable::new(kind, frame);
        }

        if looks_like_html(&bytes) {
            return Err(SourceError::HtmlResponse(location.to_string()));
        }

        let (candidate, frame) = task::spawn_blocking(move || decode_table(&bytes))
            .await?
            .ok_or(SourceError::Undecodable(kind))?;
        debug!(
            "Decoded {} as {} with delimiter '{}'",
            kind,
            candidate.encoding.label(),
            candidate.delimiter as char
        );
        SourceTable::new(kind, frame)
    }

    /// Reads the raw bytes behind a location. `http://` and `https://`
    /// locations are downloaded; anything else is a local path.
    pub async fn fetch(&self, location: &str) -> Result<Vec<u8>, SourceError> {
        if !is_remote(location) {
            let path = PathBuf::from(location);
            return fs::read(&path)
                .await
                .map_err(|e| SourceError::LocalRead(path, e));
        }

        info!("Downloading data from {}", location);
        let response = self
            .download_client
            .get(location)
            .send()
            .await
            .map_err(|e| SourceError::NetworkRequest(location.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(if let Some(status) = e.status() {
                    SourceError::HttpStatus {
                        url: location.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    SourceError::NetworkRequest(location.to_string(), e)
                });
            }
        };

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::NetworkRequest(location.to_string(), e))?;
        Ok(bytes.to_vec())
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn looks_like_html(bytes: &[u8]) -> bool {
    bytes.windows(5).any(|w| w.eq_ignore_ascii_case(b"<html"))
}
