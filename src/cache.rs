use crate::types::global_view::GlobalView;
use log::{debug, info};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct CachedView {
    built_at: Instant,
    view: Arc<GlobalView>,
}

/// Holds the most recently built [`GlobalView`] for a fixed time-to-live.
///
/// Only one view is kept. Empty ("no data") views are never stored, so a
/// run during an upstream outage does not pin the empty result.
pub struct ViewCache {
    ttl: Duration,
    slot: Mutex<Option<CachedView>>,
}

impl ViewCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached view, if one exists and has not expired. An expired entry
    /// is evicted.
    pub async fn get(&self) -> Option<Arc<GlobalView>> {
        let mut slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(cached) if cached.built_at.elapsed() < self.ttl => Some(cached.view.clone()),
            Some(_) => {
                debug!("Cached global view expired");
                *slot = None;
                None
            }
            None => None,
        }
    }

    /// Returns the cached view, or builds one with `refresh` and stores it.
    pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Result<Arc<GlobalView>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<GlobalView, E>>,
    {
        // --- Fast path: fresh entry present ---
        if let Some(view) = self.get().await {
            debug!("Serving global view from cache");
            return Ok(view);
        }

        // --- Slow path: build outside the lock ---
        let view = Arc::new(refresh().await?);
        if view.is_empty() {
            return Ok(view);
        }

        let mut slot = self.slot.lock().await;
        match slot.as_ref() {
            // Another caller stored a fresh view while we were building.
            Some(cached) if cached.built_at.elapsed() < self.ttl => Ok(cached.view.clone()),
            _ => {
                info!("Caching global view with {} rows", view.len());
                *slot = Some(CachedView {
                    built_at: Instant::now(),
                    view: view.clone(),
                });
                Ok(view)
            }
        }
    }

    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}
