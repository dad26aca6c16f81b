//! One-time initialization of the map backend.
//!
//! The backend is loaded at most once per [`MapContext`]. Callers that race
//! on first use share the same load; a failed load leaves the context empty
//! so the next caller tries again.

use std::future::Future;

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapInitError {
    #[error("map API key is missing")]
    MissingApiKey,

    #[error("map backend failed to load: {0}")]
    Load(String),
}

/// Idempotent, retryable one-shot initializer.
#[derive(Debug)]
pub struct InitState<T> {
    cell: OnceCell<T>,
}

impl<T> Default for InitState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InitState<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Run `init` unless a previous call already succeeded.
    ///
    /// Concurrent callers wait for the in-flight `init`. An error is
    /// returned to the caller whose `init` failed and is not remembered.
    pub async fn ensure_initialized<F, Fut, E>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cell.get_or_try_init(init).await
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

/// Application-owned map state: credentials and the loaded backend.
#[derive(Debug)]
pub struct MapContext<B> {
    api_key: Option<String>,
    backend: InitState<B>,
}

impl<B> MapContext<B> {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            backend: InitState::new(),
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Load the backend with `load(api_key)` if it is not loaded yet.
    pub async fn ensure_initialized<F, Fut>(&self, load: F) -> Result<&B, MapInitError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<B, MapInitError>>,
    {
        if let Some(backend) = self.backend.get() {
            return Ok(backend);
        }

        let Some(key) = self.api_key.clone() else {
            error!("Map API key is missing");
            return Err(MapInitError::MissingApiKey);
        };

        let backend = self
            .backend
            .ensure_initialized(|| async move {
                let loaded = load(key).await;
                match &loaded {
                    Ok(_) => info!("Map backend initialized"),
                    Err(e) => error!(error = %e, "Map backend failed to initialize"),
                }
                loaded
            })
            .await?;
        Ok(backend)
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.get()
    }
}
