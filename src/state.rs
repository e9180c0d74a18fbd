//! Shared application state for Axum handlers.
//!
//! Everything here is either immutable after startup (configuration) or
//! internally reference-counted and safe to share (HTTP client pool, task
//! tracker). No request writes to shared state, so no locks are needed.
//!
//! # Structured Concurrency
//!
//! Image relays run on tasks tracked by a `tokio_util::task::TaskTracker`.
//! Call `shutdown()` after the server stops accepting connections to wait for
//! in-flight relays before exiting.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::task::TaskTracker;
use tracing::info;

use crate::config::Config;
use crate::error::AppResult;
use crate::services::{ImageService, MetadataService};
use crate::tmdb_client::TmdbClient;

/// Shared application state for Axum handlers.
///
/// Cloned for each request; all fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Metadata forwarder
    pub metadata: MetadataService,
    /// Image streaming gateway
    pub images: ImageService,
    /// Timestamp when the application started
    pub started_at: Instant,
    /// Application configuration
    pub config: Arc<Config>,
    /// Tracks spawned relay tasks for graceful shutdown
    relays: TaskTracker,
}

impl AppState {
    /// Create application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the upstream HTTP client cannot be built.
    pub fn new(config: Config) -> AppResult<Self> {
        let config = Arc::new(config);
        let client = TmdbClient::new(&config)?;
        let relays = TaskTracker::new();

        Ok(Self {
            metadata: MetadataService::new(client.clone(), config.clone()),
            images: ImageService::new(client, config.clone(), relays.clone()),
            started_at: Instant::now(),
            config,
            relays,
        })
    }

    /// Wait for in-flight image relays to finish.
    ///
    /// Every upstream read and every hand-off to the caller inside a relay is
    /// bounded by the stream idle timeout, so this cannot wait forever on a
    /// stalled upstream or on a caller that stopped reading.
    pub async fn shutdown(&self) {
        info!(in_flight = self.relays.len(), "Waiting for in-flight image relays");

        self.relays.close();
        self.relays.wait().await;

        info!("All image relays have completed");
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
