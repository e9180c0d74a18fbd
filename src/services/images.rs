use std::sync::Arc;

use axum::body::Body;
use axum::http::HeaderValue;
use tokio_util::task::TaskTracker;
use tracing::instrument;

use super::relay::spawn_relay;
use crate::config::Config;
use crate::error::AppResult;
use crate::models::ImageRequest;
use crate::tmdb_client::{TmdbClient, UpstreamTarget};

/// Content type used when the image host does not send one.
pub const DEFAULT_IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Image whose headers are known and whose body is being relayed.
pub struct ImageStream {
    pub content_type: HeaderValue,
    pub body: Body,
}

/// Re-hosts TMDB images by streaming them through the gateway.
#[derive(Clone)]
pub struct ImageService {
    client: TmdbClient,
    config: Arc<Config>,
    /// Relay tasks, awaited on shutdown
    relays: TaskTracker,
}

impl ImageService {
    /// Create a new image service. Relay tasks are spawned on `relays`.
    pub fn new(client: TmdbClient, config: Arc<Config>, relays: TaskTracker) -> Self {
        Self {
            client,
            config,
            relays,
        }
    }

    /// Request `image` upstream and start relaying its body.
    ///
    /// Upstream and network failures are returned before anything is
    /// committed to the caller. Once this returns `Ok`, failures can only end
    /// the body early.
    #[instrument(skip(self), fields(path = %image.path, size = %image.size))]
    pub async fn open(&self, image: &ImageRequest) -> AppResult<ImageStream> {
        let target = UpstreamTarget::image(&self.config, image)?;
        let response = self.client.fetch(&target).await?;

        let content_type = response
            .content_type()
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_IMAGE_CONTENT_TYPE));

        let body = spawn_relay(
            &self.relays,
            response.into_body_stream(),
            self.config.relay_buffer_chunks,
            self.config.stream_idle_timeout,
        );

        Ok(ImageStream { content_type, body })
    }
}
