use std::sync::Arc;

use bytes::Bytes;
use serde::de::IgnoredAny;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::tmdb_client::{TmdbClient, UpstreamTarget};

/// Error returned while `TMDB_API_KEY` is unset.
pub const MISSING_CREDENTIAL_MESSAGE: &str = "Missing TMDB_API_KEY env variable";

/// Forwards TMDB metadata listings, keeping the credential server-side.
#[derive(Clone)]
pub struct MetadataService {
    client: TmdbClient,
    config: Arc<Config>,
}

impl MetadataService {
    /// Create a new metadata service.
    pub fn new(client: TmdbClient, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    /// Fetch one page of "now playing" movies.
    ///
    /// Returns the upstream JSON document byte-for-byte. The credential is
    /// checked before any network I/O so a misconfigured deployment fails
    /// with a clear 500 instead of an upstream 401. A body that stalls is a
    /// 502 like any other network failure.
    #[instrument(skip(self))]
    pub async fn now_playing(&self, page: i64) -> AppResult<Bytes> {
        let api_key = self
            .config
            .tmdb_api_key
            .as_deref()
            .ok_or_else(|| AppError::ConfigError(MISSING_CREDENTIAL_MESSAGE.to_string()))?;

        let target = UpstreamTarget::now_playing(&self.config, api_key, page)?;
        let response = self.client.fetch(&target).await?;

        let body = response.bytes().await?;

        serde_json::from_slice::<IgnoredAny>(&body)
            .map_err(|e| AppError::Internal(format!("TMDB returned malformed JSON: {e}")))?;

        debug!(bytes = body.len(), "Forwarding now_playing listing");
        Ok(body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_credential_fails_before_network() {
        // An unroutable base would fail with a network error if it were contacted.
        let config = Arc::new(Config {
            tmdb_api_key: None,
            tmdb_api_base: "http://127.0.0.1:9/3".to_string(),
            ..Config::default()
        });
        let service = MetadataService::new(TmdbClient::new(&config).unwrap(), config);

        let err = service.now_playing(1).await.unwrap_err();
        assert!(matches!(err, AppError::ConfigError(ref msg) if msg == MISSING_CREDENTIAL_MESSAGE));
    }
}
