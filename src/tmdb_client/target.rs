//! Outbound request descriptions.

use reqwest::{Method, Url};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::ImageRequest;

/// `Accept` value for metadata calls.
pub const ACCEPT_JSON: &str = "application/json";

/// `Accept` value for image calls.
pub const ACCEPT_IMAGE: &str = "image/*";

/// Query parameter carrying the TMDB credential.
const API_KEY_PARAM: &str = "api_key";

/// A fully built upstream request.
///
/// Built once from validated input and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    url: Url,
    accept: &'static str,
    endpoint: &'static str,
}

impl UpstreamTarget {
    /// `GET {api_base}/movie/now_playing?api_key=..&language=..&page=..`
    pub fn now_playing(config: &Config, api_key: &str, page: i64) -> AppResult<Self> {
        let base = format!("{}/movie/now_playing", config.tmdb_api_base);
        let page = page.to_string();
        let url = Url::parse_with_params(
            &base,
            [
                (API_KEY_PARAM, api_key),
                ("language", config.tmdb_language.as_str()),
                ("page", page.as_str()),
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to build metadata URL: {e}")))?;

        Ok(Self {
            url,
            accept: ACCEPT_JSON,
            endpoint: "now_playing",
        })
    }

    /// `GET {image_base}/{size}{path}`
    ///
    /// The resulting URL must share the image base's origin; anything else is
    /// treated as a malformed request.
    pub fn image(config: &Config, request: &ImageRequest) -> AppResult<Self> {
        let invalid = |reason: String| AppError::Validation(format!("Invalid image path: {reason}"));

        let base = Url::parse(&config.tmdb_image_base).map_err(|e| invalid(e.to_string()))?;
        let url = Url::parse(&format!(
            "{}/{}{}",
            config.tmdb_image_base, request.size, request.path
        ))
        .map_err(|e| invalid(e.to_string()))?;

        if url.origin() != base.origin() {
            return Err(invalid("resolves outside the image host".to_string()));
        }

        Ok(Self {
            url,
            accept: ACCEPT_IMAGE,
            endpoint: "image",
        })
    }

    pub fn method(&self) -> Method {
        Method::GET
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn accept(&self) -> &'static str {
        self.accept
    }

    /// Short label used in logs and metrics.
    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    /// URL safe to log: the credential is masked.
    pub fn redacted_url(&self) -> String {
        if !self.url.query_pairs().any(|(k, _)| k == API_KEY_PARAM) {
            return self.url.to_string();
        }

        let pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == API_KEY_PARAM {
                    "***".to_string()
                } else {
                    v.into_owned()
                };
                (k.into_owned(), v)
            })
            .collect();

        let mut redacted = self.url.clone();
        redacted.query_pairs_mut().clear().extend_pairs(pairs);
        redacted.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn image(path: &str, size: &str) -> ImageRequest {
        ImageRequest {
            path: path.to_string(),
            size: size.to_string(),
        }
    }

    #[test]
    fn test_image_url() {
        let target = UpstreamTarget::image(&Config::default(), &image("/abc.jpg", "w500")).unwrap();

        assert_eq!(
            target.url().as_str(),
            "https://image.tmdb.org/t/p/w500/abc.jpg"
        );
        assert_eq!(target.accept(), "image/*");
        assert_eq!(target.method(), Method::GET);
    }

    #[test]
    fn test_image_url_keeps_unknown_size() {
        let target = UpstreamTarget::image(&Config::default(), &image("/abc.jpg", "w9999")).unwrap();
        assert_eq!(
            target.url().as_str(),
            "https://image.tmdb.org/t/p/w9999/abc.jpg"
        );
    }

    #[test]
    fn test_image_url_stays_on_image_host() {
        let target =
            UpstreamTarget::image(&Config::default(), &image("//evil.example/x.jpg", "w500")).unwrap();
        assert_eq!(target.url().host_str(), Some("image.tmdb.org"));
    }

    #[test]
    fn test_now_playing_url() {
        let target = UpstreamTarget::now_playing(&Config::default(), "k3y", 2).unwrap();
        let url = target.url();

        assert_eq!(url.path(), "/3/movie/now_playing");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("api_key".to_string(), "k3y".to_string())));
        assert!(query.contains(&("language".to_string(), "en-US".to_string())));
        assert!(query.contains(&("page".to_string(), "2".to_string())));
        assert_eq!(target.accept(), "application/json");
    }

    #[test]
    fn test_now_playing_encodes_credential() {
        let target = UpstreamTarget::now_playing(&Config::default(), "a&b=c", 1).unwrap();
        let key = target
            .url()
            .query_pairs()
            .find(|(k, _)| k == "api_key")
            .map(|(_, v)| v.into_owned());
        assert_eq!(key.as_deref(), Some("a&b=c"));
    }

    #[test]
    fn test_redacted_url_masks_credential() {
        let target = UpstreamTarget::now_playing(&Config::default(), "super-secret", 1).unwrap();
        let redacted = target.redacted_url();

        assert!(!redacted.contains("super-secret"));
        assert!(redacted.contains("api_key=***") || redacted.contains("api_key=%2A%2A%2A"));
        assert!(redacted.contains("page=1"));
    }

    #[test]
    fn test_redacted_url_without_credential_unchanged() {
        let target = UpstreamTarget::image(&Config::default(), &image("/abc.jpg", "w92")).unwrap();
        assert_eq!(target.redacted_url(), target.url().as_str());
    }
}
