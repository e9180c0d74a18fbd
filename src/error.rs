use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Gateway error taxonomy, normalized onto a fixed set of HTTP statuses.
///
/// | Variant       | Status                | Network attempted |
/// |---------------|-----------------------|-------------------|
/// | `Validation`  | 400                   | no                |
/// | `ConfigError` | 500                   | no                |
/// | `Upstream`    | upstream's own status | yes               |
/// | `Network`     | 502                   | yes               |
/// | `Internal`    | 500                   | maybe             |
///
/// Failures after an image response has been committed never become an
/// `AppError`; they are reported through [`crate::services::RelayOutcome`].
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("TMDB responded {status}: {details}")]
    Upstream { status: StatusCode, details: String },

    #[error("Upstream unreachable: {0}")]
    Network(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status the caller sees for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream { status, .. } => *status,
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::ConfigError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render as the `{error, details}` envelope used by the metadata endpoint.
    fn json_body(&self) -> ErrorBody {
        match self {
            AppError::Validation(msg) => ErrorBody::new("Invalid request", Some(msg.clone())),
            AppError::ConfigError(msg) => ErrorBody::new(msg, None),
            AppError::Upstream { details, .. } => ErrorBody::new("TMDB error", Some(details.clone())),
            AppError::Network(msg) | AppError::Internal(msg) => {
                ErrorBody::new("Proxy failed", Some(msg.clone()))
            }
        }
    }

    /// Render as the short diagnostic line used by the image endpoint.
    fn text_body(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Upstream { status, details } => {
                format!("TMDB responded {}: {details}", status.as_u16())
            }
            AppError::Network(_) => "Bad gateway: failed to fetch TMDB image.".to_string(),
            AppError::ConfigError(_) | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    fn log(&self) {
        match self {
            AppError::Validation(_) => tracing::debug!(error = %self, "Rejected request"),
            AppError::Upstream { status, .. } => {
                tracing::warn!(status = status.as_u16(), error = %self, "Upstream rejected request")
            }
            AppError::Network(_) | AppError::ConfigError(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed")
            }
        }
    }
}

/// Error envelope for JSON endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    fn new(error: &str, details: Option<String>) -> Self {
        Self {
            error: error.to_string(),
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        (self.status(), axum::Json(self.json_body())).into_response()
    }
}

/// Plain-text rendering of an [`AppError`], for endpoints whose success body
/// is binary and whose callers (`<img>` tags) never parse JSON.
#[derive(Debug)]
pub struct TextError(pub AppError);

impl From<AppError> for TextError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for TextError {
    fn into_response(self) -> Response {
        self.0.log();
        (
            self.0.status(),
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.0.text_body(),
        )
            .into_response()
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ConfigError("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Network("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_status_passthrough() {
        for code in [401u16, 403, 404, 429, 500, 503] {
            let status = StatusCode::from_u16(code).unwrap();
            let err = AppError::Upstream {
                status,
                details: "nope".into(),
            };
            assert_eq!(err.status(), status);
        }
    }

    #[tokio::test]
    async fn test_missing_credential_json_has_no_details() {
        let response =
            AppError::ConfigError("Missing TMDB_API_KEY env variable".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body, serde_json::json!({"error": "Missing TMDB_API_KEY env variable"}));
    }

    #[tokio::test]
    async fn test_upstream_json_envelope() {
        let response = AppError::Upstream {
            status: StatusCode::UNAUTHORIZED,
            details: r#"{"status_message":"Invalid API key"}"#.into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["error"], "TMDB error");
        assert_eq!(body["details"], r#"{"status_message":"Invalid API key"}"#);
    }

    #[tokio::test]
    async fn test_network_text_body_hides_cause() {
        let response = TextError(AppError::Network("dns error: no such host".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            body_string(response).await,
            "Bad gateway: failed to fetch TMDB image."
        );
    }

    #[tokio::test]
    async fn test_upstream_text_body() {
        let response = TextError(AppError::Upstream {
            status: StatusCode::NOT_FOUND,
            details: "Not Found".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "TMDB responded 404: Not Found");
    }
}
