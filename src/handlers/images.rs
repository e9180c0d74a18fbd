//! Image re-hosting.
//!
//! - `GET /api/image?path=/<file>&size=<size>` - stream a TMDB image
//!
//! # Request Lifecycle
//!
//! ```text
//! Validating ──bad path──▶ 400 (no upstream call)
//!     │
//!     ▼
//! Requesting ──non-2xx───▶ upstream status + bounded excerpt
//!     │      ──unreachable▶ 502
//!     ▼
//! Streaming  ──headers committed; later failures cut the body──▶ Done
//! ```

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::HeaderValue;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use tracing::instrument;

use crate::error::{AppError, TextError};
use crate::models::ImageQuery;
use crate::state::AppState;
use crate::validation::{INVALID_PATH_MESSAGE, validate_image_request};

/// Images at a given path and size never change; cache them for a day.
pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";

/// Stream an image from the TMDB image host.
///
/// A malformed query string (for instance a repeated `path`) is treated like
/// a missing path.
#[instrument(skip(state, query))]
pub async fn proxy_image(
    State(state): State<AppState>,
    query: Result<Query<ImageQuery>, QueryRejection>,
) -> Result<Response, TextError> {
    let Query(query) = query.map_err(|_| AppError::Validation(INVALID_PATH_MESSAGE.to_string()))?;
    let request = validate_image_request(query.path.as_deref(), query.size.as_deref())?;

    let image = state.images.open(&request).await?;

    Ok((
        [
            (CONTENT_TYPE, image.content_type),
            (CACHE_CONTROL, HeaderValue::from_static(IMAGE_CACHE_CONTROL)),
        ],
        image.body,
    )
        .into_response())
}
