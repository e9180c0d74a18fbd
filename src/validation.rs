//! Validation of the untrusted query inputs used to build outbound URLs.
//!
//! The image path is the only caller-controlled part of the image URL that
//! could redirect the gateway to another host, so it must be rooted (`/...`).
//! Sizes outside [`KNOWN_IMAGE_SIZES`] are passed through unchanged; the image
//! host decides whether they exist.

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::ImageRequest;

// =============================================================================
// Validation Constants
// =============================================================================

/// Renditions published by the TMDB image host.
pub const KNOWN_IMAGE_SIZES: [&str; 7] = ["w92", "w154", "w185", "w342", "w500", "w780", "original"];

/// Size used when the caller does not ask for one.
pub const DEFAULT_IMAGE_SIZE: &str = "w500";

/// Page used when the caller omits `page` or sends something non-numeric.
pub const DEFAULT_PAGE: i64 = 1;

/// Message returned for a missing or unrooted image path.
pub const INVALID_PATH_MESSAGE: &str = r#"Invalid "path". It must start with "/"."#;

/// Validate and normalize the image query.
///
/// Rules:
/// - `path` must be present and start with `/`
/// - `size` defaults to [`DEFAULT_IMAGE_SIZE`] when absent or empty
/// - any other `size` is kept verbatim
///
/// Pure: performs no I/O.
pub fn validate_image_request(raw_path: Option<&str>, raw_size: Option<&str>) -> AppResult<ImageRequest> {
    let path = match raw_path {
        Some(p) if p.starts_with('/') => p,
        _ => return Err(AppError::Validation(INVALID_PATH_MESSAGE.to_string())),
    };

    let size = raw_size
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_IMAGE_SIZE);

    if !is_known_image_size(size) {
        debug!(size, "Forwarding unrecognized image size");
    }

    Ok(ImageRequest {
        path: path.to_string(),
        size: size.to_string(),
    })
}

/// Check whether `size` is one of the published renditions.
pub fn is_known_image_size(size: &str) -> bool {
    KNOWN_IMAGE_SIZES.contains(&size)
}

/// Parse the `page` query parameter.
///
/// Only integers are pages. Fractional or exponent forms such as `2.5` or
/// `1e2` fall back to [`DEFAULT_PAGE`] like any other non-integer, so the
/// outbound `page` is always an integer. No range check: the value is
/// forwarded and TMDB is authoritative.
pub fn parse_page(raw: Option<&str>) -> i64 {
    raw.and_then(|p| p.trim().parse().ok())
        .unwrap_or(DEFAULT_PAGE)
}
