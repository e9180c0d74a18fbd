use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query string of `GET /api/movies/now_playing`.
///
/// `page` stays textual so a non-numeric value falls back to page 1 instead of
/// being rejected by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct NowPlayingQuery {
    pub page: Option<String>,
}

/// Raw, untrusted query string of `GET /api/image`.
#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    /// File path on the image host, e.g. `/kqjL17yufvn9OVLyXYpvtyrFfak.jpg`
    pub path: Option<String>,
    /// Rendition size, e.g. `w500` or `original`
    pub size: Option<String>,
}

/// Image request that passed validation.
///
/// `path` always starts with `/`, so appending it to the size segment can
/// never change the host of the outbound URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub path: String,
    pub size: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests
    pub status: String,
    /// Crate version
    pub version: String,
    /// Whether `TMDB_API_KEY` is set; the metadata endpoint answers 500 without it
    pub credential_configured: bool,
    /// Seconds since startup
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}
