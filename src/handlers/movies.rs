//! Metadata forwarding.
//!
//! - `GET /api/movies/now_playing?page=<n>` - TMDB "now playing" listing
//!
//! The credential never leaves the gateway: the caller supplies only the page.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::HeaderValue;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use tracing::instrument;

use crate::error::AppResult;
use crate::models::NowPlayingQuery;
use crate::state::AppState;
use crate::validation::parse_page;

/// Listings change during the day but not by the second.
pub const NOW_PLAYING_CACHE_CONTROL: &str = "public, max-age=60";

/// Forward a "now playing" page.
///
/// Missing, repeated, or non-numeric `page` means page 1. On success the upstream JSON
/// is returned unchanged with status 200.
#[instrument(skip(state, query))]
pub async fn now_playing(
    State(state): State<AppState>,
    query: Result<Query<NowPlayingQuery>, QueryRejection>,
) -> AppResult<Response> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let page = parse_page(query.page.as_deref());
    let body = state.metadata.now_playing(page).await?;

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (CACHE_CONTROL, HeaderValue::from_static(NOW_PLAYING_CACHE_CONTROL)),
        ],
        body,
    )
        .into_response())
}
