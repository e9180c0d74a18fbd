//! Helper functions for the TMDB client.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

/// Upper bound on how much of an upstream error body is read and echoed.
pub const MAX_ERROR_EXCERPT_BYTES: usize = 1024;

/// Read at most `limit` bytes of an error body and decode them lossily.
///
/// Stops pulling from `body` as soon as the limit is reached, so a huge or
/// endless error body costs at most `limit` bytes. A read error ends the
/// excerpt early; whatever was read so far is kept.
pub async fn read_excerpt<S, E>(body: S, limit: usize) -> String
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    let mut body = std::pin::pin!(body);
    let mut buf = Vec::with_capacity(limit.min(MAX_ERROR_EXCERPT_BYTES));

    while buf.len() < limit {
        match body.next().await {
            Some(Ok(chunk)) => {
                let take = chunk.len().min(limit - buf.len());
                buf.extend_from_slice(&chunk.slice(..take));
            }
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Upstream error body ended early");
                break;
            }
            None => break,
        }
    }

    String::from_utf8_lossy(&buf).trim().to_string()
}

/// Describe a transport error with its source chain and without its URL.
///
/// The metadata URL carries the credential, so it is stripped before the
/// message can reach logs or callers.
pub fn describe_error(err: reqwest::Error) -> String {
    let err = err.without_url();
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);

    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }

    message
}
