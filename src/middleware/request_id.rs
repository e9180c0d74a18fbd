//! Request ID middleware.
//!
//! - Accepts a caller-supplied `X-Request-Id` if it is short printable ASCII
//! - Otherwise generates a UUIDv4
//! - Echoes the ID on every response, including streamed images and errors
//! - Wraps the rest of the request in a `request` span carrying the ID, so
//!   relay logs emitted after the handler returns still carry it
//!
//! ```bash
//! curl -i -H "X-Request-Id: poster-debug-1" "http://localhost:10000/api/image?path=/abc.jpg"
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::http::header::HeaderValue;
use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{Instrument, info_span};
use uuid::Uuid;

/// Header name for request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied ID that is propagated as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request ID layer for Tower middleware stack.
#[derive(Clone, Default)]
pub struct RequestIdLayer;

impl RequestIdLayer {
    /// Create a new request ID layer.
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// Request ID service wrapper.
#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestIdService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let request_id = accepted_request_id(&req).unwrap_or_else(generate_request_id);
        req.headers_mut()
            .insert(REQUEST_ID_HEADER, request_id.clone());

        let span = info_span!(
            "request",
            request_id = request_id.to_str().unwrap_or("-"),
            method = %req.method(),
            uri = %req.uri().path(),
        );

        // Take the service that was driven to readiness, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(
            async move {
                let mut response = inner.call(req).await?;
                response
                    .headers_mut()
                    .insert(REQUEST_ID_HEADER, request_id);
                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Caller-supplied ID, if it is safe to propagate.
fn accepted_request_id<B>(req: &Request<B>) -> Option<HeaderValue> {
    let value = req.headers().get(REQUEST_ID_HEADER)?;
    let text = value.to_str().ok()?;

    let acceptable = !text.is_empty()
        && text.len() <= MAX_REQUEST_ID_LEN
        && text.bytes().all(|b| b.is_ascii_graphic());

    acceptable.then(|| value.clone())
}

fn generate_request_id() -> HeaderValue {
    // A hyphenated UUID is always a valid header value.
    HeaderValue::from_str(&Uuid::new_v4().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}
