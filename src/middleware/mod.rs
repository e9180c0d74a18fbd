//! HTTP middleware.
//!
//! - **Request ID**: generation and propagation of `X-Request-Id` so a caller
//!   report can be matched to gateway and upstream logs
//!
//! ```text
//! Request → Request ID → Trace → CORS → Handler → Response (+ X-Request-Id)
//! ```

pub mod request_id;

pub use request_id::{REQUEST_ID_HEADER, RequestIdLayer};
