//! # MovieHub Gateway
//!
//! Server-side gateway between a browser client and TMDB:
//!
//! - **Credential hiding**: the TMDB API key is attached server-side to
//!   metadata calls and never reaches the browser
//! - **Image re-hosting**: poster and backdrop images are streamed through the
//!   gateway's own origin with backpressure, never fully buffered
//! - **Error normalization**: upstream rejections keep their status, an
//!   unreachable upstream is a 502, bad input is a 400 with no network I/O
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Request ID → Trace → CORS)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (liveness, health, now_playing, proxy_image)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Services (MetadataService, ImageService + relay)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TmdbClient (reqwest, redirects, header timeout)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  api.themoviedb.org / image.tmdb.org                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use moviehub_gateway::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let state = AppState::new(config)?;
//!     let app = build_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:10000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```bash
//! TMDB_API_KEY=your-v3-key CORS_ALLOW_ORIGIN=https://moviehub.example cargo run
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod tmdb_client;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use state::AppState;
pub use tmdb_client::TmdbClient;
