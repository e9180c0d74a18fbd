mod api;

pub use api::{HealthResponse, ImageQuery, ImageRequest, NowPlayingQuery};
