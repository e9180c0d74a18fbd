mod health;
mod images;
mod movies;

pub use health::{health_check, liveness};
pub use images::{IMAGE_CACHE_CONTROL, proxy_image};
pub use movies::{NOW_PLAYING_CACHE_CONTROL, now_playing};
