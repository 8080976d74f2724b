//! Remote music services
//!
//! - aggregator: track search, audio URLs and lyrics, rate limited
//! - qqmusic: song ids, album covers and fallback lyrics
//! - rankings: chart listing
//! - resolve: combines aggregator and qqmusic and turns failures into "unavailable"
//! - download: saves a resolved stream to disk

pub mod aggregator;
pub mod download;
pub mod models;
pub mod qqmusic;
pub mod rankings;
pub mod rate_limit;
pub mod resolve;

pub use models::{Cover, Track};
pub use resolve::Resolver;
