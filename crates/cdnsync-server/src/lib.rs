//! cdnsync server: scheduled CDN data imports, cache purges, and a
//! read-only HTTP API over the stored snapshots.

pub mod api;
pub mod bootstrap;
pub mod lifecycle;
pub mod middleware;
pub mod scheduler;
