//! Client for purging a pull zone's cache through the CDN's REST API.

pub mod client;
pub mod error;

pub use client::{PurgeClient, PurgeConfig};
pub use error::PurgeError;
