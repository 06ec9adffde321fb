//! Lightroom Cloud partner API: asset model, HTTP client, pagination.

pub mod asset;
pub mod client;
pub mod error;
pub mod fetch;

pub use asset::{Asset, AssetMetadata};
pub use client::LightroomClient;
pub use fetch::fetch_all;
