//! Network clients.
//!
//! This module provides two clients:
//! - [`SaavnApi`]: metadata queries against the provider's `api.php`
//! - [`HttpMediaSource`]: streaming retrieval of decoded media URLs

pub mod client;
pub mod media;

pub use client::SaavnApi;
pub use media::{ByteStream, HttpMediaSource, MediaBody, MediaSource};
