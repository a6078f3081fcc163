//! Data models for JioSaavn API responses.
//!
//! These are the typed descriptors the rest of the crate works with.
//! Raw provider JSON is mapped into them by [`crate::converters`].

pub mod album;
pub mod artist;
pub mod common;
pub mod playlist;
pub mod track;

// Re-exports for convenience
pub use album::AlbumDescriptor;
pub use artist::ArtistDescriptor;
pub use common::Quality;
pub use playlist::PlaylistDescriptor;
pub use track::TrackDescriptor;
