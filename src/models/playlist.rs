//! Playlist-related models.

use serde::{Deserialize, Serialize};

use super::track::TrackDescriptor;

/// A user or editorial playlist with its tracks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlaylistDescriptor {
    /// Provider list ID.
    pub id: String,

    /// Playlist name.
    pub name: String,

    /// Tracks in playlist order.
    #[serde(default)]
    pub tracks: Vec<TrackDescriptor>,
}
