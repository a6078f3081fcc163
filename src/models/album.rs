//! Album-related models.

use serde::{Deserialize, Serialize};

use super::track::TrackDescriptor;

/// Full album metadata including its ordered track list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlbumDescriptor {
    /// Provider album ID.
    pub id: String,

    /// Album display name.
    pub name: String,

    /// Primary artist(s); used as the top-level download folder.
    pub primary_artists: String,

    /// Release year, if known.
    #[serde(default)]
    pub year: Option<i32>,

    /// Cover image URL.
    #[serde(default)]
    pub image: Option<String>,

    /// Tracks in album order.
    #[serde(default)]
    pub tracks: Vec<TrackDescriptor>,
}

impl AlbumDescriptor {
    /// Number of tracks on the album.
    pub fn total_tracks(&self) -> usize {
        self.tracks.len()
    }
}
