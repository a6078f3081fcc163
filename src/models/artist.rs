//! Artist-related models.

use serde::{Deserialize, Serialize};

/// An artist and the album IDs discovered by catalog expansion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArtistDescriptor {
    /// Provider artist ID.
    pub id: String,

    /// Artist display name, when the provider includes it.
    #[serde(default)]
    pub name: String,

    /// Album count the provider claims the artist has.
    pub total_albums: u32,

    /// Album IDs in listing order. Empty until expanded.
    #[serde(default)]
    pub album_ids: Vec<String>,
}

impl ArtistDescriptor {
    /// Whether expansion collected every declared album.
    pub fn is_complete(&self) -> bool {
        self.album_ids.len() >= self.total_albums as usize
    }
}
