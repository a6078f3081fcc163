//! Track-related models.

use serde::{Deserialize, Serialize};

/// A single downloadable song as described by the provider.
///
/// `encrypted_media_url` is the opaque locator; see [`crate::crypto`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackDescriptor {
    /// Provider song ID.
    pub id: String,

    /// Track title.
    pub title: String,

    /// Name of the parent album.
    pub album: String,

    /// Primary artist(s) as a display string.
    pub artist: String,

    /// Encrypted media locator.
    pub encrypted_media_url: String,

    /// Duration in seconds.
    #[serde(default)]
    pub duration_secs: u32,

    /// Whether the track has explicit content.
    #[serde(default)]
    pub explicit: bool,

    /// 30 second preview URL, unused for downloads.
    #[serde(default)]
    pub preview_url: Option<String>,

    /// Release year, if known.
    #[serde(default)]
    pub year: Option<i32>,

    /// Cover image URL.
    #[serde(default)]
    pub image: Option<String>,
}

impl TrackDescriptor {
    /// Duration formatted as `m:ss`.
    pub fn duration_string(&self) -> String {
        format!("{}:{:02}", self.duration_secs / 60, self.duration_secs % 60)
    }
}
