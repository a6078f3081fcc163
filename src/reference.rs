//! Classification of user-supplied JioSaavn links.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Album,
    Artist,
    Playlist,
    Song,
    Unknown,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Album => "album",
            MediaKind::Artist => "artist",
            MediaKind::Playlist => "playlist",
            MediaKind::Song => "song",
            MediaKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A link together with its classified kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    url: String,
    kind: MediaKind,
}

impl MediaReference {
    /// Classify `url` and wrap it.
    pub fn parse<S: Into<String>>(url: S) -> Self {
        let url = url.into();
        let kind = classify(&url);
        Self { url, kind }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// The provider token (trailing path segment) of this link.
    pub fn token(&self) -> Option<&str> {
        link_token(&self.url)
    }
}

/// Determine which resolution path a link takes.
///
/// Path segments are matched exactly. When several are present the order
/// is album, artist, playlist/featured, song.
pub fn classify(url: &str) -> MediaKind {
    let segments: Vec<&str> = url.split('/').collect();
    let has = |keyword: &str| segments.iter().any(|s| *s == keyword);

    if has("album") {
        MediaKind::Album
    } else if has("artist") {
        MediaKind::Artist
    } else if has("playlist") || has("featured") {
        MediaKind::Playlist
    } else if has("song") {
        MediaKind::Song
    } else {
        MediaKind::Unknown
    }
}

/// Extract the trailing path segment of a link, ignoring query string,
/// fragment and a trailing slash.
pub fn link_token(url: &str) -> Option<&str> {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/');

    path.rsplit('/').next().filter(|t| !t.is_empty())
}
