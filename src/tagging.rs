//! Audio metadata tagging utilities.
//!
//! Downloaded `.m4a` files carry no tags. After a successful download the
//! track title, artist, album, year and cover art are embedded as MP4 ilst
//! atoms. Tagging is best effort: failures are logged, never returned.

use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::tag::{Accessor, Tag, TagExt};
use reqwest::Client;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::TrackDescriptor;

/// Metadata to embed in audio files.
#[derive(Debug, Clone, Default)]
pub struct AudioMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Track number and total tracks on the album.
    pub track_number: Option<u32>,
    pub total_tracks: Option<u32>,
    pub year: Option<i32>,
    /// Cover art as JPEG or PNG bytes.
    pub cover_art: Option<Vec<u8>>,
}

impl AudioMetadata {
    /// Create new empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed title, artist, album and year from a track.
    pub fn from_track(track: &TrackDescriptor) -> Self {
        let mut metadata = Self::new()
            .with_title(&track.title)
            .with_artist(&track.artist)
            .with_album(&track.album);
        if let Some(year) = track.year {
            metadata = metadata.with_year(year);
        }
        metadata
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist<S: Into<String>>(mut self, artist: S) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album<S: Into<String>>(mut self, album: S) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set track number and total.
    pub fn with_track(mut self, number: u32, total: Option<u32>) -> Self {
        self.track_number = Some(number);
        self.total_tracks = total;
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Set cover art from image bytes.
    pub fn with_cover_art(mut self, cover: Vec<u8>) -> Self {
        self.cover_art = Some(cover);
        self
    }
}

/// Write metadata to an audio file.
///
/// Blocking; run it on a blocking thread from async code.
pub fn write_metadata<P: AsRef<Path>>(path: P, metadata: &AudioMetadata) -> Result<()> {
    let path = path.as_ref();
    debug!("Writing metadata to: {}", path.display());

    let mut tagged_file = match lofty::read_from_path(path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Could not read {} for tagging: {}", path.display(), e);
            return Ok(());
        }
    };

    if tagged_file.primary_tag().is_none() {
        let tag_type = tagged_file.primary_tag_type();
        tagged_file.insert_tag(Tag::new(tag_type));
    }

    let Some(tag) = tagged_file.primary_tag_mut() else {
        warn!("No writable tag for {}", path.display());
        return Ok(());
    };

    if let Some(title) = &metadata.title {
        tag.set_title(title.clone());
    }

    if let Some(artist) = &metadata.artist {
        tag.set_artist(artist.clone());
    }

    if let Some(album) = &metadata.album {
        tag.set_album(album.clone());
    }

    if let Some(track) = metadata.track_number {
        tag.set_track(track);
    }

    if let Some(total) = metadata.total_tracks {
        tag.set_track_total(total);
    }

    if let Some(year) = metadata.year {
        if year > 0 {
            tag.set_year(year as u32);
        }
    }

    if let Some(cover_data) = &metadata.cover_art {
        let mime_type = if cover_data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            MimeType::Png
        } else {
            MimeType::Jpeg
        };

        let picture = Picture::new_unchecked(
            PictureType::CoverFront,
            Some(mime_type),
            None,
            cover_data.clone(),
        );

        tag.push_picture(picture);
    }

    if let Err(e) = tag.save_to_path(path, WriteOptions::default()) {
        warn!("Failed to save tags to {}: {}", path.display(), e);
    } else {
        debug!("Successfully wrote metadata to {}", path.display());
    }

    Ok(())
}

/// Ask the image CDN for the 500x500 rendition of a cover URL.
pub fn high_res_cover_url(cover_url: &str) -> String {
    cover_url.replace("150x150", "500x500")
}

/// Fetch cover art bytes, or `None` on any failure.
pub async fn fetch_cover_art(client: &Client, cover_url: &str) -> Option<Vec<u8>> {
    if cover_url.is_empty() {
        return None;
    }

    let url = high_res_cover_url(cover_url);
    let response = match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            debug!("Cover {} returned {}", url, response.status());
            return None;
        }
        Err(e) => {
            debug!("Cover {} failed: {}", url, e);
            return None;
        }
    };

    match response.bytes().await {
        // Tiny bodies are placeholders, not artwork
        Ok(bytes) if bytes.len() > 1000 => Some(bytes.to_vec()),
        _ => None,
    }
}
