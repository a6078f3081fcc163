//! JSON to model converters.
//!
//! The provider's JSON is loosely typed: numbers arrive as strings or
//! integers depending on the endpoint, and unknown fields come and go. The
//! raw structs here accept all of that, and the `parse_*` functions turn them
//! into descriptors, failing with `MissingField` for anything the download
//! pipeline depends on.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Result, SaavnError};
use crate::models::common::parse_year;
use crate::models::{AlbumDescriptor, ArtistDescriptor, PlaylistDescriptor, TrackDescriptor};

/// A JSON scalar that may be a string, number or bool.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn as_string(&self) -> String {
        match self {
            Scalar::Str(s) => s.clone(),
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }

    fn as_u64(&self) -> Option<u64> {
        match self {
            Scalar::Str(s) => s.trim().parse().ok(),
            Scalar::Int(n) => u64::try_from(*n).ok(),
            Scalar::Float(n) if *n >= 0.0 => Some(*n as u64),
            _ => None,
        }
    }

    fn as_bool(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Int(n) => *n != 0,
            Scalar::Float(n) => *n != 0.0,
            Scalar::Str(s) => matches!(s.trim(), "1" | "true"),
        }
    }
}

/// `{ "id": ... }` token exchange response.
#[derive(Debug, Deserialize)]
pub(crate) struct RawId {
    pub id: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSong {
    pub id: Option<Scalar>,
    pub song: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub primary_artists: Option<String>,
    pub singers: Option<String>,
    pub image: Option<String>,
    pub year: Option<Scalar>,
    pub duration: Option<Scalar>,
    pub explicit_content: Option<Scalar>,
    pub encrypted_media_url: Option<String>,
    pub media_preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAlbum {
    pub albumid: Option<Scalar>,
    pub id: Option<Scalar>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub primary_artists: Option<String>,
    pub year: Option<Scalar>,
    pub image: Option<String>,
    #[serde(default)]
    pub songs: Vec<RawSong>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawArtistToken {
    #[serde(rename = "artistId")]
    pub artist_id: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawArtistPage {
    #[serde(rename = "artistId")]
    pub artist_id: Option<Scalar>,
    pub name: Option<String>,
    #[serde(rename = "topAlbums")]
    pub top_albums: Option<RawTopAlbums>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTopAlbums {
    #[serde(default)]
    pub albums: Vec<RawAlbumRef>,
    pub total: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAlbumRef {
    pub albumid: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPlaylist {
    pub listid: Option<Scalar>,
    pub listname: Option<String>,
    #[serde(default)]
    pub songs: Vec<RawSong>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSongToken {
    #[serde(default)]
    pub songs: Vec<RawId>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn scalar_string(value: Option<&Scalar>) -> Option<String> {
    non_empty(value.map(Scalar::as_string))
}

/// Pull the `id` out of a token exchange response.
pub(crate) fn parse_id(raw: RawId, operation: &'static str) -> Result<String> {
    scalar_string(raw.id.as_ref()).ok_or_else(|| SaavnError::missing(operation, "id"))
}

/// Pull the `artistId` out of an artist token exchange response.
pub(crate) fn parse_artist_id(raw: RawArtistToken, operation: &'static str) -> Result<String> {
    scalar_string(raw.artist_id.as_ref()).ok_or_else(|| SaavnError::missing(operation, "artistId"))
}

/// Pull the first song id out of a song token exchange response.
pub(crate) fn parse_song_id(raw: RawSongToken, operation: &'static str) -> Result<String> {
    raw.songs
        .into_iter()
        .next()
        .and_then(|s| scalar_string(s.id.as_ref()))
        .ok_or_else(|| SaavnError::missing(operation, "songs[0].id"))
}

/// Convert one raw song into a track.
///
/// `album_fallback` fills the album name when the song omits it.
pub(crate) fn parse_track(
    raw: RawSong,
    album_fallback: Option<&str>,
    operation: &'static str,
) -> Result<TrackDescriptor> {
    let id = scalar_string(raw.id.as_ref()).ok_or_else(|| SaavnError::missing(operation, "id"))?;
    let title = non_empty(raw.song)
        .or_else(|| non_empty(raw.title))
        .ok_or_else(|| SaavnError::missing(operation, "song"))?;
    let encrypted_media_url = non_empty(raw.encrypted_media_url)
        .ok_or_else(|| SaavnError::missing(operation, "encrypted_media_url"))?;

    let album = non_empty(raw.album)
        .or_else(|| album_fallback.map(str::to_string))
        .unwrap_or_default();
    let artist = non_empty(raw.primary_artists)
        .or_else(|| non_empty(raw.singers))
        .unwrap_or_default();

    Ok(TrackDescriptor {
        id,
        title,
        album,
        artist,
        encrypted_media_url,
        duration_secs: raw
            .duration
            .as_ref()
            .and_then(Scalar::as_u64)
            .unwrap_or(0) as u32,
        explicit: raw
            .explicit_content
            .as_ref()
            .map(Scalar::as_bool)
            .unwrap_or(false),
        preview_url: non_empty(raw.media_preview_url),
        year: raw
            .year
            .as_ref()
            .and_then(|y| parse_year(&y.as_string())),
        image: non_empty(raw.image),
    })
}

/// Convert an album detail response.
pub(crate) fn parse_album(raw: RawAlbum, operation: &'static str) -> Result<AlbumDescriptor> {
    let id = scalar_string(raw.albumid.as_ref())
        .or_else(|| scalar_string(raw.id.as_ref()))
        .ok_or_else(|| SaavnError::missing(operation, "albumid"))?;
    let name = non_empty(raw.name)
        .or_else(|| non_empty(raw.title))
        .ok_or_else(|| SaavnError::missing(operation, "name"))?;

    let tracks = raw
        .songs
        .into_iter()
        .map(|song| parse_track(song, Some(&name), operation))
        .collect::<Result<Vec<_>>>()?;

    Ok(AlbumDescriptor {
        id,
        name,
        primary_artists: non_empty(raw.primary_artists).unwrap_or_default(),
        year: raw.year.as_ref().and_then(|y| parse_year(&y.as_string())),
        image: non_empty(raw.image),
        tracks,
    })
}

/// Convert one page of an artist's album listing into `(album_ids, total)`.
pub(crate) fn parse_artist_page(
    raw: RawArtistPage,
    operation: &'static str,
) -> Result<(Vec<String>, u32)> {
    let top_albums = raw
        .top_albums
        .ok_or_else(|| SaavnError::missing(operation, "topAlbums"))?;
    let total = top_albums
        .total
        .as_ref()
        .and_then(Scalar::as_u64)
        .ok_or_else(|| SaavnError::missing(operation, "topAlbums.total"))?;

    let album_ids = top_albums
        .albums
        .into_iter()
        .map(|a| {
            scalar_string(a.albumid.as_ref())
                .ok_or_else(|| SaavnError::missing(operation, "albumid"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((album_ids, u32::try_from(total).unwrap_or(u32::MAX)))
}

/// Convert the first page of an artist listing into a descriptor.
pub(crate) fn parse_artist(
    raw: RawArtistPage,
    artist_id: &str,
    operation: &'static str,
) -> Result<ArtistDescriptor> {
    let id = scalar_string(raw.artist_id.as_ref()).unwrap_or_else(|| artist_id.to_string());
    let name = non_empty(raw.name.clone()).unwrap_or_default();
    let (_, total_albums) = parse_artist_page(raw, operation)?;

    Ok(ArtistDescriptor {
        id,
        name,
        total_albums,
        album_ids: Vec::new(),
    })
}

/// Convert a playlist detail response.
pub(crate) fn parse_playlist(
    raw: RawPlaylist,
    operation: &'static str,
) -> Result<PlaylistDescriptor> {
    let id =
        scalar_string(raw.listid.as_ref()).ok_or_else(|| SaavnError::missing(operation, "listid"))?;
    let name = non_empty(raw.listname).unwrap_or_else(|| id.clone());

    let tracks = raw
        .songs
        .into_iter()
        .map(|song| parse_track(song, None, operation))
        .collect::<Result<Vec<_>>>()?;

    Ok(PlaylistDescriptor { id, name, tracks })
}

/// Convert a `song.getDetails` response, which is keyed by song id.
pub(crate) fn parse_song_details(
    mut raw: HashMap<String, serde_json::Value>,
    song_id: &str,
    operation: &'static str,
) -> Result<TrackDescriptor> {
    let value = match raw.remove(song_id) {
        Some(value) => value,
        None => raw
            .remove("songs")
            .and_then(|songs| songs.as_array().and_then(|a| a.first().cloned()))
            .ok_or_else(|| SaavnError::missing(operation, "song"))?,
    };

    let song: RawSong = serde_json::from_value(value).map_err(|e| {
        SaavnError::metadata(operation, crate::error::MetadataCause::Parse(e))
    })?;
    parse_track(song, None, operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetadataCause;
    use serde_json::json;

    fn raw<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_album_with_extra_fields() {
        let album: RawAlbum = raw(json!({
            "title": "Aashiqui 2",
            "name": "Aashiqui 2",
            "year": "2013",
            "primary_artists": "Mithoon, Jeet Gannguli",
            "albumid": "1139549",
            "image": "https://c.saavncdn.com/430/Aashiqui-2-150x150.jpg",
            "label_url": "/label/t-series-albums/6DLuXO3VoTo_",
            "songs": [{
                "id": "3IoDK8qI",
                "song": "Tum Hi Ho",
                "album": "Aashiqui 2",
                "primary_artists": "Arijit Singh",
                "duration": "262",
                "explicit_content": 0,
                "encrypted_media_url": "ID2ieOjCrwfgWvL5sXl4B1ImC5QfbsDy",
                "media_preview_url": "https://preview.saavncdn.com/430/x_96_p.mp4",
                "some_new_field": {"nested": true}
            }]
        }));

        let album = parse_album(album, "fetch_album").unwrap();
        assert_eq!(album.id, "1139549");
        assert_eq!(album.name, "Aashiqui 2");
        assert_eq!(album.year, Some(2013));
        assert_eq!(album.tracks.len(), 1);

        let track = &album.tracks[0];
        assert_eq!(track.title, "Tum Hi Ho");
        assert_eq!(track.artist, "Arijit Singh");
        assert_eq!(track.duration_secs, 262);
        assert!(!track.explicit);
        assert!(track.preview_url.is_some());
    }

    #[test]
    fn test_parse_track_requires_locator() {
        let song: RawSong = raw(json!({"id": "a", "song": "Title"}));
        let err = parse_track(song, None, "fetch_album").unwrap_err();
        assert!(matches!(
            err,
            SaavnError::Metadata {
                operation: "fetch_album",
                cause: MetadataCause::MissingField("encrypted_media_url")
            }
        ));
    }

    #[test]
    fn test_parse_track_requires_title() {
        let song: RawSong = raw(json!({"id": "a", "encrypted_media_url": "x"}));
        assert!(matches!(
            parse_track(song, None, "op").unwrap_err(),
            SaavnError::Metadata {
                cause: MetadataCause::MissingField("song"),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_track_album_fallback_and_numeric_fields() {
        let song: RawSong = raw(json!({
            "id": 42,
            "song": "X",
            "singers": "Someone",
            "duration": 200,
            "explicit_content": "1",
            "encrypted_media_url": "abc"
        }));
        let track = parse_track(song, Some("Fallback"), "op").unwrap();
        assert_eq!(track.id, "42");
        assert_eq!(track.album, "Fallback");
        assert_eq!(track.artist, "Someone");
        assert_eq!(track.duration_secs, 200);
        assert!(track.explicit);
    }

    #[test]
    fn test_parse_artist_page() {
        let page: RawArtistPage = raw(json!({
            "artistId": "459320",
            "name": "Arijit Singh",
            "topAlbums": {
                "albums": [{"albumid": "1"}, {"albumid": 2}],
                "total": 25
            }
        }));
        let (ids, total) = parse_artist_page(page, "fetch_artist_page").unwrap();
        assert_eq!(ids, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(total, 25);
    }

    #[test]
    fn test_parse_artist_page_missing_total() {
        let page: RawArtistPage = raw(json!({"topAlbums": {"albums": []}}));
        assert!(matches!(
            parse_artist_page(page, "op").unwrap_err(),
            SaavnError::Metadata {
                cause: MetadataCause::MissingField("topAlbums.total"),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_song_details_keyed_by_id() {
        let details: HashMap<String, serde_json::Value> = raw(json!({
            "EToxUyFp": {
                "id": "EToxUyFp",
                "song": "Kesariya",
                "album": "Brahmastra",
                "primary_artists": "Arijit Singh",
                "encrypted_media_url": "abc"
            }
        }));
        let track = parse_song_details(details, "EToxUyFp", "fetch_song").unwrap();
        assert_eq!(track.title, "Kesariya");
        assert_eq!(track.album, "Brahmastra");
    }

    #[test]
    fn test_parse_playlist_name_fallback() {
        let playlist: RawPlaylist = raw(json!({"listid": "159144718", "songs": []}));
        let playlist = parse_playlist(playlist, "fetch_playlist").unwrap();
        assert_eq!(playlist.name, "159144718");
        assert!(playlist.tracks.is_empty());
    }
}
