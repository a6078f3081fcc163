//! JioSaavn metadata API client.
//!
//! Every operation is a single GET against `api.php` with the call name in
//! `__call` and `_format=json`. Nothing here retries; callers decide.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::converters::{self, RawAlbum, RawArtistPage, RawArtistToken, RawId, RawPlaylist, RawSongToken};
use crate::error::{MetadataCause, Result, SaavnError};
use crate::models::{AlbumDescriptor, ArtistDescriptor, PlaylistDescriptor, TrackDescriptor};
use crate::reference::link_token;

/// Base URL for the provider's query API.
pub const API_BASE_URL: &str = "https://www.jiosaavn.com/api.php";

/// Client-wide request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Albums per page in the artist listing.
pub const ARTIST_PAGE_SIZE: u32 = 10;

/// Browser-like user agent; the API rejects some default agents.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Common parameters of the `webapi.get` token exchange.
const WEBAPI_PARAMS: &[(&str, &str)] = &[
    ("__call", "webapi.get"),
    ("includeMetaTags", "0"),
    ("ctx", "web6dot0"),
    ("api_version", "4"),
];

/// Typed client for the metadata endpoints.
///
/// # Example
///
/// ```rust,no_run
/// use rusaavn::SaavnApi;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let api = SaavnApi::new()?;
///     let id = api
///         .resolve_album_id("https://www.jiosaavn.com/album/aashiqui-2/T0tKqH2j7ZA_")
///         .await?;
///     let album = api.fetch_album(&id).await?;
///     println!("{} ({} tracks)", album.name, album.total_tracks());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SaavnApi {
    client: Client,
    base_url: String,
}

impl SaavnApi {
    /// Create a client against the public API with the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_options(API_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Create a client against `base_url` (the full `api.php` URL).
    pub fn with_options<S: Into<String>>(base_url: S, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SaavnError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// The `api.php` URL requests go to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a GET request and decode the JSON body as `T`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        debug!("{}: GET {} with params: {:?}", operation, self.base_url, params);

        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("_format", "json"), ("_marker", "0")])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SaavnError::metadata(operation, MetadataCause::Request(e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SaavnError::metadata(
                operation,
                MetadataCause::Status(status.as_u16()),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| SaavnError::metadata(operation, MetadataCause::Request(e)))?;

        serde_json::from_str(&text).map_err(|e| {
            let preview: String = text.chars().take(200).collect();
            debug!("{}: unparseable body: {}", operation, preview);
            SaavnError::metadata(operation, MetadataCause::Parse(e))
        })
    }

    /// Exchange a link token through `webapi.get` for the given content type.
    async fn webapi_get<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
        content_type: &str,
        extra: &[(&str, &str)],
    ) -> Result<T> {
        let token = link_token(url).ok_or_else(|| SaavnError::InvalidLink(url.to_string()))?;

        let mut params: Vec<(&str, &str)> = WEBAPI_PARAMS.to_vec();
        params.push(("token", token));
        params.push(("type", content_type));
        params.extend_from_slice(extra);

        self.get_json(operation, &params).await
    }

    /// Resolve an album link to its album ID.
    pub async fn resolve_album_id(&self, url: &str) -> Result<String> {
        const OP: &str = "resolve_album_id";
        let raw: RawId = self.webapi_get(OP, url, "album", &[]).await?;
        let id = converters::parse_id(raw, OP)?;
        debug!("Resolved album link {} to {}", url, id);
        Ok(id)
    }

    /// Fetch album metadata with its full track list.
    pub async fn fetch_album(&self, album_id: &str) -> Result<AlbumDescriptor> {
        const OP: &str = "fetch_album";
        let raw: RawAlbum = self
            .get_json(
                OP,
                &[("__call", "content.getAlbumDetails"), ("albumid", album_id)],
            )
            .await?;
        let album = converters::parse_album(raw, OP)?;
        info!(
            "Fetched album '{}' by {} ({} tracks)",
            album.name,
            album.primary_artists,
            album.total_tracks()
        );
        Ok(album)
    }

    /// Resolve an artist link to its artist ID.
    pub async fn resolve_artist_id(&self, url: &str) -> Result<String> {
        const OP: &str = "resolve_artist_id";
        let raw: RawArtistToken = self
            .webapi_get(
                OP,
                url,
                "artist",
                &[("p", ""), ("n_song", "10"), ("n_album", "14"), ("sort_order", "")],
            )
            .await?;
        let id = converters::parse_artist_id(raw, OP)?;
        debug!("Resolved artist link {} to {}", url, id);
        Ok(id)
    }

    /// Fetch the artist page and its declared album total.
    ///
    /// `album_ids` is left empty; see [`crate::catalog::expand_artist`].
    pub async fn fetch_artist(&self, artist_id: &str) -> Result<ArtistDescriptor> {
        const OP: &str = "fetch_artist";
        let raw: RawArtistPage = self
            .get_json(
                OP,
                &[("__call", "artist.getArtistPageDetails"), ("artistId", artist_id)],
            )
            .await?;
        let artist = converters::parse_artist(raw, artist_id, OP)?;
        info!(
            "Artist {} declares {} albums",
            if artist.name.is_empty() { &artist.id } else { &artist.name },
            artist.total_albums
        );
        Ok(artist)
    }

    /// Fetch one page of an artist's album listing.
    ///
    /// Returns the album IDs on the page and the declared total.
    pub async fn fetch_artist_page(
        &self,
        artist_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<String>, u32)> {
        const OP: &str = "fetch_artist_page";
        let page = page.to_string();
        let page_size = page_size.to_string();
        let raw: RawArtistPage = self
            .get_json(
                OP,
                &[
                    ("__call", "artist.getArtistPageDetails"),
                    ("artistId", artist_id),
                    ("n_album", &page_size),
                    ("page", &page),
                ],
            )
            .await?;
        converters::parse_artist_page(raw, OP)
    }

    /// Resolve a playlist (or featured list) link to its list ID.
    pub async fn resolve_playlist_id(&self, url: &str) -> Result<String> {
        const OP: &str = "resolve_playlist_id";
        let raw: RawId = self
            .webapi_get(OP, url, "playlist", &[("p", "1"), ("n", "1")])
            .await?;
        converters::parse_id(raw, OP)
    }

    /// Fetch playlist metadata with its tracks.
    pub async fn fetch_playlist(&self, list_id: &str) -> Result<PlaylistDescriptor> {
        const OP: &str = "fetch_playlist";
        let raw: RawPlaylist = self
            .get_json(OP, &[("__call", "playlist.getDetails"), ("listid", list_id)])
            .await?;
        let playlist = converters::parse_playlist(raw, OP)?;
        info!(
            "Fetched playlist '{}' ({} tracks)",
            playlist.name,
            playlist.tracks.len()
        );
        Ok(playlist)
    }

    /// Resolve a song link to its song ID.
    pub async fn resolve_song_id(&self, url: &str) -> Result<String> {
        const OP: &str = "resolve_song_id";
        let raw: RawSongToken = self.webapi_get(OP, url, "song", &[]).await?;
        converters::parse_song_id(raw, OP)
    }

    /// Fetch a single song.
    pub async fn fetch_song(&self, song_id: &str) -> Result<TrackDescriptor> {
        const OP: &str = "fetch_song";
        let raw: HashMap<String, serde_json::Value> = self
            .get_json(OP, &[("__call", "song.getDetails"), ("pids", song_id)])
            .await?;
        converters::parse_song_details(raw, song_id, OP)
    }
}
