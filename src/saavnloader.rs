//! Unified Saavnloader interface.
//!
//! This module ties the pieces together: classify a link, resolve it
//! through the metadata API, expand artists into albums, and hand the
//! resulting tracks to the [`Orchestrator`] as one batch.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{HttpMediaSource, MediaSource, SaavnApi};
use crate::catalog;
use crate::config::DownloadConfig;
use crate::error::{Result, SaavnError};
use crate::models::{AlbumDescriptor, ArtistDescriptor, PlaylistDescriptor, Quality, TrackDescriptor};
use crate::orchestrator::{AggregateResult, DownloadTask, Orchestrator, ProgressObserver};
use crate::reference::{MediaKind, MediaReference};
use crate::storage;
use crate::tagging::{self, AudioMetadata};

/// What a download call resolved to and how each track fared.
#[derive(Debug)]
pub struct DownloadReport {
    pub kind: MediaKind,
    /// Album, artist, playlist or song name.
    pub name: String,
    pub result: AggregateResult,
}

impl DownloadReport {
    /// Total number of tracks attempted.
    pub fn total(&self) -> usize {
        self.result.total()
    }

    /// Check if all tracks were downloaded successfully.
    pub fn all_successful(&self) -> bool {
        self.result.all_successful()
    }
}

/// Tracks waiting to be dispatched, with the tags each should receive.
#[derive(Default)]
struct Batch {
    tasks: Vec<DownloadTask>,
    tags: HashMap<usize, AudioMetadata>,
    used: HashSet<PathBuf>,
}

impl Batch {
    fn push(&mut self, track: TrackDescriptor, destination: PathBuf, tags: AudioMetadata) {
        let id = self.tasks.len();
        let destination = self.unique(destination);
        self.tags.insert(id, tags);
        self.tasks.push(DownloadTask::new(id, track, destination));
    }

    /// Two tracks with the same title in one folder get ` (2)`, ` (3)`...
    fn unique(&mut self, destination: PathBuf) -> PathBuf {
        if self.used.insert(destination.clone()) {
            return destination;
        }

        let stem = destination
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = destination
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut n = 2;
        loop {
            let candidate = destination.with_file_name(format!("{} ({}){}", stem, n, extension));
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Main Saavnloader interface.
///
/// # Example
///
/// ```rust,no_run
/// use rusaavn::{DownloadConfig, Saavnloader};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let loader = Saavnloader::new(DownloadConfig::default())?;
///     let report = loader
///         .download(
///             "https://www.jiosaavn.com/album/aashiqui-2/T0tKqH2j7ZA_",
///             &CancellationToken::new(),
///         )
///         .await?;
///     println!("{}: {}/{} tracks", report.name, report.result.successful().count(), report.total());
///     Ok(())
/// }
/// ```
pub struct Saavnloader {
    api: SaavnApi,
    media: Arc<dyn MediaSource>,
    http: Client,
    config: DownloadConfig,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl Saavnloader {
    /// Create a loader from configuration.
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let api = SaavnApi::with_options(config.api_base_url.clone(), config.timeout())?;
        let media = HttpMediaSource::new(config.timeout())?;
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SaavnError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api,
            media: Arc::new(media),
            http,
            config,
            observer: None,
        })
    }

    /// Replace the source media bytes are fetched from.
    pub fn with_media_source(mut self, media: Arc<dyn MediaSource>) -> Self {
        self.media = media;
        self
    }

    /// Receive per-track progress.
    pub fn set_observer(&mut self, observer: Arc<dyn ProgressObserver>) {
        self.observer = Some(observer);
    }

    /// Set the output directory for downloads.
    pub fn set_output_dir<P: AsRef<Path>>(&mut self, path: P) {
        self.config.output_dir = path.as_ref().to_path_buf();
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.config.quality = quality;
    }

    /// Enable or disable embedding metadata tags in downloaded files.
    pub fn set_embed_tags(&mut self, embed: bool) {
        self.config.embed_tags = embed;
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// The metadata client, for callers that only want metadata.
    pub fn api(&self) -> &SaavnApi {
        &self.api
    }

    // ==================
    // RESOLUTION
    // ==================

    /// Resolve an artist link (or ID) to a fully expanded descriptor.
    pub async fn get_artist(&self, artist_id: &str) -> Result<ArtistDescriptor> {
        let artist = self.api.fetch_artist(artist_id).await?;
        catalog::expand_artist(&self.api, artist, self.config.artist_page_size).await
    }

    // ==================
    // DOWNLOADING
    // ==================

    /// Classify `url` and download whatever it points at.
    pub async fn download(&self, url: &str, cancel: &CancellationToken) -> Result<DownloadReport> {
        let reference = MediaReference::parse(url);
        info!("{} link entered: {}", reference.kind(), reference.url());

        match reference.kind() {
            MediaKind::Album => {
                let id = self.api.resolve_album_id(reference.url()).await?;
                self.download_album(&id, cancel).await
            }
            MediaKind::Artist => {
                let id = self.api.resolve_artist_id(reference.url()).await?;
                self.download_artist(&id, cancel).await
            }
            MediaKind::Playlist => {
                let id = self.api.resolve_playlist_id(reference.url()).await?;
                self.download_playlist(&id, cancel).await
            }
            MediaKind::Song => {
                let id = self.api.resolve_song_id(reference.url()).await?;
                self.download_song(&id, cancel).await
            }
            MediaKind::Unknown => Err(SaavnError::ClassificationAmbiguous(url.to_string())),
        }
    }

    /// Download every track of an album.
    pub async fn download_album(
        &self,
        album_id: &str,
        cancel: &CancellationToken,
    ) -> Result<DownloadReport> {
        let album = self.api.fetch_album(album_id).await?;

        let mut batch = Batch::default();
        self.add_album(&mut batch, &album);

        let result = self.run_batch(batch, cancel).await;
        Ok(DownloadReport {
            kind: MediaKind::Album,
            name: album.name,
            result,
        })
    }

    /// Download every album of an artist as a single batch.
    pub async fn download_artist(
        &self,
        artist_id: &str,
        cancel: &CancellationToken,
    ) -> Result<DownloadReport> {
        let artist = self.get_artist(artist_id).await?;

        let mut seen = HashSet::new();
        let mut batch = Batch::default();
        for album_id in &artist.album_ids {
            if !seen.insert(album_id.as_str()) {
                debug!("Skipping repeated album {}", album_id);
                continue;
            }
            if cancel.is_cancelled() {
                return Err(SaavnError::Cancelled);
            }
            let album = self.api.fetch_album(album_id).await?;
            self.add_album(&mut batch, &album);
        }

        let result = self.run_batch(batch, cancel).await;
        Ok(DownloadReport {
            kind: MediaKind::Artist,
            name: if artist.name.is_empty() {
                artist.id
            } else {
                artist.name
            },
            result,
        })
    }

    /// Download every track of a playlist into each track's own
    /// artist/album folder.
    pub async fn download_playlist(
        &self,
        list_id: &str,
        cancel: &CancellationToken,
    ) -> Result<DownloadReport> {
        let playlist = self.api.fetch_playlist(list_id).await?;

        let mut batch = Batch::default();
        self.add_playlist(&mut batch, &playlist);

        let result = self.run_batch(batch, cancel).await;
        Ok(DownloadReport {
            kind: MediaKind::Playlist,
            name: playlist.name,
            result,
        })
    }

    /// Download a single song.
    pub async fn download_song(
        &self,
        song_id: &str,
        cancel: &CancellationToken,
    ) -> Result<DownloadReport> {
        let track = self.api.fetch_song(song_id).await?;
        let name = track.title.clone();

        let mut batch = Batch::default();
        let destination = self.destination(&track.artist, &track.album, &track.title);
        let tags = AudioMetadata::from_track(&track);
        batch.push(track, destination, tags);

        let result = self.run_batch(batch, cancel).await;
        Ok(DownloadReport {
            kind: MediaKind::Song,
            name,
            result,
        })
    }

    // ==================
    // INTERNAL HELPERS
    // ==================

    fn destination(&self, artist: &str, album: &str, title: &str) -> PathBuf {
        storage::track_path(
            &self.config.output_dir,
            artist,
            album,
            title,
            &self.config.file_extension,
        )
    }

    fn add_album(&self, batch: &mut Batch, album: &AlbumDescriptor) {
        let total = album.total_tracks() as u32;
        for (index, track) in album.tracks.iter().enumerate() {
            let destination = self.destination(&album.primary_artists, &album.name, &track.title);
            let mut tags = AudioMetadata::from_track(track).with_track(index as u32 + 1, Some(total));
            if tags.year.is_none() {
                tags.year = album.year;
            }
            let mut track = track.clone();
            if track.image.is_none() {
                track.image = album.image.clone();
            }
            batch.push(track, destination, tags);
        }
    }

    fn add_playlist(&self, batch: &mut Batch, playlist: &PlaylistDescriptor) {
        for track in &playlist.tracks {
            let destination = self.destination(&track.artist, &track.album, &track.title);
            batch.push(track.clone(), destination, AudioMetadata::from_track(track));
        }
    }

    async fn run_batch(&self, batch: Batch, cancel: &CancellationToken) -> AggregateResult {
        let Batch { tasks, mut tags, .. } = batch;

        let mut orchestrator = Orchestrator::new(Arc::clone(&self.media))
            .with_max_concurrency(self.config.max_concurrency)
            .with_quality(self.config.quality);
        if let Some(observer) = &self.observer {
            orchestrator = orchestrator.with_observer(Arc::clone(observer));
        }

        let result = orchestrator.run(tasks, cancel).await;

        if self.config.embed_tags && !cancel.is_cancelled() {
            self.tag_outcomes(&result, &mut tags).await;
        }
        result
    }

    async fn tag_outcomes(&self, result: &AggregateResult, tags: &mut HashMap<usize, AudioMetadata>) {
        let mut covers: HashMap<String, Option<Vec<u8>>> = HashMap::new();

        for outcome in result.successful() {
            let Some(mut metadata) = tags.remove(&outcome.task.id) else {
                continue;
            };

            if let Some(image) = &outcome.task.track.image {
                if !covers.contains_key(image) {
                    let cover = tagging::fetch_cover_art(&self.http, image).await;
                    covers.insert(image.clone(), cover);
                }
                if let Some(Some(cover)) = covers.get(image) {
                    metadata = metadata.with_cover_art(cover.clone());
                }
            }

            let path = outcome.task.destination.clone();
            let written = tokio::task::spawn_blocking(move || tagging::write_metadata(&path, &metadata)).await;
            match written {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Tagging {} failed: {}", outcome.task.destination.display(), e),
                Err(e) => warn!("Tagging task for {} panicked: {}", outcome.task.destination.display(), e),
            }
        }
    }
}
