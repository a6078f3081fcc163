//! # Rusaavn
//!
//! A Rust library for downloading music and fetching metadata from JioSaavn.
//!
//! ## Quick Start
//!
//! The easiest way to use this library is through the [`Saavnloader`] struct:
//!
//! ```rust,no_run
//! use rusaavn::{DownloadConfig, Saavnloader};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut loader = Saavnloader::new(DownloadConfig::default())?;
//!     loader.set_output_dir("music");
//!
//!     // Album, artist, playlist and song links are all accepted
//!     let report = loader
//!         .download(
//!             "https://www.jiosaavn.com/album/aashiqui-2/T0tKqH2j7ZA_",
//!             &CancellationToken::new(),
//!         )
//!         .await?;
//!
//!     for failed in report.result.failed() {
//!         eprintln!("{} failed", failed.task.track.title);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - [`reference`] classifies the link
//! - [`SaavnApi`] resolves it to album/artist/playlist/song metadata
//! - [`catalog`] walks an artist's paginated album listing
//! - [`Orchestrator`] downloads tracks with bounded concurrency
//! - [`crypto`] decodes each track's encrypted media locator
//! - [`storage`] streams bytes into `{artist}/{album}/{title}.m4a`

pub mod api;
pub mod catalog;
pub mod config;
pub mod converters;
pub mod crypto;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod reference;
mod saavnloader;
pub mod storage;
pub mod tagging;

// Main interface (recommended)
pub use saavnloader::{DownloadReport, Saavnloader};

// Lower-level building blocks
pub use api::{HttpMediaSource, MediaSource, SaavnApi};
pub use config::DownloadConfig;
pub use error::{ErrorKind, MetadataCause, SaavnError};
pub use models::{AlbumDescriptor, ArtistDescriptor, PlaylistDescriptor, Quality, TrackDescriptor};
pub use orchestrator::{AggregateResult, DownloadOutcome, DownloadTask, Orchestrator, ProgressObserver};
pub use reference::{MediaKind, MediaReference};
