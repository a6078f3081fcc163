//! Streaming retrieval of media files.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::Client;
use tracing::debug;

use crate::error::{Result, SaavnError};

/// Stream of body chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// An opened media response.
pub struct MediaBody {
    /// Total size from `Content-Length`, when the server sent one.
    pub total: Option<u64>,
    /// The body.
    pub stream: ByteStream,
}

impl std::fmt::Debug for MediaBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBody")
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

/// Something that can turn a decoded media URL into a byte stream.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Issue the retrieval request for `url`.
    async fn open(&self, url: &str) -> Result<MediaBody>;
}

/// [`MediaSource`] backed by a plain `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpMediaSource {
    client: Client,
}

impl HttpMediaSource {
    /// Create a media client with a connect timeout but no total timeout,
    /// so long bodies are not cut off.
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| SaavnError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaSource for HttpMediaSource {
    async fn open(&self, url: &str) -> Result<MediaBody> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SaavnError::Status(status.as_u16()));
        }

        let total = response.content_length();
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(SaavnError::from))
            .boxed();

        Ok(MediaBody { total, stream })
    }
}
