//! Writing downloaded media to disk.

use std::path::{Path, PathBuf};

use futures_util::{Stream, StreamExt};
use tokio::fs::{DirBuilder, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::Result;

/// Stream `source` into `destination`, creating parent directories.
///
/// An existing file is truncated. Returns the number of bytes written. A file
/// left half-written by a failed copy is not removed.
pub async fn write_stream<S, B>(destination: &Path, source: S) -> Result<u64>
where
    S: Stream<Item = Result<B>>,
    B: AsRef<[u8]>,
{
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            create_dirs(parent).await?;
        }
    }

    let mut file = File::create(destination).await?;
    let copied = copy_into(&mut file, source).await;

    // Flush whatever made it through, even when the copy failed. The copy
    // error wins over a flush error.
    let flushed = file.flush().await;
    let written = copied?;
    flushed?;

    debug!("Wrote {} bytes to {}", written, destination.display());
    Ok(written)
}

async fn copy_into<S, B>(file: &mut File, source: S) -> Result<u64>
where
    S: Stream<Item = Result<B>>,
    B: AsRef<[u8]>,
{
    let mut written = 0u64;

    futures_util::pin_mut!(source);
    while let Some(chunk) = source.next().await {
        let chunk = chunk?;
        let bytes = chunk.as_ref();
        file.write_all(bytes).await?;
        written += bytes.len() as u64;
    }

    Ok(written)
}

async fn create_dirs(path: &Path) -> Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o755);
    builder.create(path).await?;
    Ok(())
}

/// Sanitize a string for use as a single path component.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = name
        .replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
        .trim()
        .trim_end_matches('.')
        .to_string();

    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned
    }
}

/// Build `{root}/{artist}/{album}/{title}.{ext}` with sanitized components.
pub fn track_path(root: &Path, artist: &str, album: &str, title: &str, extension: &str) -> PathBuf {
    let extension = extension.trim_start_matches('.');
    root.join(sanitize_filename(artist))
        .join(sanitize_filename(album))
        .join(format!("{}.{}", sanitize_filename(title), extension))
}
