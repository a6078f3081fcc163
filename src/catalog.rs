//! Artist catalog expansion.
//!
//! The artist listing is paginated. The first artist call declares how many
//! albums exist; this module walks the pages and gathers every album ID.

use tracing::{debug, info, warn};

use crate::api::SaavnApi;
use crate::error::Result;
use crate::models::ArtistDescriptor;

/// Number of pages needed to list `total` albums, `page_size` at a time.
///
/// Zero albums is the only case that needs no pages.
pub fn pages_needed(total: u32, page_size: u32) -> u32 {
    if total == 0 || page_size == 0 {
        return 0;
    }
    ((total as u64 + page_size as u64 - 1) / page_size as u64) as u32
}

/// Fill `artist.album_ids` by fetching every page of the listing in order.
///
/// Stops early when a page comes back empty or the declared total has been
/// collected, so an inconsistent provider cannot cause extra requests.
pub async fn expand_artist(
    api: &SaavnApi,
    mut artist: ArtistDescriptor,
    page_size: u32,
) -> Result<ArtistDescriptor> {
    let pages = pages_needed(artist.total_albums, page_size);
    if pages == 0 {
        info!("Artist {} has no albums", artist.id);
        return Ok(artist);
    }

    debug!(
        "Expanding artist {}: {} albums over {} pages",
        artist.id, artist.total_albums, pages
    );

    let mut album_ids = Vec::with_capacity(artist.total_albums as usize);
    for page in 0..pages {
        let (ids, _) = api.fetch_artist_page(&artist.id, page, page_size).await?;
        debug!("Artist {} page {}: {} albums", artist.id, page, ids.len());

        if ids.is_empty() {
            warn!(
                "Artist {} page {} was empty; stopping at {} of {} albums",
                artist.id,
                page,
                album_ids.len(),
                artist.total_albums
            );
            break;
        }

        album_ids.extend(ids);
        if album_ids.len() >= artist.total_albums as usize {
            break;
        }
    }

    info!(
        "Found {} albums for artist {}",
        album_ids.len(),
        artist.id
    );
    artist.album_ids = album_ids;
    Ok(artist)
}
