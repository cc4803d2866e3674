//! Cover image cache.

use std::path::{Path, PathBuf};
use tankobon_fetch::{RateLimitedClient, RequestClass};
use tankobon_types::Manga;

use crate::archive::image_extension;

/// Saves the cover of `manga` into `cover_cache` and returns its path.
///
/// Existing files are reused without a request. Failures are logged and
/// yield `None`.
pub async fn cache_cover(
    client: &RateLimitedClient,
    manga: &Manga,
    cover_cache: &Path,
    class: RequestClass,
) -> Option<PathBuf> {
    let url = manga.cover_url.as_deref()?;
    let file_name = sanitize_filename::sanitize(format!(
        "{}-{}.{}",
        manga.connector(),
        manga.publication_id(),
        image_extension(url)
    ));
    let path = cover_cache.join(file_name);
    if tokio::fs::metadata(&path)
        .await
        .is_ok_and(|metadata| metadata.is_file())
    {
        return Some(path);
    }

    let result = client.request(url, class).await;
    if !result.is_success() {
        tracing::debug!(manga = %manga, status = %result.status(), "failed to fetch cover");
        return None;
    }

    if let Err(e) = tokio::fs::create_dir_all(cover_cache).await {
        tracing::warn!(path = %cover_cache.display(), error = %e, "failed to create cover cache");
        return None;
    }
    let data = result.into_body()?;
    match tokio::fs::write(&path, &data).await {
        Ok(()) => {
            tracing::debug!(manga = %manga, path = %path.display(), "cover cached");
            Some(path)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to write cover");
            None
        }
    }
}
