//! Shared chapter download routine.

use crate::archive::{ChapterArchive, ComicInfo, image_extension, run_blocking};
use crate::connector::ChapterImages;
use std::path::Path;
use tankobon_fetch::{RateLimitedClient, StatusCode};
use tankobon_types::{Chapter, ProgressToken};

/// Downloads `images` sequentially and packages them as `chapter`'s archive.
///
/// Cancellation is checked before each request and before each archive write;
/// once observed the routine stops and returns `408 Request Timeout`. Any
/// non-success image request aborts with that request's status. On every
/// early return the temporary archive is discarded, so the final `.cbz` only
/// exists after a complete download.
///
/// Progress on `token` advances by one step per stored image.
pub async fn download_chapter_images(
    client: &RateLimitedClient,
    chapter: &Chapter,
    images: &ChapterImages,
    download_location: &Path,
    token: &ProgressToken,
) -> StatusCode {
    if token.checkpoint().is_err() {
        return StatusCode::REQUEST_TIMEOUT;
    }
    if images.is_empty() {
        tracing::warn!(chapter = %chapter, "chapter has no images");
        return StatusCode::NOT_FOUND;
    }

    let destination = chapter.archive_path(download_location);
    let info = ComicInfo::from_chapter(chapter, images.len());
    let created = run_blocking(move || {
        let mut archive = ChapterArchive::create(&destination)?;
        archive.add_comic_info(&info)?;
        Ok(archive)
    })
    .await;
    let mut archive = match created {
        Ok(archive) => archive,
        Err(e) => {
            tracing::error!(chapter = %chapter, error = %e, "failed to create archive");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    token.set_steps(images.len() as u64);
    tracing::debug!(chapter = %chapter, images = images.len(), "downloading chapter");

    for (index, url) in images.urls.iter().enumerate() {
        if token.checkpoint().is_err() {
            tracing::info!(chapter = %chapter, page = index, "download cancelled");
            return StatusCode::REQUEST_TIMEOUT;
        }

        let result = client
            .request_with_referer(url, images.class, images.referer.as_deref())
            .await;
        if !result.is_success() {
            tracing::warn!(
                chapter = %chapter,
                page = index,
                status = %result.status(),
                "image request failed"
            );
            return result.status();
        }

        if token.checkpoint().is_err() {
            tracing::info!(chapter = %chapter, page = index, "download cancelled");
            return StatusCode::REQUEST_TIMEOUT;
        }

        let data = result.into_body().unwrap_or_default();
        let extension = image_extension(url);
        let written = run_blocking(move || {
            archive.add_page(&extension, &data)?;
            Ok(archive)
        })
        .await;
        archive = match written {
            Ok(archive) => archive,
            Err(e) => {
                tracing::error!(chapter = %chapter, page = index, error = %e, "failed to write page");
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
        };
        token.increment();
    }

    match run_blocking(move || archive.finish()).await {
        Ok(path) => {
            tracing::info!(chapter = %chapter, path = %path.display(), "chapter downloaded");
            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(chapter = %chapter, error = %e, "failed to persist archive");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
