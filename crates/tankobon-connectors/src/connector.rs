//! The connector capability set.

use async_trait::async_trait;
use std::fmt;
use tankobon_fetch::{RequestClass, StatusCode};
use tankobon_types::{Chapter, Manga, ProgressToken};

/// A manga source.
///
/// Implementations own one [`RateLimitedClient`](tankobon_fetch::RateLimitedClient)
/// with the source's [`RateLimitConfig`](tankobon_fetch::RateLimitConfig), so
/// every job driving the same connector shares its limits.
///
/// None of the operations fail with an error. Transport failures and
/// unexpected page structure are logged and produce empty results; chapter
/// downloads report an HTTP-like status code.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    /// Unique, human-readable connector name.
    fn name(&self) -> &str;

    /// Searches the source for publications matching `title`.
    async fn search_manga(&self, title: &str) -> Vec<Manga>;

    /// Fetches a single publication from its page URL.
    async fn fetch_manga(&self, url: &str) -> Option<Manga>;

    /// Lists the chapters of `manga`, sorted ascending by chapter number.
    async fn list_chapters(&self, manga: &Manga) -> Vec<Chapter>;

    /// Downloads `chapter` into its archive below the download location.
    ///
    /// Reports per-image progress on `token` and stops at the next checkpoint
    /// once cancellation is requested. The token's terminal transition is left
    /// to the caller. Returns `200 OK` once the archive is in place.
    async fn download_chapter(&self, chapter: &Chapter, token: &ProgressToken) -> StatusCode;
}

/// Image URLs making up one chapter, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterImages {
    /// Image URLs in reading order.
    pub urls: Vec<String>,
    /// `Referer` header sent with each image request.
    pub referer: Option<String>,
    /// Request class used for image requests.
    pub class: RequestClass,
}

impl ChapterImages {
    /// Creates an image list fetched under `class` without a referer.
    #[must_use]
    pub const fn new(urls: Vec<String>, class: RequestClass) -> Self {
        Self {
            urls,
            referer: None,
            class,
        }
    }

    /// Sets the referer sent with each image request.
    #[must_use]
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Number of pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Returns true if the chapter has no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
