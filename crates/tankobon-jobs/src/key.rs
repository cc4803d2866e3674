//! Job identity and deduplication keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use tankobon_types::{ChapterNumber, MangaId};
use uuid::Uuid;

/// Unique identifier for a job, derived from its [`JobKey`].
pub type JobId = Uuid;

/// What kind of work a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Download a single chapter.
    DownloadChapter,
    /// Queue a download for every chapter not seen before.
    DownloadNewChapters,
    /// Recurring [`JobKind::DownloadNewChapters`].
    MonitorManga,
}

impl JobKind {
    /// Returns the kind as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DownloadChapter => "download_chapter",
            Self::DownloadNewChapters => "download_new_chapters",
            Self::MonitorManga => "monitor_manga",
        }
    }

    /// Returns true for kinds that re-arm after each run.
    #[must_use]
    pub const fn is_recurring(&self) -> bool {
        matches!(self, Self::MonitorManga)
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deduplication key: `(kind, connector, publication id, chapter number)`.
///
/// At most one active job exists per key. Chapter numbers compare by value,
/// so `"10.50"` and `"10.5"` produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    /// Job kind.
    pub kind: JobKind,
    /// Connector name.
    pub connector: String,
    /// Publication id of the target manga.
    pub target: String,
    /// Chapter number, for chapter downloads.
    pub chapter: Option<ChapterNumber>,
}

impl JobKey {
    /// Creates a key for a whole-manga job.
    #[must_use]
    pub fn manga(kind: JobKind, manga: &MangaId) -> Self {
        Self {
            kind,
            connector: manga.connector.clone(),
            target: manga.publication_id.clone(),
            chapter: None,
        }
    }

    /// Creates a key for a chapter download.
    #[must_use]
    pub fn chapter(manga: &MangaId, number: ChapterNumber) -> Self {
        Self {
            chapter: Some(number),
            ..Self::manga(JobKind::DownloadChapter, manga)
        }
    }

    /// Derives the job id. Equal keys always yield equal ids.
    #[must_use]
    pub fn id(&self) -> JobId {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, self.to_string().as_bytes())
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.connector, self.target)?;
        if let Some(chapter) = &self.chapter {
            write!(f, ":{chapter}")?;
        }
        Ok(())
    }
}

/// Partial match over [`JobKey`] components.
///
/// Unset components match anything. Connector names compare
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    kind: Option<JobKind>,
    connector: Option<String>,
    target: Option<String>,
    chapter: Option<ChapterNumber>,
}

impl JobFilter {
    /// Creates a filter matching every job.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter matching every job targeting `manga`.
    #[must_use]
    pub fn for_manga(manga: &MangaId) -> Self {
        Self::new()
            .connector(&manga.connector)
            .target(&manga.publication_id)
    }

    /// Restricts to one job kind.
    #[must_use]
    pub const fn kind(mut self, kind: JobKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restricts to one connector.
    #[must_use]
    pub fn connector(mut self, name: impl Into<String>) -> Self {
        self.connector = Some(name.into());
        self
    }

    /// Restricts to one publication id.
    #[must_use]
    pub fn target(mut self, publication_id: impl Into<String>) -> Self {
        self.target = Some(publication_id.into());
        self
    }

    /// Restricts to one chapter number.
    #[must_use]
    pub fn chapter(mut self, number: ChapterNumber) -> Self {
        self.chapter = Some(number);
        self
    }

    /// Returns true if `key` matches every set component.
    #[must_use]
    pub fn matches(&self, key: &JobKey) -> bool {
        self.kind.is_none_or(|kind| kind == key.kind)
            && self
                .connector
                .as_deref()
                .is_none_or(|name| name.eq_ignore_ascii_case(&key.connector))
            && self.target.as_deref().is_none_or(|target| target == key.target)
            && self
                .chapter
                .as_ref()
                .is_none_or(|chapter| key.chapter.as_ref() == Some(chapter))
    }
}
