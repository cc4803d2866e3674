//! CBZ chapter archives with embedded `ComicInfo.xml`.

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tankobon_types::Chapter;
use tempfile::NamedTempFile;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the metadata entry inside every archive.
pub const COMIC_INFO_FILE_NAME: &str = "ComicInfo.xml";

/// Errors that can occur while writing a chapter archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Failed to create the manga directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to create the temporary archive file.
    #[error("Failed to create temporary file in '{path}': {source}")]
    TempFile {
        /// Directory the temporary file was created in.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write an archive entry.
    #[error("Failed to write archive entry: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Failed to write entry contents.
    #[error("Failed to write archive contents: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize `ComicInfo.xml`.
    #[error("Failed to serialize ComicInfo.xml: {0}")]
    Metadata(String),

    /// A blocking archive step panicked or was cancelled.
    #[error("Archive task failed: {0}")]
    Blocking(String),

    /// Failed to move the finished archive into place.
    #[error("Failed to persist archive to '{path}': {source}")]
    Persist {
        /// The final archive path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// ComicRack metadata embedded in each archive.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename = "ComicInfo", rename_all = "PascalCase")]
pub struct ComicInfo {
    /// Chapter title.
    pub title: String,
    /// Manga title.
    pub series: String,
    /// Chapter number as given by the source.
    pub number: String,
    /// Volume number, if numeric.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<i32>,
    /// Manga description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,
    /// Year of original publication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Comma-separated authors.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub writer: String,
    /// Comma-separated genres.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub genre: String,
    /// Comma-separated tags.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tags: String,
    /// Chapter URL.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub web: String,
    /// Number of image pages.
    pub page_count: usize,
    /// Original language of the work.
    #[serde(rename = "LanguageISO", skip_serializing_if = "String::is_empty")]
    pub language_iso: String,
    /// Reading direction flag.
    pub manga: String,
}

impl ComicInfo {
    /// Builds the metadata for `chapter` with `page_count` pages.
    #[must_use]
    pub fn from_chapter(chapter: &Chapter, page_count: usize) -> Self {
        let manga = &chapter.manga;
        let title = chapter
            .name
            .clone()
            .filter(|name| !name.trim().is_empty() && name != chapter.number.as_str())
            .unwrap_or_else(|| format!("Chapter {}", chapter.number));

        Self {
            title,
            series: manga.title.clone(),
            number: chapter.number.to_string(),
            volume: chapter
                .volume
                .as_deref()
                .and_then(|v| v.trim().parse().ok()),
            summary: manga.description.clone(),
            year: manga.year,
            writer: manga.authors.join(", "),
            genre: manga.tags.join(", "),
            tags: manga.tags.join(", "),
            web: chapter.url.clone(),
            page_count,
            language_iso: manga.original_language.clone().unwrap_or_default(),
            manga: "YesAndRightToLeft".to_string(),
        }
    }

    /// Serializes to an XML document.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Metadata`] if serialization fails.
    pub fn to_xml(&self) -> Result<String, ArchiveError> {
        let body = quick_xml::se::to_string(self).map_err(|e| ArchiveError::Metadata(e.to_string()))?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{body}"))
    }
}

/// A chapter archive being written.
///
/// Entries go to a temporary file next to the destination; the archive only
/// appears under its final name after [`finish`](Self::finish). Dropping an
/// unfinished archive deletes the temporary file.
#[derive(Debug)]
pub struct ChapterArchive {
    writer: ZipWriter<NamedTempFile>,
    destination: PathBuf,
    pages: usize,
}

impl ChapterArchive {
    /// Starts a new archive that will be persisted at `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory or temporary file cannot be created.
    pub fn create(destination: &Path) -> Result<Self, ArchiveError> {
        let dir = destination.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|source| ArchiveError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let file = tempfile::Builder::new()
            .prefix(".tankobon-")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|source| ArchiveError::TempFile {
                path: dir.to_path_buf(),
                source,
            })?;

        Ok(Self {
            writer: ZipWriter::new(file),
            destination: destination.to_path_buf(),
            pages: 0,
        })
    }

    /// Returns the path the archive will be persisted at.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Number of pages written so far.
    #[must_use]
    pub const fn pages(&self) -> usize {
        self.pages
    }

    /// Writes `ComicInfo.xml`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn add_comic_info(&mut self, info: &ComicInfo) -> Result<(), ArchiveError> {
        let xml = info.to_xml()?;
        self.writer.start_file(COMIC_INFO_FILE_NAME, options())?;
        self.writer.write_all(xml.as_bytes())?;
        Ok(())
    }

    /// Appends the next page, named by its zero-padded index.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn add_page(&mut self, extension: &str, data: &[u8]) -> Result<(), ArchiveError> {
        let name = format!("{:04}.{extension}", self.pages);
        self.writer.start_file(name, options())?;
        self.writer.write_all(data)?;
        self.pages += 1;
        Ok(())
    }

    /// Finalizes the archive and moves it to its destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be finalized or moved.
    pub fn finish(self) -> Result<PathBuf, ArchiveError> {
        let file = self.writer.finish()?;
        file.persist(&self.destination)
            .map_err(|e| ArchiveError::Persist {
                path: self.destination.clone(),
                source: e.error,
            })?;
        Ok(self.destination)
    }
}

/// Runs a synchronous archive step on the blocking thread pool.
///
/// Zip writes, directory creation and the final rename hit the filesystem
/// and must not stall the async executor.
pub(crate) async fn run_blocking<T, F>(step: F) -> Result<T, ArchiveError>
where
    F: FnOnce() -> Result<T, ArchiveError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(step)
        .await
        .map_err(|e| ArchiveError::Blocking(format!("spawn_blocking failed: {e}")))?
}

fn options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
}

/// File extension of an image URL, defaulting to `jpg`.
pub(crate) fn image_extension(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|url| {
            Path::new(url.path())
                .extension()
                .and_then(|ext| ext.to_str())
                .filter(|ext| !ext.is_empty() && ext.len() <= 5)
                .map(str::to_ascii_lowercase)
        })
        .unwrap_or_else(|| "jpg".to_string())
}
