//! Manga (publication) definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a manga on one source.
///
/// Two connectors may carry the same publication id for unrelated works, so
/// the connector name is part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MangaId {
    /// Name of the connector the manga was fetched from (e.g., "Bato").
    pub connector: String,
    /// Source-specific publication identifier.
    pub publication_id: String,
}

impl MangaId {
    /// Creates a new manga identity.
    #[must_use]
    pub fn new(connector: impl Into<String>, publication_id: impl Into<String>) -> Self {
        Self {
            connector: connector.into(),
            publication_id: publication_id.into(),
        }
    }
}

impl fmt::Display for MangaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.connector, self.publication_id)
    }
}

/// A publication as described by its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manga {
    /// Source identity.
    pub id: MangaId,
    /// Main (sort) title.
    pub title: String,
    /// Alternative titles, in source order.
    #[serde(default)]
    pub alt_titles: Vec<String>,
    /// Author and artist names.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Synopsis.
    #[serde(default)]
    pub description: String,
    /// Genre tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Remote cover image URL.
    #[serde(default)]
    pub cover_url: Option<String>,
    /// Year of original publication.
    #[serde(default)]
    pub year: Option<i32>,
    /// Language the work was translated from.
    #[serde(default)]
    pub original_language: Option<String>,
    /// Release status as reported by the source (e.g., "Ongoing").
    #[serde(default)]
    pub status: Option<String>,
    /// Canonical URL of the manga page on the source.
    pub url: String,
}

impl Manga {
    /// Creates a manga with only the required fields set.
    #[must_use]
    pub fn new(id: MangaId, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            alt_titles: Vec::new(),
            authors: Vec::new(),
            description: String::new(),
            tags: Vec::new(),
            cover_url: None,
            year: None,
            original_language: None,
            status: None,
            url: url.into(),
        }
    }

    /// Returns the name of the connector this manga belongs to.
    #[must_use]
    pub fn connector(&self) -> &str {
        &self.id.connector
    }

    /// Returns the source-specific publication id.
    #[must_use]
    pub fn publication_id(&self) -> &str {
        &self.id.publication_id
    }

    /// Directory name used for this manga below the download location.
    #[must_use]
    pub fn folder_name(&self) -> String {
        let folder = sanitize_filename::sanitize(self.title.trim());
        if folder.is_empty() {
            sanitize_filename::sanitize(&self.id.publication_id)
        } else {
            folder
        }
    }
}

impl fmt::Display for Manga {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.id)
    }
}
