//! Chapter definitions and ordering.

use crate::{ChapterNumberError, Manga};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File extension of packaged chapter archives.
pub const ARCHIVE_EXTENSION: &str = "cbz";

/// Exact decimal chapter number (e.g., `"10"`, `"10.5"`, `"007"`).
///
/// Sources publish chapter numbers as text. Comparing them as strings sorts
/// `"10"` before `"2"` and comparing them as floats loses exactness, so the
/// number is kept as its integer and fraction digit strings. Leading zeros of
/// the integer part and trailing zeros of the fraction are insignificant:
/// `"007" == "7"` and `"10.50" == "10.5"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChapterNumber {
    raw: String,
    integer: String,
    fraction: String,
}

impl ChapterNumber {
    /// Parses a chapter number. Both `.` and `,` are accepted as decimal separator.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or is not a non-negative decimal.
    pub fn parse(input: &str) -> Result<Self, ChapterNumberError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(ChapterNumberError::Empty);
        }

        let (integer, fraction) = match raw.split_once(['.', ',']) {
            Some((integer, fraction)) => (integer, fraction),
            None => (raw, ""),
        };

        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !is_digits(integer) || !is_digits(fraction) || (integer.is_empty() && fraction.is_empty())
        {
            return Err(ChapterNumberError::Invalid(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            integer: integer.trim_start_matches('0').to_string(),
            fraction: fraction.trim_end_matches('0').to_string(),
        })
    }

    /// Returns the number exactly as the source published it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true if the number has no fractional part.
    #[must_use]
    pub const fn is_integral(&self) -> bool {
        self.fraction.is_empty()
    }
}

impl PartialEq for ChapterNumber {
    fn eq(&self, other: &Self) -> bool {
        self.integer == other.integer && self.fraction == other.fraction
    }
}

impl Eq for ChapterNumber {}

impl Hash for ChapterNumber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.integer.hash(state);
        self.fraction.hash(state);
    }
}

impl Ord for ChapterNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        // Without leading zeros a longer integer part is a larger number.
        self.integer
            .len()
            .cmp(&other.integer.len())
            .then_with(|| self.integer.cmp(&other.integer))
            .then_with(|| self.fraction.cmp(&other.fraction))
    }
}

impl PartialOrd for ChapterNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ChapterNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let integer = if self.integer.is_empty() { "0" } else { &self.integer };
        if self.fraction.is_empty() {
            write!(f, "{integer}")
        } else {
            write!(f, "{integer}.{}", self.fraction)
        }
    }
}

impl FromStr for ChapterNumber {
    type Err = ChapterNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ChapterNumber {
    type Error = ChapterNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ChapterNumber> for String {
    fn from(value: ChapterNumber) -> Self {
        value.raw
    }
}

/// A single chapter of a manga.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// The manga this chapter belongs to.
    pub manga: Manga,
    /// Chapter title, if the source provides one.
    pub name: Option<String>,
    /// Volume label, if the source groups chapters into volumes.
    pub volume: Option<String>,
    /// Ordering key within the manga.
    pub number: ChapterNumber,
    /// URL of the chapter reader page.
    pub url: String,
}

impl Chapter {
    /// Creates a new chapter.
    #[must_use]
    pub const fn new(
        manga: Manga,
        name: Option<String>,
        volume: Option<String>,
        number: ChapterNumber,
        url: String,
    ) -> Self {
        Self {
            manga,
            name,
            volume,
            number,
            url,
        }
    }

    /// Archive file name without directory, e.g. `Vol.2 Ch.10.5 - Title.cbz`.
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        let mut stem = String::new();
        if let Some(volume) = self.volume.as_deref().filter(|v| !v.trim().is_empty()) {
            stem.push_str(&format!("Vol.{} ", volume.trim()));
        }
        stem.push_str(&format!("Ch.{}", self.number));
        if let Some(name) = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty() && *n != self.number.as_str())
        {
            stem.push_str(&format!(" - {name}"));
        }
        format!(
            "{}.{ARCHIVE_EXTENSION}",
            sanitize_filename::sanitize(stem)
        )
    }

    /// Final archive location for this chapter below `download_location`.
    #[must_use]
    pub fn archive_path(&self, download_location: &Path) -> PathBuf {
        download_location
            .join(self.manga.folder_name())
            .join(self.archive_file_name())
    }

    /// Returns true if the finished archive already exists on disk.
    #[must_use]
    pub fn is_downloaded(&self, download_location: &Path) -> bool {
        self.archive_path(download_location).is_file()
    }
}

impl fmt::Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Ch.{}", self.manga.title, self.number)?;
        if let Some(name) = &self.name {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}

/// Sorts chapters ascending by number.
///
/// The sort is stable, so chapters sharing a number keep their discovery order.
pub fn sort_chapters(chapters: &mut [Chapter]) {
    chapters.sort_by(|a, b| a.number.cmp(&b.number));
}
