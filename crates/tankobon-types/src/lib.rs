//! Core types for the tankobon manga download agent.
//!
//! This crate provides the data structures shared by every other crate:
//!
//! - [`Manga`] / [`MangaId`] - A publication on a specific source
//! - [`Chapter`] / [`ChapterNumber`] - A chapter and its numeric ordering key
//! - [`ProgressToken`] - Cancellable lifecycle and progress handle of one task
//! - [`Settings`] - Application context passed to connectors and the scheduler

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/tankobon-rs/tankobon/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod chapter;
mod error;
mod manga;
mod progress;
mod settings;

pub use chapter::{ARCHIVE_EXTENSION, Chapter, ChapterNumber, sort_chapters};
pub use error::ChapterNumberError;
pub use manga::{Manga, MangaId};
pub use progress::{Cancelled, ProgressSnapshot, ProgressToken, TokenState};
pub use settings::{GotifySettings, KomgaSettings, Settings, SettingsError};
