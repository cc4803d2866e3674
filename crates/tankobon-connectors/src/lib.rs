//! Manga source connectors and chapter archive packaging for tankobon.
//!
//! - [`Connector`] - Capability set every manga source implements
//! - [`ConnectorRegistry`] - Name-keyed, case-insensitive connector lookup
//! - [`ChapterArchive`] / [`ComicInfo`] - CBZ packaging with embedded metadata
//! - [`download_chapter_images`] - Shared chapter download routine
//! - [`Bato`] - Connector for bato.to
//! - [`Sinks`] - Library rescans and push notifications after each download

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/tankobon-rs/tankobon/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod archive;
mod bato;
mod connector;
mod covers;
mod download;
mod library;
mod notification;
mod registry;
mod sinks;

pub use archive::{ArchiveError, COMIC_INFO_FILE_NAME, ChapterArchive, ComicInfo};
pub use bato::Bato;
pub use connector::{ChapterImages, Connector};
pub use covers::cache_cover;
pub use download::download_chapter_images;
pub use library::{Komga, LibraryConnector};
pub use notification::{Gotify, NotificationConnector};
pub use registry::ConnectorRegistry;
pub use sinks::{SinkError, Sinks};
