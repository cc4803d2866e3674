//! Library for monitoring manga sources and downloading chapters.
//!
//! This is a facade crate that re-exports functionality from the tankobon
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tankobon_lib::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Arc::new(Settings::default());
//!     let boss = JobBoss::new(Arc::clone(&settings), ConnectorRegistry::with_builtin(&settings)?);
//!     let scheduler = boss.start();
//!
//!     let bato = boss.connectors().get("bato").ok_or("no connector")?;
//!     let manga = bato
//!         .fetch_manga("https://bato.to/title/12345-example")
//!         .await
//!         .ok_or("not found")?;
//!
//!     boss.add_job(JobTask::MonitorManga {
//!         manga,
//!         interval: Duration::from_secs(3600),
//!     })?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     boss.shutdown();
//!     if let Some(scheduler) = scheduler {
//!         scheduler.await?;
//!     }
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/tankobon-rs/tankobon/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use tankobon_types::*;

// Re-export the rate-limited client
pub use tankobon_fetch::{
    ClientConfig, RateLimitConfig, RateLimitedClient, RateLimiter, RequestClass, RequestResult,
    StatusCode,
};

// Re-export connectors and archive packaging
#[cfg(feature = "connectors")]
pub use tankobon_connectors::{
    ArchiveError, Bato, COMIC_INFO_FILE_NAME, ChapterArchive, ChapterImages, ComicInfo, Connector,
    ConnectorRegistry, Gotify, Komga, LibraryConnector, NotificationConnector, SinkError, Sinks,
    cache_cover, download_chapter_images,
};

// Re-export the job scheduler
#[cfg(feature = "jobs")]
pub use tankobon_jobs::{
    Job, JobBoss, JobError, JobFilter, JobId, JobKey, JobKind, JobSnapshot, JobTask,
};

/// Prelude module for convenient imports.
///
/// ```
/// use tankobon_lib::prelude::*;
/// ```
pub mod prelude {
    pub use tankobon_types::{
        Chapter, ChapterNumber, Manga, MangaId, ProgressToken, Settings, TokenState,
    };

    pub use tankobon_fetch::{RateLimitConfig, RateLimitedClient, RequestClass, StatusCode};

    #[cfg(feature = "connectors")]
    pub use tankobon_connectors::{Connector, ConnectorRegistry, Sinks};

    #[cfg(feature = "jobs")]
    pub use tankobon_jobs::{JobBoss, JobError, JobFilter, JobKind, JobSnapshot, JobTask};
}
