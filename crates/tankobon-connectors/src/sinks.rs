//! Post-download sinks: library servers to rescan and push services to notify.

use crate::library::{Komga, LibraryConnector};
use crate::notification::{Gotify, NotificationConnector};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tankobon_fetch::ClientConfig;
use tankobon_types::{Chapter, Settings};
use thiserror::Error;

/// Errors reported by a library or notification connector.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The request could not be sent or its body could not be decoded.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} answered {status}")]
    Status {
        /// The requested URL.
        url: String,
        /// Status returned by the server.
        status: StatusCode,
    },
}

/// Builds the plain HTTP client used by sinks.
///
/// Sinks talk to self-hosted servers, so requests are not rate limited.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub(crate) fn sink_client(config: &ClientConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .build()
}

/// Fails with [`SinkError::Status`] unless `response` is a success.
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SinkError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SinkError::Status {
            url: response.url().to_string(),
            status,
        })
    }
}

/// Library and notification connectors told about every finished chapter.
#[derive(Debug, Clone, Default)]
pub struct Sinks {
    libraries: Vec<Arc<dyn LibraryConnector>>,
    notifications: Vec<Arc<dyn NotificationConnector>>,
}

impl Sinks {
    /// Creates an empty set; finished chapters go nowhere.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the sinks configured in `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be created.
    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        let config = ClientConfig::from(settings);
        let mut sinks = Self::new();
        if let Some(komga) = &settings.komga {
            sinks.add_library(Arc::new(Komga::new(komga, &config)?));
        }
        if let Some(gotify) = &settings.gotify {
            sinks.add_notification(Arc::new(Gotify::new(gotify, &config)?));
        }
        Ok(sinks)
    }

    /// Adds a library server to rescan.
    pub fn add_library(&mut self, library: Arc<dyn LibraryConnector>) {
        tracing::debug!(library = library.name(), "registered library connector");
        self.libraries.push(library);
    }

    /// Adds a push service to notify.
    pub fn add_notification(&mut self, notification: Arc<dyn NotificationConnector>) {
        tracing::debug!(notification = notification.name(), "registered notification connector");
        self.notifications.push(notification);
    }

    /// Returns true if no sink is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty() && self.notifications.is_empty()
    }

    /// Rescans every library and sends one notification for `chapter`.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn chapter_downloaded(&self, chapter: &Chapter) {
        let title = format!("{} downloaded", chapter.manga.title);
        let message = chapter.to_string();
        for notification in &self.notifications {
            if let Err(e) = notification.notify(&title, &message).await {
                tracing::warn!(notification = notification.name(), error = %e, "failed to send notification");
            }
        }

        for library in &self.libraries {
            if let Err(e) = library.update_library().await {
                tracing::warn!(library = library.name(), error = %e, "failed to update library");
            }
        }
    }
}
