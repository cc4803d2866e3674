//! Library servers rescanned after a chapter lands on disk.

use crate::sinks::{SinkError, check_status, sink_client};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt::Debug;
use tankobon_fetch::ClientConfig;
use tankobon_types::KomgaSettings;

/// A media server that indexes the download location.
#[async_trait]
pub trait LibraryConnector: Send + Sync + Debug {
    /// Display name used in logs.
    fn name(&self) -> &str;

    /// Asks the server to rescan its libraries.
    ///
    /// # Errors
    ///
    /// Returns an error if a request fails or the server rejects it.
    async fn update_library(&self) -> Result<(), SinkError>;
}

#[derive(Debug, Deserialize)]
struct Library {
    id: String,
}

/// [Komga](https://komga.org) library server.
///
/// Every library is scanned since the server decides which one watches the
/// download location.
#[derive(Debug, Clone)]
pub struct Komga {
    client: Client,
    base: String,
    username: String,
    password: String,
}

impl Komga {
    /// Creates a connector for the server in `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(settings: &KomgaSettings, config: &ClientConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: sink_client(config)?,
            base: settings.url.trim_end_matches('/').to_string(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    async fn libraries(&self) -> Result<Vec<Library>, SinkError> {
        let response = self
            .client
            .get(format!("{}/api/v1/libraries", self.base))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        Ok(check_status(response)?.json().await?)
    }
}

#[async_trait]
impl LibraryConnector for Komga {
    fn name(&self) -> &str {
        "Komga"
    }

    async fn update_library(&self) -> Result<(), SinkError> {
        let libraries = self.libraries().await?;
        for library in &libraries {
            let response = self
                .client
                .post(format!("{}/api/v1/libraries/{}/scan", self.base, library.id))
                .basic_auth(&self.username, Some(&self.password))
                .send()
                .await?;
            check_status(response)?;
        }
        tracing::info!(libraries = libraries.len(), "requested Komga scan");
        Ok(())
    }
}
