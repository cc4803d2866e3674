//! Push services told about finished downloads.

use crate::sinks::{SinkError, check_status, sink_client};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::fmt::Debug;
use tankobon_fetch::ClientConfig;
use tankobon_types::GotifySettings;

/// A service that delivers short messages to the user.
#[async_trait]
pub trait NotificationConnector: Send + Sync + Debug {
    /// Display name used in logs.
    fn name(&self) -> &str;

    /// Sends one message.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service rejects it.
    async fn notify(&self, title: &str, message: &str) -> Result<(), SinkError>;
}

#[derive(Debug, Serialize)]
struct GotifyMessage<'a> {
    title: &'a str,
    message: &'a str,
    priority: u8,
}

/// [Gotify](https://gotify.net) push server.
#[derive(Debug, Clone)]
pub struct Gotify {
    client: Client,
    endpoint: String,
    app_token: String,
}

impl Gotify {
    /// Header carrying the application token.
    pub const TOKEN_HEADER: &'static str = "X-Gotify-Key";

    /// Priority of every message.
    const PRIORITY: u8 = 4;

    /// Creates a connector for the server in `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(settings: &GotifySettings, config: &ClientConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: sink_client(config)?,
            endpoint: format!("{}/message", settings.url.trim_end_matches('/')),
            app_token: settings.app_token.clone(),
        })
    }
}

#[async_trait]
impl NotificationConnector for Gotify {
    fn name(&self) -> &str {
        "Gotify"
    }

    async fn notify(&self, title: &str, message: &str) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(Self::TOKEN_HEADER, &self.app_token)
            .json(&GotifyMessage {
                title,
                message,
                priority: Self::PRIORITY,
            })
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }
}
