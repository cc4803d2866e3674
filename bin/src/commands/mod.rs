//! CLI command implementations.

pub(crate) mod chapters;
pub(crate) mod config;
pub(crate) mod connectors;
pub(crate) mod download;
pub(crate) mod monitor;
pub(crate) mod search;

use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use std::sync::Arc;
use tankobon_lib::prelude::*;

/// Resolved settings and flags shared by every command.
pub(crate) struct App {
    pub(crate) settings: Arc<Settings>,
    pub(crate) config_path: PathBuf,
    pub(crate) quiet: bool,
}

impl App {
    /// Loads `config.toml` (writing defaults on first run) and applies CLI overrides.
    pub(crate) fn load(
        config: Option<PathBuf>,
        download_dir: Option<PathBuf>,
        quiet: bool,
    ) -> Result<Self> {
        let config_path = config.unwrap_or_else(Settings::default_path);
        let mut settings = Settings::load_or_init(&config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?;
        if let Some(dir) = download_dir {
            settings = settings.with_download_location(dir);
        }

        tracing::debug!(
            config = %config_path.display(),
            download_location = %settings.download_location.display(),
            "settings loaded"
        );

        Ok(Self {
            settings: Arc::new(settings),
            config_path,
            quiet,
        })
    }

    /// Builds the registry of built-in connectors.
    pub(crate) fn connectors(&self) -> Result<ConnectorRegistry> {
        ConnectorRegistry::with_builtin(&self.settings).context("Failed to build HTTP client")
    }

    /// Looks up a connector by name, case-insensitively.
    pub(crate) fn connector(&self, name: &str) -> Result<Arc<dyn Connector>> {
        let registry = self.connectors()?;
        registry.get(name).ok_or_else(|| {
            anyhow!(
                "Unknown connector: {name}. Available: {}",
                registry.names().collect::<Vec<_>>().join(", ")
            )
        })
    }

    /// Creates a job registry over the built-in connectors, reporting
    /// finished chapters to the configured Komga and Gotify servers.
    pub(crate) fn job_boss(&self) -> Result<JobBoss> {
        let sinks = Sinks::from_settings(&self.settings).context("Failed to build HTTP client")?;
        Ok(JobBoss::with_sinks(
            Arc::clone(&self.settings),
            self.connectors()?,
            sinks,
        ))
    }
}

/// Resolves a manga page through `connector`.
pub(crate) async fn fetch_manga(connector: &dyn Connector, url: &str) -> Result<Manga> {
    connector
        .fetch_manga(url)
        .await
        .with_context(|| format!("{} could not load manga from {url}", connector.name()))
}
