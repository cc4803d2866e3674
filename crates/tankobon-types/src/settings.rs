//! Application settings shared by connectors and the job scheduler.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading or saving settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read the settings file.
    #[error("Failed to read settings file '{path}': {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write the settings file.
    #[error("Failed to write settings file '{path}': {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to create a directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`Settings`].
    #[error("Failed to parse settings file '{path}': {source}")]
    Parse {
        /// The path that could not be parsed.
        path: PathBuf,
        /// The underlying TOML error.
        source: toml::de::Error,
    },

    /// Failed to serialize settings.
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application context handed to every connector and to the job scheduler.
///
/// Loaded from `config.toml`; keys missing from the file take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root directory for downloaded chapter archives.
    pub download_location: PathBuf,
    /// Directory for cached cover images.
    pub cover_cache: PathBuf,
    /// User agent sent with every outbound request.
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Monitor interval used when none is given explicitly, in seconds.
    pub default_monitor_interval_secs: u64,
    /// Komga server to rescan after each downloaded chapter.
    pub komga: Option<KomgaSettings>,
    /// Gotify server to notify after each downloaded chapter.
    pub gotify: Option<GotifySettings>,
}

/// Connection details for a Komga library server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KomgaSettings {
    /// Base URL, e.g. `http://localhost:25600`.
    pub url: String,
    /// Account used for HTTP basic auth.
    pub username: String,
    /// Password for [`username`](Self::username).
    pub password: String,
}

/// Connection details for a Gotify push server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GotifySettings {
    /// Base URL, e.g. `http://localhost:8080`.
    pub url: String,
    /// Application token sent as `X-Gotify-Key`.
    pub app_token: String,
}

impl Default for Settings {
    fn default() -> Self {
        let (data_dir, cache_dir) = ProjectDirs::from("", "", "tankobon").map_or_else(
            || (dirs_fallback(), dirs_fallback().join("cache")),
            |dirs| (dirs.data_dir().to_path_buf(), dirs.cache_dir().to_path_buf()),
        );

        Self {
            download_location: data_dir.join("manga"),
            cover_cache: cache_dir.join("covers"),
            user_agent: format!("tankobon/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
            default_monitor_interval_secs: 60 * 60,
            komga: None,
            gotify: None,
        }
    }
}

impl Settings {
    /// Returns the default location of `config.toml`.
    ///
    /// Uses the `directories` crate (`~/.config/tankobon/config.toml` on Linux),
    /// falling back to `~/.tankobon/config.toml`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "tankobon").map_or_else(
            || dirs_fallback().join("config.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }

    /// Loads settings from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|e| SettingsError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Loads settings from `path`, writing the defaults there first if the file
    /// does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created, read, or parsed.
    pub fn load_or_init(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            return Self::load(path);
        }

        let settings = Self::default();
        settings.save(path)?;
        tracing::info!(path = %path.display(), "created default settings");
        Ok(settings)
    }

    /// Writes these settings to `path` as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SettingsError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| SettingsError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Returns a copy with a different download location.
    #[must_use]
    pub fn with_download_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.download_location = path.into();
        self
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Monitor interval used when none is given explicitly.
    #[must_use]
    pub const fn default_monitor_interval(&self) -> Duration {
        Duration::from_secs(self.default_monitor_interval_secs)
    }
}

/// Fallback for determining the home directory.
fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".tankobon")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.default_monitor_interval(), Duration::from_secs(3600));
        assert!(settings.user_agent.starts_with("tankobon/"));
        assert!(settings.download_location.ends_with("manga"));
    }

    #[test]
    fn test_load_or_init_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let settings = Settings::load_or_init(&path).unwrap();
        assert!(path.exists());
        assert_eq!(settings, Settings::default());

        let reloaded = Settings::load(&path).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "download_location = \"/srv/manga\"\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.download_location, PathBuf::from("/srv/manga"));
        assert_eq!(settings.request_timeout_secs, 30);
    }

    #[test]
    fn test_sink_tables() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[komga]\nurl = \"http://komga:25600\"\nusername = \"admin\"\npassword = \"secret\"\n\n\
             [gotify]\nurl = \"http://gotify\"\napp_token = \"AbC\"\n",
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.komga.as_ref().unwrap().username, "admin");
        assert_eq!(settings.gotify.as_ref().unwrap().app_token, "AbC");
        assert!(Settings::default().komga.is_none());

        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_parse_error_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "request_timeout_secs = \"soon\"").unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}
