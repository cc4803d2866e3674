//! HTTP client shared by connectors.

use crate::rate_limit::{RateLimitConfig, RateLimiter, RequestClass};
use crate::result::RequestResult;
use reqwest::Client;
use reqwest::header::REFERER;
use std::sync::Arc;
use std::time::Duration;
use tankobon_types::Settings;

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Total time allowed for one request, including the body.
    pub timeout: Duration,
    /// Time allowed for establishing a connection.
    pub connect_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("tankobon/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&Settings> for ClientConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            timeout: settings.request_timeout(),
            user_agent: settings.user_agent.clone(),
            ..Self::default()
        }
    }
}

/// HTTP client that throttles requests per [`RequestClass`].
///
/// Clones share the underlying connection pool and rate limiter, so one
/// connector's limits hold across every task using it. Requests never return
/// an error; see [`RequestResult`].
#[derive(Debug, Clone)]
pub struct RateLimitedClient {
    client: Client,
    limiter: Arc<RateLimiter>,
    config: ClientConfig,
}

impl RateLimitedClient {
    /// Creates a new client with the given configuration and limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ClientConfig, limits: RateLimitConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::new(limits)),
            config,
        })
    }

    /// Creates a client with default configuration and the given limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_limits(limits: RateLimitConfig) -> Result<Self, reqwest::Error> {
        Self::new(ClientConfig::default(), limits)
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the rate limits enforced by this client.
    #[must_use]
    pub fn limits(&self) -> &RateLimitConfig {
        self.limiter.config()
    }

    /// Issues a GET request for `url` under `class`.
    ///
    /// Waits for the class's rate limit before sending.
    pub async fn request(&self, url: &str, class: RequestClass) -> RequestResult {
        self.request_with_referer(url, class, None).await
    }

    /// Issues a GET request for `url` under `class`, sending a `Referer` header if given.
    pub async fn request_with_referer(
        &self,
        url: &str,
        class: RequestClass,
        referer: Option<&str>,
    ) -> RequestResult {
        self.limiter.acquire(class).await;

        let mut request = self.client.get(url);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url, class = %class, error = %e, "request failed");
                return RequestResult::from_reqwest_error(class, &e);
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url, class = %class, status = status.as_u16(), "request returned error status");
            return RequestResult::new(class, status, None);
        }

        match response.bytes().await {
            Ok(body) => {
                tracing::trace!(url, class = %class, bytes = body.len(), "request succeeded");
                RequestResult::new(class, status, Some(body))
            }
            Err(e) => {
                tracing::debug!(url, class = %class, error = %e, "failed to read response body");
                RequestResult::from_reqwest_error(class, &e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("tankobon/"));
    }

    #[test]
    fn test_client_config_from_settings() {
        let settings = Settings {
            user_agent: "custom-agent".to_string(),
            request_timeout_secs: 5,
            ..Settings::default()
        };
        let config = ClientConfig::from(&settings);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "custom-agent");
    }

    #[tokio::test]
    async fn test_clones_share_limiter() {
        let client = RateLimitedClient::with_limits(RateLimitConfig::new().per_minute(1, 30)).unwrap();
        let clone = client.clone();
        assert!(Arc::ptr_eq(&client.limiter, &clone.limiter));
        assert_eq!(clone.limits().interval(RequestClass(1)), Duration::from_secs(2));
    }
}
