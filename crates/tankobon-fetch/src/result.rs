//! Normalized outcome of a single outbound request.

use crate::rate_limit::RequestClass;
use bytes::Bytes;
use reqwest::StatusCode;
use scraper::Html;

/// Outcome of one request issued through [`RateLimitedClient`](crate::RateLimitedClient).
///
/// Transport failures never surface as errors: a timeout is reported as
/// `408 Request Timeout` and every other transport or body failure as
/// `503 Service Unavailable`, with the underlying message kept in
/// [`transport_error`](Self::transport_error).
#[derive(Debug, Clone)]
pub struct RequestResult {
    class: RequestClass,
    status: StatusCode,
    body: Option<Bytes>,
    transport_error: Option<String>,
}

impl RequestResult {
    /// Creates a result for a response that was received.
    ///
    /// The body is only retained for successful statuses.
    #[must_use]
    pub fn new(class: RequestClass, status: StatusCode, body: Option<Bytes>) -> Self {
        Self {
            class,
            status,
            body: body.filter(|_| status.is_success()),
            transport_error: None,
        }
    }

    /// Creates a result for a request that never produced a usable response.
    #[must_use]
    pub fn transport_failure(class: RequestClass, timed_out: bool, message: String) -> Self {
        let status = if timed_out {
            StatusCode::REQUEST_TIMEOUT
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        Self {
            class,
            status,
            body: None,
            transport_error: Some(message),
        }
    }

    pub(crate) fn from_reqwest_error(class: RequestClass, error: &reqwest::Error) -> Self {
        Self::transport_failure(class, error.is_timeout(), error.to_string())
    }

    /// Returns the request class the request was issued under.
    #[must_use]
    pub const fn class(&self) -> RequestClass {
        self.class
    }

    /// Returns the HTTP status, or the synthetic status of a transport failure.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the transport error message, if the request failed before a response arrived.
    #[must_use]
    pub fn transport_error(&self) -> Option<&str> {
        self.transport_error.as_deref()
    }

    /// Returns the response body of a successful request.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Consumes the result, returning the body of a successful request.
    #[must_use]
    pub fn into_body(self) -> Option<Bytes> {
        self.body
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }

    /// Parses the body as an HTML document.
    ///
    /// Returns `None` unless the request succeeded. The returned document is
    /// not `Send`; extract what you need before the next `.await`.
    #[must_use]
    pub fn document(&self) -> Option<Html> {
        self.text().map(|text| Html::parse_document(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_success_keeps_body() {
        let result = RequestResult::new(
            RequestClass(1),
            StatusCode::OK,
            Some(Bytes::from_static(b"hello")),
        );
        assert!(result.is_success());
        assert_eq!(result.text().as_deref(), Some("hello"));
        assert!(result.transport_error().is_none());
    }

    #[test]
    fn test_error_status_drops_body() {
        let result = RequestResult::new(
            RequestClass(1),
            StatusCode::NOT_FOUND,
            Some(Bytes::from_static(b"not found page")),
        );
        assert!(!result.is_success());
        assert!(result.body().is_none());
        assert!(result.document().is_none());
    }

    #[test]
    fn test_transport_failure_statuses() {
        let timeout = RequestResult::transport_failure(RequestClass(2), true, "timed out".into());
        assert_eq!(timeout.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(timeout.transport_error(), Some("timed out"));
        assert_eq!(timeout.class(), RequestClass(2));

        let refused = RequestResult::transport_failure(RequestClass(2), false, "refused".into());
        assert_eq!(refused.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_document_parses_html() {
        let result = RequestResult::new(
            RequestClass(1),
            StatusCode::OK,
            Some(Bytes::from_static(b"<html><body><h1>Title</h1></body></html>")),
        );
        let document = result.document().unwrap();
        let selector = Selector::parse("h1").unwrap();
        let heading: String = document.select(&selector).next().unwrap().text().collect();
        assert_eq!(heading, "Title");
    }
}
