use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::get;
use tokio::net::TcpListener;

use tankobon_fetch::{ClientConfig, RateLimitConfig, RateLimitedClient, RequestClass};

type Arrivals = Arc<Mutex<Vec<Instant>>>;

async fn start_server() -> (SocketAddr, Arrivals) {
    let arrivals: Arrivals = Arc::new(Mutex::new(Vec::new()));

    let app = Router::new()
        .route("/page", get(|| async { "<html><body><p class=\"x\">ok</p></body></html>" }))
        .route("/broken", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        )
        .route(
            "/referer",
            get(|headers: HeaderMap| async move {
                headers
                    .get(header::REFERER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string()
            }),
        )
        .route(
            "/counted",
            get(|State(arrivals): State<Arrivals>| async move {
                arrivals.lock().unwrap().push(Instant::now());
                "counted"
            }),
        )
        .with_state(Arc::clone(&arrivals));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, arrivals)
}

#[tokio::test]
async fn test_successful_request_returns_body() {
    let (addr, _) = start_server().await;
    let client = RateLimitedClient::with_limits(RateLimitConfig::new()).unwrap();

    let result = client
        .request(&format!("http://{addr}/page"), RequestClass(1))
        .await;

    assert!(result.is_success());
    let document = result.document().unwrap();
    let selector = scraper::Selector::parse("p.x").unwrap();
    assert_eq!(document.select(&selector).count(), 1);
}

#[tokio::test]
async fn test_server_error_is_reported_not_raised() {
    let (addr, _) = start_server().await;
    let client = RateLimitedClient::with_limits(RateLimitConfig::new()).unwrap();

    let result = client
        .request(&format!("http://{addr}/broken"), RequestClass(1))
        .await;

    assert_eq!(result.status().as_u16(), 500);
    assert!(!result.is_success());
    assert!(result.body().is_none());
    assert!(result.transport_error().is_none());
}

#[tokio::test]
async fn test_timeout_maps_to_request_timeout() {
    let (addr, _) = start_server().await;
    let config = ClientConfig {
        timeout: Duration::from_millis(200),
        ..ClientConfig::default()
    };
    let client = RateLimitedClient::new(config, RateLimitConfig::new()).unwrap();

    let result = client
        .request(&format!("http://{addr}/slow"), RequestClass(1))
        .await;

    assert_eq!(result.status().as_u16(), 408);
    assert!(result.transport_error().is_some());
}

#[tokio::test]
async fn test_connection_refused_maps_to_service_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RateLimitedClient::with_limits(RateLimitConfig::new()).unwrap();
    let result = client
        .request(&format!("http://{addr}/page"), RequestClass(1))
        .await;

    assert_eq!(result.status().as_u16(), 503);
    assert!(result.transport_error().is_some());
}

#[tokio::test]
async fn test_referer_header_is_sent() {
    let (addr, _) = start_server().await;
    let client = RateLimitedClient::with_limits(RateLimitConfig::new()).unwrap();

    let with = client
        .request_with_referer(
            &format!("http://{addr}/referer"),
            RequestClass(2),
            Some("https://example.org/chapter/1"),
        )
        .await;
    assert_eq!(with.text().as_deref(), Some("https://example.org/chapter/1"));

    let without = client
        .request(&format!("http://{addr}/referer"), RequestClass(2))
        .await;
    assert_eq!(without.text().as_deref(), Some("none"));
}

#[tokio::test]
async fn test_concurrent_requests_respect_class_interval() {
    let (addr, arrivals) = start_server().await;
    let interval = Duration::from_millis(150);
    let client =
        RateLimitedClient::with_limits(RateLimitConfig::new().with_interval(1, interval)).unwrap();
    let url = format!("http://{addr}/counted");

    let start = Instant::now();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            let url = url.clone();
            tokio::spawn(async move { client.request(&url, RequestClass(1)).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_success());
    }

    assert!(start.elapsed() >= interval * 3);
    assert_eq!(arrivals.lock().unwrap().len(), 4);
}
