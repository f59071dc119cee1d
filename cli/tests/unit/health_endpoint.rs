//! Tests for the health endpoint routes and its plain-HTTP forwarding.

#![allow(clippy::expect_used)]

use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use axum::routing::{any, get};
use cs_cli::application::ports::RestartRecorder;
use cs_cli::domain::{ForwardTarget, MonitorError, TlsMode};
use cs_cli::infra::health::{HealthEndpoint, router};
use cs_cli::infra::metrics::MetricsRegistry;
use cs_cli::infra::proxy::ForwardingProxy;
use http::{StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

// ── Helpers ───────────────────────────────────────────────────────────────────

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

fn get_request(uri: &str) -> Request {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

/// Serve `app` on an ephemeral loopback port and return its base URL.
async fn spawn_upstream(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind upstream");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("upstream serve");
    });
    format!("http://{addr}")
}

fn plain_proxy(url: &str) -> ForwardingProxy {
    ForwardingProxy::new(&ForwardTarget::new(url, TlsMode::SystemTrust))
        .expect("proxy should build")
}

// ── /metrics ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn metrics_reports_startup_sentinel() {
    let app = router(MetricsRegistry::new(), None);
    let response = app.oneshot(get_request("/metrics")).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .expect("content type")
        .to_str()
        .expect("ascii")
        .to_string();
    assert!(content_type.contains("text"), "{content_type}");
    let text = body_text(response).await;
    assert!(text.contains(r#"cs_monitor_restarts_total{return_code=""} 1"#), "{text}");
}

#[tokio::test]
async fn metrics_reflect_recorded_exits() {
    let metrics = MetricsRegistry::new();
    let app = router(metrics.clone(), None);
    metrics.increment_restart("1");

    let text = body_text(app.oneshot(get_request("/metrics")).await.expect("response")).await;
    assert!(text.contains(r#"cs_monitor_restarts_total{return_code="1"} 1"#), "{text}");
    assert!(text.contains(r#"cs_monitor_restarts_total{return_code=""} 1"#), "{text}");
}

// ── / without forward ────────────────────────────────────────────────────────

#[tokio::test]
async fn root_redirects_to_metrics_without_forward() {
    let app = router(MetricsRegistry::new(), None);
    let response = app.oneshot(get_request("/")).await.expect("response");

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers().get(header::LOCATION).expect("location"),
        "/metrics"
    );
}

#[tokio::test]
async fn any_other_path_redirects_too() {
    let app = router(MetricsRegistry::new(), None);
    let response = app.oneshot(get_request("/healthz")).await.expect("response");
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
}

// ── / with forward ───────────────────────────────────────────────────────────

#[tokio::test]
async fn root_relays_upstream_status_and_body() {
    let upstream = spawn_upstream(Router::new().route(
        "/health",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "warming up") }),
    ))
    .await;
    let app = router(
        MetricsRegistry::new(),
        Some(plain_proxy(&format!("{upstream}/health"))),
    );

    let response = app.oneshot(get_request("/")).await.expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_text(response).await, "warming up");
}

#[tokio::test]
async fn metrics_stays_local_with_forward() {
    let upstream = spawn_upstream(Router::new()).await;
    let app = router(MetricsRegistry::new(), Some(plain_proxy(&upstream)));

    let response = app.oneshot(get_request("/metrics")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("cs_monitor_restarts_total"));
}

#[tokio::test]
async fn method_path_and_body_are_forwarded() {
    let upstream = spawn_upstream(Router::new().route(
        "/api/{*rest}",
        any(|req: Request| async move {
            let method = req.method().clone();
            let path = req.uri().path().to_string();
            let body = req
                .into_body()
                .collect()
                .await
                .expect("body")
                .to_bytes();
            format!("{method} {path} {}", String::from_utf8_lossy(&body))
        }),
    ))
    .await;
    let app = router(
        MetricsRegistry::new(),
        Some(plain_proxy(&format!("{upstream}/api"))),
    );

    let request = Request::builder()
        .method("POST")
        .uri("/ready")
        .body(Body::from("ping"))
        .expect("valid request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "POST /api/ready ping");
}

#[tokio::test]
async fn unreachable_upstream_is_502_with_error_text() {
    // Bind then drop to get a port that refuses connections.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let app = router(
        MetricsRegistry::new(),
        Some(plain_proxy(&format!("http://{addr}/health"))),
    );
    let response = app.oneshot(get_request("/")).await.expect("response");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let text = body_text(response).await;
    assert!(text.starts_with("Error forwarding request"), "{text}");
}

// ── Listener lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn start_serves_in_background_until_shutdown() {
    let endpoint = HealthEndpoint::start("127.0.0.1:0", MetricsRegistry::new(), None)
        .await
        .expect("endpoint should start");
    let base = format!("http://{}", endpoint.local_addr());

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("client");
    let metrics = client
        .get(format!("{base}/metrics"))
        .send()
        .await
        .expect("scrape");
    assert_eq!(metrics.status(), StatusCode::OK);

    let root = client.get(format!("{base}/")).send().await.expect("root");
    assert_eq!(root.status(), StatusCode::MOVED_PERMANENTLY);

    endpoint.shutdown().await;
    assert!(client.get(format!("{base}/metrics")).send().await.is_err());
}

#[tokio::test]
async fn address_in_use_is_a_bind_error() {
    let first = HealthEndpoint::start("127.0.0.1:0", MetricsRegistry::new(), None)
        .await
        .expect("first endpoint should start");
    let taken = first.local_addr().to_string();

    let err = HealthEndpoint::start(&taken, MetricsRegistry::new(), None)
        .await
        .expect_err("second bind must fail");
    assert!(matches!(err, MonitorError::Bind { .. }), "{err}");

    first.shutdown().await;
}

#[tokio::test]
async fn malformed_address_is_rejected() {
    let err = HealthEndpoint::start("no-port-here", MetricsRegistry::new(), None)
        .await
        .expect_err("address without port must fail");
    assert!(matches!(err, MonitorError::InvalidAddress(_)), "{err}");
}
