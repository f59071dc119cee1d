//! Forwarding to an HTTPS upstream under each TLS trust mode.
//!
//! The upstream presents `tests/fixtures/tls/server.pem`, issued for
//! `localhost` / `127.0.0.1` by `ca.pem`. Neither CA is in any public root
//! store.

#![allow(clippy::expect_used)]

use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use axum::routing::get;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use cs_cli::domain::{ForwardTarget, TlsMode};
use cs_cli::infra::health::router;
use cs_cli::infra::metrics::MetricsRegistry;
use cs_cli::infra::proxy::ForwardingProxy;
use http::StatusCode;
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::helpers::tls_fixture;

const UPSTREAM_BODY: &str = "healthy over tls";

/// Start an HTTPS upstream on an ephemeral port and return its `/health` URL.
async fn spawn_tls_upstream() -> String {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config =
        RustlsConfig::from_pem_file(tls_fixture("server.pem"), tls_fixture("server-key.pem"))
            .await
            .expect("fixture certificate should load");
    let app = Router::new().route("/health", get(|| async { UPSTREAM_BODY }));

    let handle = Handle::new();
    let server = axum_server::bind_rustls("127.0.0.1:0".parse().expect("addr"), config)
        .handle(handle.clone())
        .serve(app.into_make_service());
    tokio::spawn(async move {
        server.await.expect("tls upstream serve");
    });

    let addr = handle.listening().await.expect("tls upstream should listen");
    format!("https://localhost:{}/health", addr.port())
}

async fn get_root(tls_mode: TlsMode, url: &str) -> (StatusCode, String) {
    let proxy =
        ForwardingProxy::new(&ForwardTarget::new(url, tls_mode)).expect("proxy should build");
    let app = router(MetricsRegistry::new(), Some(proxy));
    let request = Request::builder()
        .uri("/")
        .body(Body::empty())
        .expect("valid request");
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn untrusted_certificate_is_502_with_verification_error() {
    let url = spawn_tls_upstream().await;
    let (status, body) = get_root(TlsMode::SystemTrust, &url).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("Error forwarding request"), "{body}");
    assert!(body.contains("certificate"), "{body}");
}

#[tokio::test]
async fn skip_verify_reaches_untrusted_upstream() {
    let url = spawn_tls_upstream().await;
    let (status, body) = get_root(TlsMode::SkipVerify, &url).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, UPSTREAM_BODY);
}

#[tokio::test]
async fn custom_ca_trusts_its_own_issuer() {
    let url = spawn_tls_upstream().await;
    let (status, body) = get_root(TlsMode::CustomCa(tls_fixture("ca.pem")), &url).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, UPSTREAM_BODY);
}

#[tokio::test]
async fn custom_ca_rejects_other_issuers() {
    let url = spawn_tls_upstream().await;
    let (status, body) = get_root(TlsMode::CustomCa(tls_fixture("other-ca.pem")), &url).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("Error forwarding request"), "{body}");
    assert!(body.contains("certificate"), "{body}");
}

#[tokio::test]
async fn skip_verify_ignores_a_supplied_ca() {
    let url = spawn_tls_upstream().await;
    let mode = TlsMode::from_flags(true, Some(tls_fixture("other-ca.pem")));
    let (status, body) = get_root(mode, &url).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, UPSTREAM_BODY);
}

#[test]
fn ca_file_without_certificates_is_rejected() {
    let err = ForwardingProxy::new(&ForwardTarget::new(
        "https://localhost:8443/",
        TlsMode::CustomCa(tls_fixture("server-key.pem")),
    ))
    .expect_err("a key file holds no certificates");
    assert!(err.to_string().contains("no PEM certificates"), "{err:#}");
}
