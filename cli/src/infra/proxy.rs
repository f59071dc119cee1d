//! Forwarding proxy behind the health endpoint's `/` route.
//!
//! Each incoming request becomes exactly one upstream request to the
//! configured target. Upstream failures are answered with `502 Bad Gateway`
//! and a body starting with [`FORWARD_ERROR_PREFIX`], followed by the full
//! error chain so certificate problems are visible to the caller.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use http::header::{self, HeaderMap};
use http::{StatusCode, Uri};
use reqwest::{Certificate, Client, Url};

use crate::domain::{ForwardTarget, MonitorError, TlsMode};

/// Upstream request timeout, connect through last body byte.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Upstream TCP + TLS connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest request body buffered for forwarding.
pub const MAX_REQUEST_BODY: usize = 16 * 1024 * 1024;

/// Start of every 502 body. Operators match on this text.
pub const FORWARD_ERROR_PREFIX: &str = "Error forwarding request";

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// HTTP client bound to one forward target.
#[derive(Debug, Clone)]
pub struct ForwardingProxy {
    client: Client,
    target: Url,
}

impl ForwardingProxy {
    /// Build the proxy and its TLS trust configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is not an absolute `http`/`https` URL,
    /// the CA file cannot be read or holds no certificates, or the HTTP client
    /// cannot be built.
    pub fn new(target: &ForwardTarget) -> Result<Self> {
        let url = Url::parse(&target.url)
            .with_context(|| format!("invalid forward URL '{}'", target.url))?;
        anyhow::ensure!(
            matches!(url.scheme(), "http" | "https"),
            "forward URL must use http or https, got '{}'",
            url.scheme()
        );

        Ok(Self {
            client: build_client(&target.tls_mode)?,
            target: url,
        })
    }

    /// The configured target URL.
    #[must_use]
    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Map an incoming request URI onto the target.
    ///
    /// A bare `/` maps to the target URL itself; any other path is appended
    /// to the target's path. The incoming query replaces the target's.
    #[must_use]
    pub fn upstream_url(&self, uri: &Uri) -> Url {
        let mut url = self.target.clone();
        let path = uri.path();
        if path != "/" {
            let base = url.path().trim_end_matches('/').to_string();
            url.set_path(&format!("{base}{path}"));
        }
        if let Some(query) = uri.query() {
            url.set_query(Some(query));
        }
        url
    }

    /// Forward `req` upstream and relay the response.
    ///
    /// Never fails: upstream errors become a `502` response.
    pub async fn forward(&self, req: Request) -> Response {
        match self.try_forward(req).await {
            Ok(response) => response,
            Err(e) => {
                let message = format!("{FORWARD_ERROR_PREFIX}: {e:#}");
                tracing::warn!(upstream = %self.target, error = %message, "forward failed");
                (StatusCode::BAD_GATEWAY, message).into_response()
            }
        }
    }

    async fn try_forward(&self, req: Request) -> Result<Response> {
        let (parts, body) = req.into_parts();
        let url = self.upstream_url(&parts.uri);
        let body = axum::body::to_bytes(body, MAX_REQUEST_BODY)
            .await
            .context("failed to read request body")?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);

        let upstream = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::CONTENT_LENGTH);
        let bytes = upstream.bytes().await?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

fn build_client(tls_mode: &TlsMode) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(UPSTREAM_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none());

    match tls_mode {
        TlsMode::SystemTrust => {
            // OS store (honours SSL_CERT_FILE / SSL_CERT_DIR) plus bundled webpki roots.
            builder = builder.tls_built_in_native_certs(true);
        }
        TlsMode::SkipVerify => {
            tracing::warn!("TLS certificate verification disabled for forward target");
            builder = builder.danger_accept_invalid_certs(true);
        }
        TlsMode::CustomCa(path) => {
            builder = builder.tls_built_in_root_certs(false);
            for cert in load_ca_certs(path)? {
                builder = builder.add_root_certificate(cert);
            }
        }
    }

    builder
        .build()
        .context("failed to build forwarding HTTP client")
}

/// Read every PEM certificate in `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or contains no
/// certificates.
pub fn load_ca_certs(path: &Path) -> Result<Vec<Certificate>> {
    let read_err = |source| MonitorError::CaCertRead {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_err)?;
    let mut reader = BufReader::new(file);
    let ders = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;
    if ders.is_empty() {
        return Err(MonitorError::CaCertEmpty(path.to_path_buf()).into());
    }

    ders.iter()
        .map(|der| {
            Certificate::from_der(der.as_ref())
                .with_context(|| format!("invalid CA certificate in {}", path.display()))
        })
        .collect()
}
