//! Health endpoint: `/metrics` plus either a redirect or the forwarding proxy.
//!
//! The listener is bound before `start` returns so an address conflict is
//! reported to the caller; serving then continues on a background task until
//! [`HealthEndpoint::shutdown`].

use std::net::SocketAddr;

use axum::Router;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use http::StatusCode;
use http::header::{CONTENT_TYPE, LOCATION};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::MonitorError;
use crate::domain::monitor::normalize_listen_address;
use crate::infra::metrics::MetricsRegistry;
use crate::infra::proxy::ForwardingProxy;

/// Build the endpoint's routes.
///
/// Every path other than `/metrics` goes to the proxy when one is given,
/// otherwise it is redirected (301) to `/metrics`.
pub fn router(metrics: MetricsRegistry, forward: Option<ForwardingProxy>) -> Router {
    let router = Router::new().route(
        "/metrics",
        get(move || {
            let metrics = metrics.clone();
            async move { ([(CONTENT_TYPE, MetricsRegistry::content_type())], metrics.encode()) }
        }),
    );

    match forward {
        Some(proxy) => router.fallback(move |req: Request| {
            let proxy = proxy.clone();
            async move { proxy.forward(req).await }
        }),
        None => router.fallback(redirect_to_metrics),
    }
}

async fn redirect_to_metrics() -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(LOCATION, "/metrics")]).into_response()
}

/// Running health endpoint.
#[derive(Debug)]
pub struct HealthEndpoint {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl HealthEndpoint {
    /// Bind `address` and serve in the background.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidAddress`] for a malformed address and
    /// [`MonitorError::Bind`] if the listener cannot be bound.
    pub async fn start(
        address: &str,
        metrics: MetricsRegistry,
        forward: Option<ForwardingProxy>,
    ) -> Result<Self, MonitorError> {
        let address = normalize_listen_address(address)?;
        let bind_err = |source| MonitorError::Bind {
            address: address.clone(),
            source,
        };
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        let forward_target = forward.as_ref().map(|p| p.target().to_string());
        let app = router(metrics, forward);

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.cancelled().await })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "health endpoint failed");
            }
        });

        tracing::info!(
            address = %local_addr,
            forward = forward_target.as_deref().unwrap_or("-"),
            "health endpoint listening"
        );

        Ok(Self {
            local_addr,
            shutdown,
            task,
        })
    }

    /// Address actually bound (resolves port `0`).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "health endpoint task did not finish cleanly");
        }
        tracing::info!("health endpoint stopped");
    }
}
