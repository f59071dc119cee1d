//! Monitor command: supervise a command and expose restart metrics.
//!
//! Composition root for the monitor: builds the metrics registry and the
//! optional forwarding proxy, binds the health endpoint, wires OS signals to a
//! cancellation token, then hands control to the `Supervisor` loop.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::application::services::monitor::Supervisor;
use crate::domain::monitor::DEFAULT_LISTEN_ADDRESS;
use crate::domain::{ForwardTarget, MonitorError, RestartBudget, TlsMode};
use crate::infra::clock::SystemClock;
use crate::infra::health::HealthEndpoint;
use crate::infra::metrics::MetricsRegistry;
use crate::infra::process::StreamingProcessRunner;
use crate::infra::proxy::ForwardingProxy;
use crate::infra::signals::cancel_on_shutdown_signal;

/// Arguments for the monitor command.
#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Health endpoint bind address
    #[arg(long, env = "CS_MONITOR_ADDRESS", default_value = DEFAULT_LISTEN_ADDRESS)]
    pub address: String,

    /// Maximum restarts after the first run (-1 = unlimited)
    #[arg(
        long,
        env = "CS_MONITOR_MAX_RESTARTS",
        default_value_t = -1,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i64).range(-1..)
    )]
    pub max_restarts: i64,

    /// Proxy `/` to this URL instead of redirecting to /metrics
    #[arg(long, env = "CS_MONITOR_FORWARD", value_name = "URL")]
    pub forward: Option<String>,

    /// Skip TLS certificate verification for the forward target
    #[arg(long, env = "CS_MONITOR_INSECURE_SKIP_VERIFY")]
    pub insecure_skip_verify: bool,

    /// CA bundle to trust for the forward target (ignored with --insecure-skip-verify)
    #[arg(long, env = "CS_MONITOR_CA_CERT_FILE", value_name = "PATH")]
    pub ca_cert_file: Option<PathBuf>,

    /// Command to supervise, after `--`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl MonitorArgs {
    /// Forward target described by the flags, if `--forward` was given.
    #[must_use]
    pub fn forward_target(&self) -> Option<ForwardTarget> {
        self.forward.as_ref().map(|url| {
            ForwardTarget::new(
                url.clone(),
                TlsMode::from_flags(self.insecure_skip_verify, self.ca_cert_file.clone()),
            )
        })
    }
}

/// Run the monitor command.
///
/// # Errors
///
/// Returns an error if no command was given, the forward target is invalid,
/// the health endpoint cannot bind, or the command cannot be started.
pub async fn run(args: MonitorArgs) -> Result<()> {
    if args.command.is_empty() {
        return Err(MonitorError::NoCommand.into());
    }

    let forward = args
        .forward_target()
        .map(|target| ForwardingProxy::new(&target))
        .transpose()
        .context("invalid forward configuration")?;
    if forward.is_none() && (args.insecure_skip_verify || args.ca_cert_file.is_some()) {
        tracing::warn!("TLS options have no effect without --forward");
    }

    let metrics = MetricsRegistry::new();
    let cancel = CancellationToken::new();
    let signals = cancel_on_shutdown_signal(cancel.clone());

    let endpoint = HealthEndpoint::start(&args.address, metrics.clone(), forward).await?;

    let supervisor = Supervisor::new(
        StreamingProcessRunner,
        SystemClock,
        metrics,
        RestartBudget::from_flag(args.max_restarts),
    );
    let outcome = supervisor.run(&cancel, &args.command).await;

    endpoint.shutdown().await;
    signals.abort();

    let outcome = outcome?;
    tracing::info!(attempts = outcome.attempts(), ?outcome, "monitor stopped");
    Ok(())
}
