//! OS signal handling for the monitor.
//!
//! The first SIGINT, SIGTERM or SIGQUIT (Ctrl-C on non-Unix platforms)
//! cancels a token. Handlers stay installed afterwards, so repeated signals
//! are swallowed rather than killing the process.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Completes when the process receives a termination signal.
///
/// # Errors
///
/// Returns an error if a signal handler cannot be installed.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv() => tracing::info!(signal = "SIGINT", "received signal"),
        _ = sigterm.recv() => tracing::info!(signal = "SIGTERM", "received signal"),
        _ = sigquit.recv() => tracing::info!(signal = "SIGQUIT", "received signal"),
    }
    Ok(())
}

/// Completes when the process receives Ctrl-C.
///
/// # Errors
///
/// Returns an error if the Ctrl-C handler cannot be installed.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Cancel `token` on the first termination signal.
pub fn cancel_on_shutdown_signal(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(()) => {
                tracing::info!("shutdown requested, finishing current attempt");
                token.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "failed to install signal handlers"),
        }
    })
}
