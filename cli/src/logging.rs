//! Tracing subscriber setup.
//!
//! Logs go to stderr so a supervised command's stdout passes through
//! untouched. `RUST_LOG` overrides the default `info` filter.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(json: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder
            .with_ansi(use_ansi(no_color, std::io::stderr().is_terminal()))
            .try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Colour only when asked for and stderr is a terminal.
#[must_use]
pub fn use_ansi(no_color: bool, stderr_is_terminal: bool) -> bool {
    !no_color && stderr_is_terminal
}
