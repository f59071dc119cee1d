//! Forward target configuration for the health endpoint proxy.
//!
//! Pure data; the HTTP client itself lives in `crate::infra::proxy`.

use std::path::PathBuf;

/// How the proxy decides which upstream certificates to trust.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// The built-in root store.
    SystemTrust,
    /// Accept any server certificate. Local and test use only.
    SkipVerify,
    /// Trust exactly the certificates in this PEM file.
    CustomCa(PathBuf),
}

impl TlsMode {
    /// Derive the trust mode from the monitor's CLI flags.
    ///
    /// `insecure_skip_verify` takes precedence: a CA file supplied alongside
    /// it is ignored.
    #[must_use]
    pub fn from_flags(insecure_skip_verify: bool, ca_cert_file: Option<PathBuf>) -> Self {
        match (insecure_skip_verify, ca_cert_file) {
            (true, _) => Self::SkipVerify,
            (false, Some(path)) => Self::CustomCa(path),
            (false, None) => Self::SystemTrust,
        }
    }
}

/// Where `/` is proxied to, and how its certificate is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTarget {
    pub url: String,
    pub tls_mode: TlsMode,
}

impl ForwardTarget {
    #[must_use]
    pub fn new(url: impl Into<String>, tls_mode: TlsMode) -> Self {
        Self {
            url: url.into(),
            tls_mode,
        }
    }
}
