use thiserror::Error;

/// Top-level error type for the `panoply-api` crate.
///
/// A small closed taxonomy so callers can tell operator-actionable failures
/// (connection, credentials) apart from API rejections and malformed
/// responses. The CLI maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// Could not reach the management endpoint at all (DNS failure,
    /// connection refused, TLS handshake, timeout).
    #[error("Could not connect to {host}: {source}")]
    ConnectionFailed {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    /// TLS configuration error (bad CA cert, client build failure).
    #[error("TLS error: {0}")]
    Tls(String),

    /// Invalid management endpoint URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Authentication ──────────────────────────────────────────────
    /// The keygen handshake was rejected (wrong credentials, locked
    /// account).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── API ─────────────────────────────────────────────────────────
    /// The API returned `<response status="error">`.
    #[error("API error: {message}")]
    Api {
        code: Option<String>,
        message: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// XML deserialization failed, with the raw body for debugging.
    #[error("Failed to parse API response: {message}")]
    Parse { message: String, body: String },

    // ── IO ──────────────────────────────────────────────────────────
    /// Local file access failed (CA certificate read).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if this error means the supplied credentials were
    /// rejected.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if the endpoint could not be reached at all.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Tls(_))
    }
}
