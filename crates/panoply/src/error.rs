//! CLI error types with miette diagnostics.
//!
//! Maps `panoply_api::Error` variants into user-facing errors with
//! actionable help text and distinct process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use panoply_api::Error as ApiError;

/// Process exit codes.
///
/// The source scripts exited 0 even on fatal errors; automation pipelines
/// need better, so failures get distinct codes. Operator cancellation is a
/// clean completion and stays 0.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 4;
    pub const API: i32 = 5;
    pub const PARSE: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("There was a problem establishing a connection to {host}")]
    #[diagnostic(
        code(panoply::connection_failed),
        help(
            "Check IP address/hostname/credentials and try again.\n\
             Self-signed management certificate? Pass --insecure (-k)."
        )
    )]
    ConnectionFailed {
        host: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(panoply::auth_failed),
        help("Verify the username and password for the management account.")
    )]
    AuthFailed { message: String },

    #[error("No WildFire API key configured")]
    #[diagnostic(
        code(panoply::no_api_key),
        help(
            "Pass --api-key, set PANOPLY_WILDFIRE_API_KEY, or add\n\
             [wildfire] api_key to the config file (see: panoply config path)."
        )
    )]
    NoApiKey,

    // ── API ──────────────────────────────────────────────────────────

    #[error("The API rejected the request: {message}")]
    #[diagnostic(code(panoply::api_error))]
    Api {
        code: Option<String>,
        message: String,
    },

    #[error("Could not parse the API response: {message}")]
    #[diagnostic(
        code(panoply::parse_error),
        help("Re-run with -vv to log the offending response body.")
    )]
    Parse { message: String },

    // ── Task preconditions ───────────────────────────────────────────

    #[error("'{task}' requires a Panorama, but {host} is a single firewall")]
    #[diagnostic(
        code(panoply::requires_panorama),
        help("Point --ip at the Panorama that manages this device's group.")
    )]
    RequiresPanorama { task: String, host: String },

    // ── Validation / configuration ───────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(panoply::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(panoply::config))]
    Config(Box<figment::Error>),

    // ── Input files ──────────────────────────────────────────────────

    #[error("Could not read hash file '{path}'")]
    #[diagnostic(
        code(panoply::hash_file),
        help("Expected a newline-delimited list of content hashes.")
    )]
    HashFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write CSV file '{path}'")]
    #[diagnostic(code(panoply::csv))]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    // ── Cancellation ─────────────────────────────────────────────────

    /// Operator-requested cancellation during a prompt; reported as a
    /// clean termination, not an error.
    #[error("Keyboard interrupt. Exiting.")]
    Interrupted,

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Interrupted => exit_code::SUCCESS,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoApiKey => exit_code::AUTH,
            Self::Api { .. } => exit_code::API,
            Self::Parse { .. } => exit_code::PARSE,
            Self::Validation { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ApiError → CliError mapping ──────────────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::ConnectionFailed { host, source } => CliError::ConnectionFailed {
                host,
                source: source.into(),
            },

            ApiError::Tls(message) => CliError::ConnectionFailed {
                host: "(tls)".into(),
                source: message.into(),
            },

            ApiError::InvalidUrl(e) => CliError::Validation {
                field: "ip".into(),
                reason: e.to_string(),
            },

            ApiError::Authentication { message } => CliError::AuthFailed { message },

            ApiError::Api { code, message } => CliError::Api { code, message },

            ApiError::Parse { message, body } => {
                tracing::debug!(%body, "unparseable API response");
                CliError::Parse { message }
            }

            ApiError::Io(e) => CliError::Io(e),
        }
    }
}
