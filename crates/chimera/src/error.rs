//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable process exit code.

use miette::Diagnostic;
use thiserror::Error;

use chimera_config::ConfigError;
use chimera_core::{CoreError, RemoteFailureKind};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to the device service at {url}: {message}")]
    #[diagnostic(
        code(chimera::connection_failed),
        help(
            "Check that the service is running and reachable.\n\
             URL: {url}\n\
             Try: chimera status --api-url {url}"
        )
    )]
    ConnectionFailed { url: String, message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(chimera::not_found),
        help("Run: chimera {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Unknown blocklist category '{category}'")]
    #[diagnostic(
        code(chimera::invalid_category),
        help("Run: chimera categories to list the categories this service accepts")
    )]
    InvalidCategory { category: String },

    // ── Remote ───────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(chimera::remote))]
    Remote {
        message: String,
        #[help]
        hint: Option<String>,
        kind: RemoteFailureKind,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(chimera::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(chimera::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: chimera config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No device service configured")]
    #[diagnostic(
        code(chimera::no_config),
        help(
            "Create a profile with: chimera config init\n\
             Or pass --api-url / set CHIMERA_API_URL.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(chimera::config))]
    Config { message: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(chimera::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(chimera::serialize))]
    Serialize(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::InvalidCategory { .. }
            | Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Remote { kind, .. } => match kind {
                RemoteFailureKind::Timeout => exit_code::TIMEOUT,
                RemoteFailureKind::Network => exit_code::CONNECTION,
                RemoteFailureKind::Status(404) => exit_code::NOT_FOUND,
                RemoteFailureKind::Status(409) => exit_code::CONFLICT,
                RemoteFailureKind::Status(_) | RemoteFailureKind::InvalidResponse => {
                    exit_code::GENERAL
                }
            },
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let hint = err.retry_hint().map(str::to_owned);
        match err {
            CoreError::NotFound { id } => CliError::NotFound {
                resource_type: "device".into(),
                identifier: id.to_string(),
                list_command: "devices list".into(),
            },

            CoreError::InvalidCategory { category } => CliError::InvalidCategory { category },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::RemoteFailure { kind, .. } | CoreError::LoadFailure { kind, .. } => {
                CliError::Remote {
                    message: err.to_string(),
                    hint,
                    kind,
                }
            }

            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: "(unknown)".into(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
