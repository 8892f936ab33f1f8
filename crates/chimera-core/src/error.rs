// ── Core error types ──
//
// User-facing errors from chimera-core. Consumers never see a raw
// `chimera_api::Error`: transport failures are classified into a
// `RemoteFailureKind` and carried with the action that caused them.

use chimera_api::DeviceId;
use thiserror::Error;

/// How a remote call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFailureKind {
    /// The service could not be reached (DNS, refused, reset, TLS).
    Network,
    /// The request exceeded the configured timeout.
    Timeout,
    /// The service answered with a non-2xx status.
    Status(u16),
    /// The service answered 2xx but the body was not a valid record.
    InvalidResponse,
}

impl RemoteFailureKind {
    pub fn is_transient(self) -> bool {
        match self {
            Self::Network | Self::Timeout => true,
            Self::Status(code) => code >= 500 || code == 429,
            Self::InvalidResponse => false,
        }
    }
}

impl From<&chimera_api::Error> for RemoteFailureKind {
    fn from(err: &chimera_api::Error) -> Self {
        match err {
            chimera_api::Error::Timeout { .. } => Self::Timeout,
            chimera_api::Error::Transport(e) if e.is_timeout() => Self::Timeout,
            chimera_api::Error::Transport(e) if e.is_decode() => Self::InvalidResponse,
            chimera_api::Error::Status { status, .. } => Self::Status(*status),
            chimera_api::Error::Deserialization { .. } => Self::InvalidResponse,
            chimera_api::Error::Transport(_)
            | chimera_api::Error::InvalidUrl(_)
            | chimera_api::Error::Tls(_) => Self::Network,
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Local rejections (no mutation, no request) ───────────────────
    #[error("Device not found: {id}")]
    NotFound { id: DeviceId },

    #[error("Unknown blocklist category: {category}")]
    InvalidCategory { category: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Remote failures ──────────────────────────────────────────────
    #[error("Could not {action} device {device_id}: {message}")]
    RemoteFailure {
        device_id: DeviceId,
        action: String,
        kind: RemoteFailureKind,
        message: String,
    },

    #[error("Failed to load from device service: {message}")]
    LoadFailure {
        kind: RemoteFailureKind,
        message: String,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// A failed device write.
    pub(crate) fn remote(device_id: DeviceId, action: impl Into<String>, err: &chimera_api::Error) -> Self {
        Self::RemoteFailure {
            device_id,
            action: action.into(),
            kind: err.into(),
            message: err.to_string(),
        }
    }

    /// A failed list/summary fetch.
    pub(crate) fn load(err: &chimera_api::Error) -> Self {
        Self::LoadFailure {
            kind: err.into(),
            message: err.to_string(),
        }
    }

    /// The failure kind, for remote errors.
    pub fn remote_kind(&self) -> Option<RemoteFailureKind> {
        match self {
            Self::RemoteFailure { kind, .. } | Self::LoadFailure { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether repeating the same call may succeed. Nothing retries
    /// automatically; this only drives the hint shown to the user.
    pub fn is_retryable(&self) -> bool {
        self.remote_kind().is_some_and(RemoteFailureKind::is_transient)
    }

    /// Short user-facing suggestion for what to do next.
    pub fn retry_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => Some("Refresh the device list; the device may have been removed"),
            Self::InvalidCategory { .. } => Some("Run `chimera categories` to list known categories"),
            _ => match self.remote_kind()? {
                RemoteFailureKind::Network => {
                    Some("Check that the device service is reachable and try again")
                }
                RemoteFailureKind::Timeout => Some("The service is slow to respond; try again"),
                RemoteFailureKind::Status(404) => {
                    Some("The service no longer knows this device; refresh the list")
                }
                RemoteFailureKind::Status(code) if code >= 500 || code == 429 => {
                    Some("The service reported a temporary error; try again shortly")
                }
                RemoteFailureKind::Status(_) | RemoteFailureKind::InvalidResponse => None,
            },
        }
    }
}
