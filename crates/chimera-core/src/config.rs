// ── Runtime session configuration ──
//
// Describes *how* to reach a Device Service and how actions behave.
// Never touches disk: the CLI builds a `ClientConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use crate::model::CategoryCatalog;

/// How overlapping actions on the same device are ordered.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActionOrdering {
    /// A second action on a device waits until the first has settled.
    #[default]
    Serialized,
    /// Actions run concurrently; a failing action may roll back over
    /// a later action's optimistic prediction.
    Overlapping,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed gateways).
    DangerAcceptInvalid,
}

/// Configuration for one Device Service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root, e.g. `http://192.168.0.103:8000`.
    pub base_url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    pub ordering: ActionOrdering,
    /// Blocklist categories this deployment recognizes.
    pub categories: CategoryCatalog,
}

impl ClientConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Defaults for everything but the URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            tls: TlsVerification::default(),
            timeout: Self::DEFAULT_TIMEOUT,
            ordering: ActionOrdering::default(),
            categories: CategoryCatalog::default(),
        }
    }

    pub(crate) fn transport(&self) -> chimera_api::TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => chimera_api::TlsMode::System,
            TlsVerification::CustomCa(path) => chimera_api::TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => chimera_api::TlsMode::DangerAcceptInvalid,
        };
        chimera_api::TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
