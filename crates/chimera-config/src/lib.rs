//! Shared configuration for chimera front ends.
//!
//! TOML profiles layered with `CHIMERA_*` environment overrides, and
//! translation to `chimera_core::ClientConfig`. The CLI adds flag-aware
//! wrappers on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use chimera_core::{ActionOrdering, CategoryCatalog, ClientConfig, TlsVerification};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named Device Service profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }

    /// The configured default profile name, if any.
    pub fn default_profile_name(&self) -> Option<&str> {
        self.default_profile.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub ordering: ActionOrdering,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            ordering: ActionOrdering::default(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named Device Service profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Service base URL (e.g., "http://192.168.0.103:8000").
    pub api_url: String,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept self-signed certificates.
    pub insecure: Option<bool>,

    /// Override the default timeout (seconds).
    pub timeout: Option<u64>,

    /// Override the default action ordering.
    pub ordering: Option<ActionOrdering>,

    /// Blocklist categories this service recognizes. Defaults to the
    /// stock catalog.
    pub categories: Option<Vec<String>>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "chimera", "chimera").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("chimera");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` layered as defaults, then file, then `CHIMERA_*`
/// variables (`__` separates nesting, e.g. `CHIMERA_DEFAULTS__TIMEOUT`).
/// A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CHIMERA_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Parse and check a service URL.
pub fn parse_api_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.trim().parse().map_err(|e| ConfigError::Validation {
        field: "api_url".into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("expected an http or https URL, got scheme '{other}'"),
        }),
    }
}

/// Build a `ClientConfig` from a profile, falling back to `defaults`.
pub fn profile_to_client_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let base_url = parse_api_url(&profile.api_url)?;

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let timeout_secs = profile.timeout.unwrap_or(defaults.timeout);
    if timeout_secs == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let categories = match &profile.categories {
        Some(list) if list.is_empty() => {
            return Err(ConfigError::Validation {
                field: "categories".into(),
                reason: "list must not be empty (omit it to use the standard catalog)".into(),
            });
        }
        Some(list) => list.iter().map(String::as_str).collect(),
        None => CategoryCatalog::standard(),
    };

    Ok(ClientConfig {
        base_url,
        tls,
        timeout: Duration::from_secs(timeout_secs),
        ordering: profile.ordering.unwrap_or(defaults.ordering),
        categories,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn profile(url: &str) -> Profile {
        Profile {
            api_url: url.into(),
            ..Profile::default()
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.timeout, 30);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn file_profiles_are_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "home"

[defaults]
timeout = 10

[profiles.home]
api_url = "http://192.168.0.103:8000"
ordering = "overlapping"
categories = ["gaming", "ads_trackers"]
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        let home = cfg.profile("home").unwrap();
        assert_eq!(home.ordering, Some(ActionOrdering::Overlapping));
        assert_eq!(cfg.defaults.output, "table");

        let client = profile_to_client_config(home, &cfg.defaults).unwrap();
        assert_eq!(client.timeout, Duration::from_secs(10));
        assert_eq!(client.ordering, ActionOrdering::Overlapping);
        assert_eq!(client.categories.len(), 2);
        assert!(client.categories.contains("gaming"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert("lab".into(), profile("https://gw.lab:8443/chimera"));
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let cfg = Config::default();
        assert!(matches!(
            cfg.profile("nope"),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn rejects_non_http_urls() {
        let defaults = Defaults::default();
        assert!(profile_to_client_config(&profile("localhost:8000"), &defaults).is_err());
        assert!(profile_to_client_config(&profile("not a url"), &defaults).is_err());
        assert!(profile_to_client_config(&profile("http://localhost:8000"), &defaults).is_ok());
    }

    #[test]
    fn rejects_zero_timeout_and_empty_catalog() {
        let defaults = Defaults::default();
        let mut p = profile("http://localhost:8000");
        p.timeout = Some(0);
        assert!(profile_to_client_config(&p, &defaults).is_err());

        let mut p = profile("http://localhost:8000");
        p.categories = Some(Vec::new());
        assert!(profile_to_client_config(&p, &defaults).is_err());
    }

    #[test]
    fn tls_follows_profile_flags() {
        let defaults = Defaults::default();
        let mut p = profile("https://gw.local");
        assert_eq!(
            profile_to_client_config(&p, &defaults).unwrap().tls,
            TlsVerification::SystemDefaults
        );
        p.ca_cert = Some("/etc/chimera/ca.pem".into());
        assert_eq!(
            profile_to_client_config(&p, &defaults).unwrap().tls,
            TlsVerification::CustomCa("/etc/chimera/ca.pem".into())
        );
        p.insecure = Some(true);
        assert_eq!(
            profile_to_client_config(&p, &defaults).unwrap().tls,
            TlsVerification::DangerAcceptInvalid
        );
    }
}
