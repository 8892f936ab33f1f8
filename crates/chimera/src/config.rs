//! CLI configuration: a thin wrapper around `chimera_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--api-url, --insecure, --timeout).

use chimera_core::ClientConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use chimera_config::{
    Config, Defaults, Profile, config_path, load_config, load_config_or_default, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names, for error help text.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Translate a `Profile` + global flags into a `ClientConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<ClientConfig, CliError> {
    let mut profile = profile.clone();

    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    Ok(chimera_config::profile_to_client_config(&profile, defaults)?)
}

/// Build a `ClientConfig` from the config file, profile, and CLI overrides.
///
/// An explicitly requested profile must exist. Without any profile,
/// `--api-url` alone is enough.
pub fn build_client_config(global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        tracing::debug!(profile = %profile_name, "using configured profile");
        return resolve_profile(profile, &cfg.defaults, global);
    }

    if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available_profiles(&cfg),
        });
    }

    if global.api_url.is_none() {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    }

    resolve_profile(&Profile::default(), &cfg.defaults, global)
}
