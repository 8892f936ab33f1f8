//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Select};

use chimera_core::ActionOrdering;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display as TOML-like text.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "ordering = \"{}\"", cfg.defaults.ordering);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "api_url = \"{}\"", p.api_url);
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(ordering) = p.ordering {
            let _ = writeln!(out, "ordering = \"{ordering}\"");
        }
        if let Some(ref categories) = p.categories {
            let quoted: Vec<String> = categories.iter().map(|c| format!("\"{c}\"")).collect();
            let _ = writeln!(out, "categories = [{}]", quoted.join(", "));
        }
    }

    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("✨ Chimera CLI configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let mut cfg = config::load_config_or_default();

            // 1. Profile name
            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            // 2. Service URL, checked before anything is written
            let api_url: String = Input::new()
                .with_prompt("Device Service URL")
                .default("http://192.168.0.103:8000".into())
                .validate_with(|input: &String| -> Result<(), String> {
                    chimera_config::parse_api_url(input)
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                })
                .interact_text()
                .map_err(prompt_err)?;

            // 3. TLS
            let insecure = api_url.starts_with("https")
                && Confirm::new()
                    .with_prompt("Accept self-signed certificates?")
                    .default(false)
                    .interact()
                    .map_err(prompt_err)?;

            // 4. Action ordering
            let orderings = [ActionOrdering::Serialized, ActionOrdering::Overlapping];
            let labels = [
                "Serialized: one action per device at a time (recommended)",
                "Overlapping: allow concurrent actions on a device",
            ];
            let selection = Select::new()
                .with_prompt("Action ordering")
                .items(&labels)
                .default(0)
                .interact()
                .map_err(prompt_err)?;
            let ordering = orderings.get(selection).copied().unwrap_or_default();

            // 5. Build profile and config
            let profile = Profile {
                api_url,
                insecure: insecure.then_some(true),
                ordering: (ordering != ActionOrdering::default()).then_some(ordering),
                ..Profile::default()
            };
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());

            // 6. Write config
            let path = config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: chimera status");

            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                config::config_path().display().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: chimera config init");
            } else {
                for (name, profile) in &cfg.profiles {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}\t{}", profile.api_url);
                }
            }
            Ok(())
        }

        // ── SetDefault <name> ───────────────────────────────────────
        ConfigCommand::SetDefault { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::notice(&format!("✓ Default profile set to '{name}'"), global.quiet);
            Ok(())
        }
    }
}
