//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use chimera_core::{Device, DeviceId, GroupRef, Session};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to prompt on, `--yes` is required.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Spinner on stderr while `fut` runs. Hidden when stderr is not a terminal
/// or `--quiet` is set.
pub async fn with_spinner<F, T>(message: &str, quiet: bool, fut: F) -> T
where
    F: Future<Output = T>,
{
    if quiet || !std::io::stderr().is_terminal() {
        return fut.await;
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(Duration::from_millis(80));
    let out = fut.await;
    spinner.finish_and_clear();
    out
}

/// Look up a device in the loaded inventory.
pub fn require_device(session: &Session, id: DeviceId) -> Result<std::sync::Arc<Device>, CliError> {
    session.device(id).ok_or_else(|| CliError::NotFound {
        resource_type: "device".into(),
        identifier: id.to_string(),
        list_command: "devices list".into(),
    })
}

/// Resolve a group argument: a numeric ID, or the name of a group some
/// loaded device belongs to (case-insensitive).
pub fn resolve_group(session: &Session, group: &str) -> Result<GroupRef, CliError> {
    if let Ok(id) = group.trim().parse::<u32>() {
        return Ok(GroupRef { id });
    }
    session
        .store()
        .all()
        .iter()
        .find(|d| d.group.name.eq_ignore_ascii_case(group.trim()))
        .map(|d| GroupRef { id: d.group.id })
        .ok_or_else(|| CliError::NotFound {
            resource_type: "group".into(),
            identifier: group.into(),
            list_command: "summary".into(),
        })
}
