//! Device command handlers.

use std::fmt::Write as _;
use std::sync::Arc;

use tabled::Tabled;

use chimera_core::{Device, DeviceFilter, DeviceId, DeviceUpdate, RiskLevel, Session};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "IP")]
    ip: String,
}

impl DeviceRow {
    fn new(d: &Arc<Device>, color: bool) -> Self {
        Self {
            id: d.id.to_string(),
            name: d.display_name(),
            group: d.group.name.clone(),
            status: output::status_label(d.is_active, color),
            risk: output::risk_label(RiskLevel::of(d), color),
            category: d.ai_classification.device_category.clone(),
            ip: d.ip.clone().unwrap_or_default(),
        }
    }
}

fn detail(d: &Arc<Device>, color: bool) -> String {
    let l = |text: &str| output::label(text, color);
    let or_dash = |v: Option<&str>| v.unwrap_or("-").to_owned();

    let mut out = [
        format!("{}       {}", l("ID:"), d.id),
        format!("{}     {}", l("Name:"), d.display_name()),
        format!("{} {}", l("Hostname:"), or_dash(d.hostname.as_deref())),
        format!("{}       {}", l("IP:"), or_dash(d.ip.as_deref())),
        format!("{}      {}", l("MAC:"), or_dash(d.mac.as_deref())),
        format!("{}   {}", l("Vendor:"), or_dash(d.vendor.as_deref())),
        format!("{}       {}", l("OS:"), or_dash(d.os_name.as_deref())),
        format!("{}    {}", l("Group:"), d.group.name),
        format!("{}   {}", l("Status:"), output::status_label(d.is_active, color)),
        format!("{}     {}", l("Risk:"), output::risk_label(RiskLevel::of(d), color)),
        format!("{} {}", l("Last seen:"), or_dash(d.last_seen.as_deref())),
    ]
    .join("\n");

    let ai = &d.ai_classification;
    if !ai.device_type.is_empty() || !ai.device_category.is_empty() {
        let _ = write!(
            out,
            "\n\n{}\n  {} ({}), confidence {:.0}%",
            l("Classification"),
            ai.device_type,
            ai.device_category,
            ai.confidence * 100.0
        );
        if !ai.reasoning.is_empty() {
            let _ = write!(out, "\n  {}", ai.reasoning);
        }
    }

    if !d.blocklist.is_empty() {
        let custom = if d.has_custom_blocklist { " (custom)" } else { "" };
        let _ = write!(out, "\n\n{}{custom}", l("Blocklist"));
        for (category, blocked) in d.blocklist.iter() {
            let mark = if blocked { "blocked" } else { "-" };
            let _ = write!(out, "\n  {category:<20} {mark}");
        }
    }

    out
}

/// Report a completed write: a status line, plus the record for
/// structured output formats.
fn report(device: &Arc<Device>, message: &str, global: &GlobalOpts) -> Result<(), CliError> {
    output::notice(message, global.quiet);
    if !matches!(global.output, OutputFormat::Table) {
        let color = output::should_color(&global.color);
        let out = output::render_single(
            &global.output,
            device,
            |d| detail(d, color),
            |d| d.id.to_string(),
        )?;
        output::print_output(&out, global.quiet);
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        DevicesCommand::List(list) => {
            let filter: DeviceFilter = list.filter.parse().unwrap_or_default();
            let devices = session.filtered(&list.search, &filter);
            tracing::debug!(filter = %filter, matched = devices.len(), "listing devices");
            let out = output::render_list(
                &global.output,
                &devices,
                |d| DeviceRow::new(d, color),
                |d| d.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { device } => {
            let d = util::require_device(session, DeviceId(device))?;
            let out = output::render_single(
                &global.output,
                &d,
                |d| detail(d, color),
                |d| d.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Isolate { device } => {
            let id = DeviceId(device);
            let current = util::require_device(session, id)?;
            let prompt = format!(
                "Isolate {} ({id})? It will lose network access",
                current.display_name()
            );
            if !util::confirm(&prompt, "isolate", global.yes)? {
                output::notice("Aborted", global.quiet);
                return Ok(());
            }
            let updated = session.isolate(id).await?;
            report(&updated, &format!("✓ {} isolated", updated.display_name()), global)
        }

        DevicesCommand::Release { device } => {
            let updated = session.release(DeviceId(device)).await?;
            report(&updated, &format!("✓ {} released", updated.display_name()), global)
        }

        DevicesCommand::Block { device, category } => {
            let updated = session.toggle_block(DeviceId(device), category.as_str()).await?;
            let state = if updated.blocklist.is_blocked(&category) {
                "blocked"
            } else {
                "unblocked"
            };
            report(
                &updated,
                &format!("✓ {category} {state} for {}", updated.display_name()),
                global,
            )
        }

        DevicesCommand::Rename { device, name } => {
            let update = DeviceUpdate {
                given_name: Some(name),
                ..DeviceUpdate::default()
            };
            let updated = session.update_device(DeviceId(device), &update).await?;
            let message = format!("✓ Device {} renamed to {}", updated.id, updated.display_name());
            report(&updated, &message, global)
        }

        DevicesCommand::SetGroup { device, group } => {
            let group = util::resolve_group(session, &group)?;
            let update = DeviceUpdate {
                group: Some(group),
                ..DeviceUpdate::default()
            };
            let updated = session.update_device(DeviceId(device), &update).await?;
            report(
                &updated,
                &format!("✓ {} moved to group {}", updated.display_name(), updated.group.name),
                global,
            )
        }
    }
}
