//! Summary, category catalog, and service status handlers.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use chimera_core::{Session, Summary};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    name: String,
}

fn summary_detail(s: &Summary, color: bool) -> String {
    let l = |text: &str| output::label(text, color);
    let mut out = format!(
        "{}  {}\n{} {}\n{} {}",
        l("Total:"),
        s.total,
        l("Active:"),
        s.active,
        l("Isolated:"),
        s.total.saturating_sub(s.active),
    );

    let _ = write!(
        out,
        "\n\n{}\n  high    {}\n  medium  {}\n  low     {}",
        l("Risk"),
        s.by_risk.high,
        s.by_risk.medium,
        s.by_risk.low
    );

    for (title, counts) in [("Groups", &s.by_group), ("Categories", &s.by_category)] {
        if counts.is_empty() {
            continue;
        }
        let _ = write!(out, "\n\n{}", l(title));
        for (name, count) in counts {
            let _ = write!(out, "\n  {name:<20} {count}");
        }
    }
    out
}

/// `chimera summary`
pub fn summary(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let summary = session.store().summary();
    let out = output::render_single(
        &global.output,
        &*summary,
        |s| summary_detail(s, color),
        |s| s.total.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// `chimera categories`
pub fn categories(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let names: Vec<String> = session.catalog().iter().map(str::to_owned).collect();
    let out = output::render_list(
        &global.output,
        &names,
        |n| CategoryRow { name: n.clone() },
        Clone::clone,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[derive(Serialize)]
struct Status {
    url: String,
    service: String,
    version: String,
    devices: usize,
    loaded_at: Option<DateTime<Utc>>,
}

/// `chimera status`
pub async fn status(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let info = session.service_info().await?;
    let status = Status {
        url: session.base_url().to_string(),
        service: info.message,
        version: info.version,
        devices: session.store().len(),
        loaded_at: session.store().last_load(),
    };
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &status,
        |s| {
            let l = |text: &str| output::label(text, color);
            let loaded = s
                .loaded_at
                .map_or_else(|| "-".into(), |at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string());
            format!(
                "{}     {}\n{} {}\n{} {}\n{} {}\n{}  {}",
                l("URL:"),
                s.url,
                l("Service:"),
                s.service,
                l("Version:"),
                s.version,
                l("Devices:"),
                s.devices,
                l("Loaded:"),
                loaded
            )
        },
        |s| s.version.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
