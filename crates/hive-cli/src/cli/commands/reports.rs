//! Implementation of `hive reports` subcommands.

use anyhow::Result;
use std::path::Path;

use hive_core::model::{ContentRef, ContentType};

use crate::cli::commands::helpers::{open_services, require_admin, resolve_session};
use crate::output::{Formatter, OutputFormat};

#[allow(clippy::too_many_arguments)]
pub fn run_reports_add(
    root: &Path,
    item_id: &str,
    review_id: &str,
    reply_id: Option<String>,
    reason: String,
    user: Option<&str>,
    name: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;

    let content_type = if reply_id.is_some() {
        ContentType::Reply
    } else {
        ContentType::Review
    };
    let report_id = services.moderation().submit_report(
        &session,
        content_type,
        &ContentRef {
            item_id: item_id.to_string(),
            review_id: review_id.to_string(),
            reply_id,
        },
        reason,
    )?;

    let result = serde_json::json!({
        "reportId": report_id,
        "contentType": content_type,
    });
    Formatter::new(format).print(&result)?;
    Ok(())
}

pub fn run_reports_list(
    root: &Path,
    user: Option<&str>,
    name: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;
    require_admin(&session)?;

    let reports = services.moderation().list_reports()?;
    Formatter::new(format).print_list(&reports, "No open reports", "reports")?;
    Ok(())
}

pub fn run_reports_resolve_delete(
    root: &Path,
    report_id: &str,
    user: Option<&str>,
    name: Option<&str>,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;
    require_admin(&session)?;

    services.moderation().resolve_by_deletion(report_id)?;
    println!("Resolved {report_id}: content removed");
    Ok(())
}

pub fn run_reports_resolve_ban(
    root: &Path,
    user_id: &str,
    user: Option<&str>,
    name: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;
    require_admin(&session)?;

    let outcome = services.moderation().resolve_by_ban(user_id)?;
    Formatter::new(format).print(&outcome)?;
    Ok(())
}
