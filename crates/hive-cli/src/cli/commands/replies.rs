//! Implementation of `hive replies` subcommands.

use anyhow::Result;
use std::path::Path;

use crate::cli::commands::helpers::{open_services, resolve_session};
use crate::output::{Formatter, OutputFormat};

pub fn run_replies_add(
    root: &Path,
    item_id: &str,
    review_id: &str,
    message: String,
    user: Option<&str>,
    name: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;

    let reply_id = services
        .replies()
        .post(&session, item_id, review_id, message)?;

    let result = serde_json::json!({
        "replyId": reply_id,
        "itemId": item_id,
        "reviewId": review_id,
        "userId": session.user_id,
    });
    Formatter::new(format).print(&result)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn run_replies_edit(
    root: &Path,
    item_id: &str,
    review_id: &str,
    reply_id: &str,
    message: String,
    user: Option<&str>,
    name: Option<&str>,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;

    services
        .replies()
        .edit(&session, item_id, review_id, reply_id, message)?;
    println!("Updated {reply_id}");
    Ok(())
}

pub fn run_replies_delete(
    root: &Path,
    item_id: &str,
    review_id: &str,
    reply_id: &str,
    user: Option<&str>,
    name: Option<&str>,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;

    services
        .replies()
        .delete(&session, item_id, review_id, reply_id)?;
    println!("Deleted {reply_id}");
    Ok(())
}

pub fn run_replies_list(
    root: &Path,
    item_id: &str,
    review_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(root)?;
    let replies = services.replies().list(item_id, review_id)?;
    Formatter::new(format).print_list(&replies, "No replies yet", "replies")?;
    Ok(())
}
