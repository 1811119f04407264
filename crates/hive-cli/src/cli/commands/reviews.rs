//! Implementation of `hive reviews` subcommands.

use anyhow::Result;
use std::path::Path;

use crate::cli::commands::helpers::{open_services, resolve_session};
use crate::output::{Formatter, OutputFormat};

pub fn run_reviews_add(
    root: &Path,
    item_id: &str,
    rating: f64,
    comment: String,
    user: Option<&str>,
    name: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;

    services
        .reviews()
        .submit_rating(&session, item_id, rating, comment)?;
    let article = services.articles().get(item_id)?;
    Formatter::new(format).print(&article)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn run_reviews_edit(
    root: &Path,
    item_id: &str,
    review_id: &str,
    rating: f64,
    comment: String,
    user: Option<&str>,
    name: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;

    services
        .reviews()
        .edit_rating(&session, item_id, review_id, rating, comment)?;
    let article = services.articles().get(item_id)?;
    Formatter::new(format).print(&article)?;
    Ok(())
}

pub fn run_reviews_delete(
    root: &Path,
    item_id: &str,
    review_id: &str,
    user: Option<&str>,
    name: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;

    services.reviews().delete_rating(&session, item_id, review_id)?;
    let article = services.articles().get(item_id)?;
    Formatter::new(format).print(&article)?;
    Ok(())
}

pub fn run_reviews_list(root: &Path, item_id: &str, format: OutputFormat) -> Result<()> {
    let services = open_services(root)?;
    let reviews = services.reviews().list(item_id)?;
    Formatter::new(format).print_list(&reviews, "No reviews yet", "reviews")?;
    Ok(())
}
