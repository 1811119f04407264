//! Implementation of `hive articles` subcommands.

use anyhow::Result;
use std::path::Path;

use hive_core::core::articles::{ArticleFilter, NewArticle};

use crate::cli::commands::helpers::{open_services, require_admin, resolve_session};
use crate::output::{Formatter, OutputFormat};

#[allow(clippy::too_many_arguments)]
pub fn run_articles_submit(
    root: &Path,
    title: String,
    author: Option<String>,
    year: i32,
    url: String,
    user: Option<&str>,
    name: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;

    let author = author.unwrap_or_else(|| session.user_name.clone());
    let item_id = services.articles().submit(
        &session,
        NewArticle {
            title,
            author,
            year,
            article_url: url,
        },
    )?;

    let article = services.articles().get(&item_id)?;
    Formatter::new(format).print(&article)?;
    Ok(())
}

pub fn run_articles_list(
    root: &Path,
    pending: bool,
    all: bool,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(root)?;
    let filter = if all {
        ArticleFilter::All
    } else if pending {
        ArticleFilter::Pending
    } else {
        ArticleFilter::Approved
    };

    let articles = services.articles().list(&filter)?;
    let empty_msg = match filter {
        ArticleFilter::Pending => "No articles awaiting approval",
        _ => "No articles yet",
    };
    Formatter::new(format).print_list(&articles, empty_msg, "articles")?;
    Ok(())
}

pub fn run_articles_show(root: &Path, item_id: &str, format: OutputFormat) -> Result<()> {
    let services = open_services(root)?;
    let article = services.articles().get(item_id)?;
    Formatter::new(format).print(&article)?;
    Ok(())
}

pub fn run_articles_approve(
    root: &Path,
    item_id: &str,
    user: Option<&str>,
    name: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;

    services.articles().approve(&session, item_id)?;
    let article = services.articles().get(item_id)?;
    Formatter::new(format).print(&article)?;
    Ok(())
}

pub fn run_articles_reject(
    root: &Path,
    item_id: &str,
    user: Option<&str>,
    name: Option<&str>,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;
    require_admin(&session)?;

    services.articles().reject(&session, item_id)?;
    println!("Rejected and removed {item_id}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn run_articles_edit(
    root: &Path,
    item_id: &str,
    title: Option<String>,
    year: Option<i32>,
    url: Option<String>,
    user: Option<&str>,
    name: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;

    services
        .articles()
        .edit(&session, item_id, title, year, url)?;
    let article = services.articles().get(item_id)?;
    Formatter::new(format).print(&article)?;
    Ok(())
}
