//! Implementation of `hive dispatch`.

use anyhow::Result;
use std::path::Path;

use hive_core::notify::{FileSpool, NotificationDispatcher};

use crate::cli::commands::helpers::open_services;
use crate::cli::commands::init::spool_path;
use crate::output::{Formatter, OutputFormat};

/// Drain pending change records into the notification spool.
pub fn run_dispatch(root: &Path, format: OutputFormat) -> Result<()> {
    let services = open_services(root)?;
    let spool = FileSpool::new(spool_path(root));

    let summary = NotificationDispatcher::new(services.store(), &spool).run()?;
    Formatter::new(format).print(&summary)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::helpers::{open_services, resolve_session};
    use crate::cli::commands::init::run_init;
    use hive_core::core::articles::NewArticle;
    use tempfile::tempdir;

    #[test]
    fn test_dispatch_writes_spool_lines() {
        let dir = tempdir().unwrap();
        run_init(dir.path()).unwrap();

        let services = open_services(dir.path()).unwrap();
        services.profiles().set_admin("mod", true).unwrap();
        services.profiles().register_token("u-1", "tok-1").unwrap();

        let author = resolve_session(&services, Some("u-1"), Some("Dana")).unwrap();
        let admin = resolve_session(&services, Some("mod"), Some("Mod")).unwrap();
        let item_id = services
            .articles()
            .submit(
                &author,
                NewArticle {
                    title: "On Bees".to_string(),
                    author: "Dana".to_string(),
                    year: 2024,
                    article_url: "https://example.com/a.pdf".to_string(),
                },
            )
            .unwrap();
        services.articles().approve(&admin, &item_id).unwrap();
        drop(services);

        run_dispatch(dir.path(), OutputFormat::Text).unwrap();

        let spool = std::fs::read_to_string(spool_path(dir.path())).unwrap();
        let lines: Vec<&str> = spool.lines().collect();
        assert_eq!(lines.len(), 1);
        let entry: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(entry["token"], "tok-1");
        assert!(entry["body"].as_str().unwrap().contains("On Bees"));

        // Second dispatch has nothing left to do.
        run_dispatch(dir.path(), OutputFormat::Text).unwrap();
        let spool = std::fs::read_to_string(spool_path(dir.path())).unwrap();
        assert_eq!(spool.lines().count(), 1);
    }
}
