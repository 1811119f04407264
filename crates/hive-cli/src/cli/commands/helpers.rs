//! Shared helpers for CLI commands.

use anyhow::{bail, Result};
use std::path::Path;

use hive_core::core::identity::{get_display_name, get_user_identity};
use hive_core::core::{HiveServices, Session};

use crate::cli::commands::init::{is_initialized, store_path};

/// Ensure hive is initialized in the given directory.
pub fn ensure_initialized(root: &Path) -> Result<()> {
    if !is_initialized(root) {
        bail!("Not a hive directory. Run 'hive init' first.");
    }
    Ok(())
}

/// Open the service facade over the local store.
pub fn open_services(root: &Path) -> Result<HiveServices> {
    ensure_initialized(root)?;
    Ok(HiveServices::open(&store_path(root))?)
}

/// Resolve the acting user's session.
///
/// Identity comes from `--user`/`--name` or the environment; the
/// admin and banned flags are loaded from the user's profile.
pub fn resolve_session(
    services: &HiveServices,
    user: Option<&str>,
    name: Option<&str>,
) -> Result<Session> {
    let user_id = get_user_identity(user)?;
    let user_name = get_display_name(name, &user_id);
    Ok(services.session(&user_id, &user_name)?)
}

/// Ensure the session carries the admin flag.
pub fn require_admin(session: &Session) -> Result<()> {
    if !session.is_admin {
        bail!("This command requires admin rights (user: {})", session.user_id);
    }
    Ok(())
}
