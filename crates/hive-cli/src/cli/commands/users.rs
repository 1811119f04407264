//! Implementation of `hive users` subcommands.

use anyhow::Result;
use std::path::Path;

use crate::cli::commands::helpers::{open_services, require_admin, resolve_session};
use crate::output::{Formatter, OutputFormat};

pub fn run_users_show(root: &Path, user_id: &str, format: OutputFormat) -> Result<()> {
    let services = open_services(root)?;
    let profile = services.profiles().get(user_id)?;

    let result = serde_json::json!({
        "userId": user_id,
        "isAdmin": profile.is_admin,
        "isBanned": profile.is_banned,
        "fcmTokens": profile.fcm_tokens,
    });
    Formatter::new(format).print(&result)?;
    Ok(())
}

pub fn run_users_register_token(
    root: &Path,
    token: &str,
    user: Option<&str>,
    name: Option<&str>,
) -> Result<()> {
    let services = open_services(root)?;
    let session = resolve_session(&services, user, name)?;

    if services.profiles().register_token(&session.user_id, token)? {
        println!("Registered token for {}", session.user_id);
    } else {
        println!("Token already registered for {}", session.user_id);
    }
    Ok(())
}

/// Grant or revoke admin.
///
/// The very first grant bootstraps without an existing admin; after
/// that, only admins may change the flag.
pub fn run_users_set_admin(
    root: &Path,
    user_id: &str,
    revoke: bool,
    user: Option<&str>,
    name: Option<&str>,
) -> Result<()> {
    let services = open_services(root)?;

    let any_admins = !services
        .store()
        .find_by_flag("users", "isAdmin", true)?
        .is_empty();
    if any_admins {
        let session = resolve_session(&services, user, name)?;
        require_admin(&session)?;
    }

    services.profiles().set_admin(user_id, !revoke)?;
    if revoke {
        println!("Revoked admin from {user_id}");
    } else {
        println!("Granted admin to {user_id}");
    }
    Ok(())
}
