//! Caller identity resolution.
//!
//! Determines which user a CLI invocation acts as, from an explicit
//! override or environment variables.

use anyhow::{bail, Result};
use std::env;

/// Environment variables checked for the acting user id, in priority order.
const IDENTITY_VARS: &[&str] = &["HIVE_USER", "USER"];

/// Environment variable for the display name shown on reviews and replies.
const NAME_VAR: &str = "HIVE_USER_NAME";

/// Get the acting user id.
///
/// Resolution order:
/// 1. Explicit override (`--user`)
/// 2. HIVE_USER environment variable
/// 3. USER environment variable
///
/// Returns an error if no identity can be resolved - every write is
/// attributed to a user.
pub fn get_user_identity(explicit: Option<&str>) -> Result<String> {
    if let Some(id) = explicit {
        return Ok(id.to_string());
    }

    for var in IDENTITY_VARS {
        if let Ok(id) = env::var(var) {
            if !id.is_empty() {
                return Ok(id);
            }
        }
    }

    bail!("User identity required. Use --user <id> or set HIVE_USER.")
}

/// Get the display name for the acting user.
///
/// Falls back to the user id when neither `--name` nor HIVE_USER_NAME
/// is set.
pub fn get_display_name(explicit: Option<&str>, user_id: &str) -> String {
    if let Some(name) = explicit {
        return name.to_string();
    }
    env::var(NAME_VAR)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| user_id.to_string())
}
