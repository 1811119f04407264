//! Implementation of `hive init`.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// The directory name for hive data
pub const HIVE_DIR: &str = ".hive";

/// The document store database filename
pub const STORE_FILE: &str = "store.db";

/// The notification spool filename
pub const SPOOL_FILE: &str = "outbox.jsonl";

/// Run the init command.
///
/// Creates the .hive directory with the store database and an empty
/// notification spool.
pub fn run_init(root: &Path) -> Result<()> {
    let hive_dir = root.join(HIVE_DIR);

    if is_initialized(root) {
        println!("Already initialized: {}", hive_dir.display());
        return Ok(());
    }

    fs::create_dir_all(&hive_dir)
        .with_context(|| format!("Failed to create directory: {}", hive_dir.display()))?;

    // Opening the store creates the database file and schema.
    let services = hive_core::core::HiveServices::open(&store_path(root))?;
    drop(services);

    let spool = spool_path(root);
    fs::write(&spool, "")
        .with_context(|| format!("Failed to create spool file: {}", spool.display()))?;

    println!("Initialized hive in {}", hive_dir.display());
    println!("  Created: {}", store_path(root).display());
    println!("  Created: {}", spool.display());

    Ok(())
}

/// Check if hive is initialized in the given directory.
pub fn is_initialized(root: &Path) -> bool {
    store_path(root).exists()
}

/// Get the path to the store database.
pub fn store_path(root: &Path) -> PathBuf {
    root.join(HIVE_DIR).join(STORE_FILE)
}

/// Get the path to the notification spool.
pub fn spool_path(root: &Path) -> PathBuf {
    root.join(HIVE_DIR).join(SPOOL_FILE)
}
