//! Stable per-installation session token
//!
//! The token identifies this client to the remote endpoint across
//! conversations. It is generated once per data directory and reused
//! unchanged on every later access; deleting the data directory is the
//! only way to get a new one.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

const SESSION_FILE: &str = "session_id";

/// Return the persisted session token, creating and persisting one on
/// first access. Failure to read, generate, or write is fatal to the
/// caller; nothing is recovered here.
pub fn get_or_create(data_dir: &Path) -> Result<String> {
    let path = data_dir.join(SESSION_FILE);

    if path.exists() {
        let existing = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        let token = existing.trim();
        if !token.is_empty() {
            debug!("Reusing session token from {}", path.display());
            return Ok(token.to_string());
        }
    }

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

    let created = Uuid::new_v4().to_string();
    std::fs::write(&path, &created)
        .with_context(|| format!("Failed to write session file: {}", path.display()))?;

    debug!("Created new session token at {}", path.display());
    Ok(created)
}
