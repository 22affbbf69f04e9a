//! Configuration file resolution
//!
//! Follows the priority order used across Lectio tools:
//! 1. Explicit path (command-line argument, which also carries the env
//!    fallback via clap)
//! 2. Platform config directory (~/.config/lectio/config.toml)
//!
//! Returns `None` when nothing exists; callers fall back to built-in
//! defaults.

use std::path::{Path, PathBuf};

/// Resolve the player configuration file path.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let candidate = dirs::config_dir()?.join("lectio").join("config.toml");
    if candidate.exists() {
        Some(candidate)
    } else {
        None
    }
}
