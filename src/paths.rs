//! Path resolution for fdwctl
//!
//! # Environment Variables
//!
//! - `FDWCTL_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/fdwctl`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `FDWCTL_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/fdwctl` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\fdwctl`
//!    - macOS/Linux: `~/.config/fdwctl`
//!
//! The default config file is `config.toml` in that directory, or
//! `config.json` when only that one exists.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "FDWCTL_CONFIG_DIR";

const APP_NAME: &str = "fdwctl";

/// Get the fdwctl config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_NAME);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join(APP_NAME);
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_NAME);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the default config file path
pub fn config_file() -> Result<PathBuf> {
    Ok(config_file_in(&config_dir()?))
}

/// Pick `config.toml` unless only `config.json` exists.
fn config_file_in(dir: &Path) -> PathBuf {
    let toml = dir.join("config.toml");
    let json = dir.join("config.json");
    if !toml.exists() && json.exists() {
        json
    } else {
        toml
    }
}

/// Resolve the config file from an explicit `--config` value or the default.
pub fn resolve_config(explicit: Option<&str>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(expand(path)),
        None => config_file(),
    }
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
