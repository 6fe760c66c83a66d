//! Configuration and data directory paths
//!
//! Uses XDG directories via `dirs` crate with fallbacks.
//!
//! Platform-specific locations:
//! - Linux: `~/.config/library-lander/`, `~/.cache/library-lander/`
//! - macOS: `~/Library/Application Support/library-lander/`, `~/Library/Caches/library-lander/`
//! - Windows: `%APPDATA%\library-lander\`, `%LOCALAPPDATA%\library-lander\`

use anyhow::{Context, Result};
use std::path::PathBuf;

pub(crate) const APP_NAME: &str = "library-lander";

/// Get the application config directory
/// Returns ~/.config/library-lander/ on Linux, ~/Library/Application Support/library-lander/ on macOS
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the application cache directory
/// Returns ~/.cache/library-lander/ on Linux, ~/Library/Caches/library-lander/ on macOS
pub fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not determine cache directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get path to the local preferences file
pub fn preferences_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("preferences.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_exists() {
        let dir = config_dir().unwrap();
        assert!(dir.exists());
        assert!(dir.ends_with(APP_NAME));
    }

    #[test]
    fn test_cache_dir_exists() {
        let dir = cache_dir().unwrap();
        assert!(dir.exists());
        assert!(dir.ends_with(APP_NAME));
    }

    #[test]
    fn test_preferences_path() {
        let path = preferences_path().unwrap();
        assert!(path.ends_with("preferences.json"));
    }
}
