//! Locating the TOML config file
//!
//! `.library-lander.toml` in the working directory wins, so a checkout can
//! point at its own backend. Otherwise `config.toml` in the app config
//! directory is used, then `~/.library-lander.toml`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::paths::APP_NAME;

pub const CONFIG_FILE: &str = ".library-lander.toml";

/// A config file that was found and read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub content: String,
}

/// Every location a config file is looked for, in priority order
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(APP_NAME).join("config.toml"));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(CONFIG_FILE));
    }
    paths
}

/// Read the first config file found in the default locations
pub fn load_config_file() -> Option<ConfigFile> {
    read_first(&candidate_paths())
}

/// Read the first of `candidates` that exists
///
/// Missing files are skipped quietly; a file that exists but cannot be read
/// is logged and skipped.
pub fn read_first<P: AsRef<Path>>(candidates: &[P]) -> Option<ConfigFile> {
    for candidate in candidates {
        let path: &Path = candidate.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                log::debug!("Read config file {}", path.display());
                return Some(ConfigFile {
                    path: path.to_path_buf(),
                    content,
                });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("Skipping config file {}: {}", path.display(), e),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_first_existing_candidate_wins() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join(CONFIG_FILE);
        let global = dir.path().join("config.toml");
        std::fs::write(&global, "base_url = \"http://global\"").unwrap();

        let found = read_first(&[&local, &global]).unwrap();
        assert_eq!(found.path, global);
        assert_eq!(found.content, "base_url = \"http://global\"");

        std::fs::write(&local, "start_online = false").unwrap();
        assert_eq!(read_first(&[&local, &global]).unwrap().path, local);
    }

    #[test]
    fn test_unreadable_candidate_is_skipped() {
        let dir = TempDir::new().unwrap();
        let not_a_file = dir.path().join("as-dir");
        std::fs::create_dir(&not_a_file).unwrap();
        let config = dir.path().join(CONFIG_FILE);
        std::fs::write(&config, "").unwrap();

        assert_eq!(read_first(&[&not_a_file, &config]).unwrap().path, config);
        assert_eq!(read_first(&[&not_a_file]), None);
    }

    #[test]
    fn test_candidates_start_in_working_directory() {
        let paths = candidate_paths();
        assert_eq!(paths[0], PathBuf::from(CONFIG_FILE));
        assert!(paths[1..].iter().all(|p| p.is_absolute()));
    }
}
