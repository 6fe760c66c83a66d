//! Local preferences persistence
//!
//! Holds what the UI remembers between sessions: the chosen theme,
//! per-component view settings keyed by component name, and the recent
//! search history. Stored as JSON in the config directory.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::paths;

/// Number of recent searches kept in history
pub const MAX_RECENT_SEARCHES: usize = 5;

/// Color theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => anyhow::bail!("Invalid theme: {}", other),
        }
    }
}

/// How a collection view lays out its items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
    Table,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// View settings remembered per component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSettings {
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_sort_by() -> String {
    "title".to_string()
}

fn default_page_size() -> usize {
    20
}

impl Default for ComponentSettings {
    fn default() -> Self {
        Self {
            view_mode: ViewMode::default(),
            sort_by: default_sort_by(),
            sort_order: SortOrder::default(),
            page_size: default_page_size(),
        }
    }
}

/// A search the user ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSearch {
    pub query: String,
    /// Entity filter active when the search ran (e.g. "books")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Persisted local preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Theme picked by the user; None follows the system default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentSettings>,
    #[serde(default)]
    pub recent_searches: Vec<RecentSearch>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Preferences {
    /// Load preferences from the default location, or use defaults
    pub fn load() -> Self {
        match paths::preferences_path() {
            Ok(path) => Self::load_from_path(&path),
            Err(e) => {
                log::warn!("Could not resolve preferences path: {}", e);
                Self::default()
            }
        }
    }

    /// Load preferences from a specific file
    ///
    /// A missing or unreadable file yields defaults bound to `path`, so the
    /// next save recreates it.
    pub fn load_from_path(path: &Path) -> Self {
        let mut prefs = if path.exists() {
            match Self::read(path) {
                Ok(prefs) => {
                    log::info!("Loaded preferences from {:?}", path);
                    prefs
                }
                Err(e) => {
                    log::warn!("Failed to load preferences, using defaults: {:#}", e);
                    Self::default()
                }
            }
        } else {
            log::debug!("No preferences file at {:?}, starting fresh", path);
            Self::default()
        };
        prefs.path = Some(path.to_path_buf());
        prefs
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read preferences file: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse preferences file: {:?}", path))
    }

    /// Save preferences to the file they were loaded from
    pub fn save(&self) -> Result<()> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => paths::preferences_path()?,
        };

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize preferences")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write preferences file: {:?}", path))?;

        log::debug!("Saved preferences to {:?}", path);
        Ok(())
    }

    /// Settings for a component, or defaults if it never saved any
    pub fn component_settings(&self, component: &str) -> ComponentSettings {
        self.components.get(component).cloned().unwrap_or_default()
    }

    pub fn set_component_settings(&mut self, component: &str, settings: ComponentSettings) {
        self.components.insert(component.to_string(), settings);
    }

    /// Record a search, moving a repeated query to the end and keeping the
    /// last [`MAX_RECENT_SEARCHES`] entries.
    pub fn record_search(&mut self, query: &str, kind: Option<&str>, at: DateTime<Utc>) {
        self.recent_searches.retain(|s| s.query != query);
        self.recent_searches.push(RecentSearch {
            query: query.to_string(),
            kind: kind.map(str::to_string),
            timestamp: at.timestamp_millis(),
        });

        let overflow = self
            .recent_searches
            .len()
            .saturating_sub(MAX_RECENT_SEARCHES);
        self.recent_searches.drain(..overflow);
    }

    pub fn clear_recent_searches(&mut self) {
        self.recent_searches.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_theme_parse_and_toggle() {
        assert_eq!("dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("blue".parse::<Theme>().is_err());
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.to_string(), "dark");
    }

    #[test]
    fn test_recent_searches_bounded() {
        let mut prefs = Preferences::default();
        for (i, q) in ["a1", "b2", "c3", "d4", "e5", "f6", "g7"].iter().enumerate() {
            prefs.record_search(q, None, at(i as i64));
        }

        let queries: Vec<_> = prefs.recent_searches.iter().map(|s| s.query.as_str()).collect();
        assert_eq!(queries, vec!["c3", "d4", "e5", "f6", "g7"]);
    }

    #[test]
    fn test_recent_search_repeated_moves_to_end() {
        let mut prefs = Preferences::default();
        prefs.record_search("dune", Some("books"), at(1));
        prefs.record_search("tolkien", None, at(2));
        prefs.record_search("dune", None, at(3));

        assert_eq!(prefs.recent_searches.len(), 2);
        assert_eq!(prefs.recent_searches[0].query, "tolkien");
        assert_eq!(prefs.recent_searches[1].query, "dune");
        assert_eq!(prefs.recent_searches[1].timestamp, 3000);
        assert_eq!(prefs.recent_searches[1].kind, None);
    }

    #[test]
    fn test_component_settings_default() {
        let prefs = Preferences::default();
        let settings = prefs.component_settings("bookGrid");
        assert_eq!(settings.view_mode, ViewMode::Grid);
        assert_eq!(settings.sort_by, "title");
        assert_eq!(settings.sort_order, SortOrder::Asc);
        assert_eq!(settings.page_size, 20);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        let mut prefs = Preferences::load_from_path(&path);
        prefs.theme = Some(Theme::Dark);
        prefs.set_component_settings(
            "bookGrid",
            ComponentSettings {
                view_mode: ViewMode::Table,
                page_size: 50,
                ..ComponentSettings::default()
            },
        );
        prefs.record_search("asimov", Some("books"), at(10));
        prefs.save().unwrap();

        let reloaded = Preferences::load_from_path(&path);
        assert_eq!(reloaded.theme, Some(Theme::Dark));
        assert_eq!(reloaded.component_settings("bookGrid").view_mode, ViewMode::Table);
        assert_eq!(reloaded.component_settings("bookGrid").page_size, 50);
        assert_eq!(reloaded.recent_searches, prefs.recent_searches);
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "{ not json").unwrap();

        let prefs = Preferences::load_from_path(&path);
        assert!(prefs.theme.is_none());
        assert!(prefs.recent_searches.is_empty());
    }

    #[test]
    fn test_wire_format_names() {
        let mut prefs = Preferences::default();
        prefs.record_search("x", Some("users"), at(0));
        let json = serde_json::to_value(&prefs).unwrap();
        assert_eq!(json["recentSearches"][0]["type"], "users");
        assert!(json.get("theme").is_none());
    }
}
