//! Configuration and local preference persistence for library-lander
//!
//! This crate provides:
//! - File path utilities for config and cache files
//! - Configuration file loading (TOML)
//! - Application configuration (AppConfig)
//! - Local preferences (theme, per-component settings, recent searches)

pub mod app_config;
pub mod config_file;
pub mod paths;
pub mod preferences;

pub use app_config::{AppConfig, Locale};
pub use config_file::{load_config_file, ConfigFile};
pub use paths::{cache_dir, config_dir};
pub use preferences::{
    ComponentSettings, Preferences, RecentSearch, SortOrder, Theme, ViewMode, MAX_RECENT_SEARCHES,
};
