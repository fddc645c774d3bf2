//! Service configuration.
//!
//! Settings come from an optional JSON file in the user's config directory
//! (`<config dir>/slugline/config.json`), then environment variables override
//! individual fields:
//!
//! - `SLUGLINE_DATABASE` - SQLite file path
//! - `SLUGLINE_PORT` - HTTP port
//! - `SLUGLINE_SITE_NAME`, `SLUGLINE_SITE_TITLE`, `SLUGLINE_SITE_DESCRIPTION`,
//!   `SLUGLINE_SITE_KEYWORDS`, `SLUGLINE_SITE_ICON`, `SLUGLINE_CANONICAL_URL` - base metadata
//! - `SLUGLINE_HINT_TTL_SECS` - resolution hint lifetime
//! - `SLUGLINE_REMOTE_URL` - remote catalog API for `slugline resolve --remote`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::db::DEFAULT_HINT_TTL_SECS;
use crate::models::SiteDefaults;

const APP_NAME: &str = "slugline";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// SQLite file; `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,
    pub port: u16,
    /// Base metadata layer and pass-through site fields.
    pub site: SiteDefaults,
    pub hint_ttl_secs: i64,
    pub remote_catalog_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            port: 3000,
            site: SiteDefaults::default(),
            hint_ttl_secs: DEFAULT_HINT_TTL_SECS,
            remote_catalog_url: None,
        }
    }
}

impl Config {
    /// Load the config file and apply environment overrides.
    /// Falls back to defaults if the file is missing or unreadable.
    pub fn load() -> Self {
        let mut config = match get_config_path().and_then(|path| Self::load_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load from a specific file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save the configuration as pretty JSON.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Apply `SLUGLINE_*` overrides read through `lookup`.
    ///
    /// Values that fail to parse are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("SLUGLINE_DATABASE") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(port) = parse_var(&lookup, "SLUGLINE_PORT") {
            self.port = port;
        }
        if let Some(name) = lookup("SLUGLINE_SITE_NAME") {
            self.site.site_name = name;
        }
        if let Some(title) = lookup("SLUGLINE_SITE_TITLE") {
            self.site.layer.title = Some(title);
        }
        if let Some(description) = lookup("SLUGLINE_SITE_DESCRIPTION") {
            self.site.layer.description = Some(description);
        }
        if let Some(keywords) = lookup("SLUGLINE_SITE_KEYWORDS") {
            self.site.layer.keywords = Some(keywords);
        }
        if let Some(icon) = lookup("SLUGLINE_SITE_ICON") {
            self.site.icon = Some(icon);
        }
        if let Some(url) = lookup("SLUGLINE_CANONICAL_URL") {
            self.site.canonical_base_url = Some(url);
        }
        if let Some(ttl) = parse_var(&lookup, "SLUGLINE_HINT_TTL_SECS") {
            self.hint_ttl_secs = ttl;
        }
        if let Some(url) = lookup("SLUGLINE_REMOTE_URL") {
            self.remote_catalog_url = Some(url);
        }
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: '{}'", key, raw);
            None
        }
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(dirs.config_dir().join(CONFIG_FILE))
}
