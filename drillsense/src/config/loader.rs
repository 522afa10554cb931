//! Configuration file loading
//!
//! Configuration is read from two JSON documents: the default
//! `DepthSensing.json` and an optional per-site `{SITE}_DepthSensing.json`.
//! A file that cannot be read or parsed is reported and treated as empty, so
//! a broken site file never blocks the defaults from loading.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

pub const DEFAULT_CONFIG_FILE: &str = "DepthSensing.json";

// Shipped defaults, used when no default file is found on disk
const EMBEDDED_DEFAULT: &str = include_str!("../../config/DepthSensing.json");

/// Load a JSON object from a file.
///
/// Read or parse failures are logged and yield an empty map.
pub fn load_config(path: &Path) -> Map<String, Value> {
    match read_config(path) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!("Error loading config file {}: {}", path.display(), e);
            Map::new()
        }
    }
}

fn read_config(path: &Path) -> Result<Map<String, Value>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read file: {}", e))?;

    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse JSON: {}", e))
}

/// Overlay site keys onto the defaults. Each site key replaces the default
/// value wholesale; nested objects are not merged.
pub fn merge_site(mut base: Map<String, Value>, site: Map<String, Value>) -> Map<String, Value> {
    if site.is_empty() {
        return base;
    }
    for (key, value) in site {
        base.insert(key, value);
    }
    base
}

/// Shipped default configuration.
pub fn embedded_default() -> Map<String, Value> {
    match serde_json::from_str(EMBEDDED_DEFAULT) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!("Failed to parse embedded default config: {}", e);
            Map::new()
        }
    }
}

/// Where the default and site configuration files live.
#[derive(Debug, Clone)]
pub struct ConfigSources {
    pub config_dir: PathBuf,
    pub default_path: Option<PathBuf>,  // Overrides `config_dir/DepthSensing.json`
    pub site: Option<String>,
}

impl ConfigSources {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            default_path: None,
            site: None,
        }
    }

    pub fn with_default_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_path = Some(path.into());
        self
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn default_file(&self) -> PathBuf {
        self.default_path
            .clone()
            .unwrap_or_else(|| self.config_dir.join(DEFAULT_CONFIG_FILE))
    }

    pub fn site_file(&self) -> Option<PathBuf> {
        self.site
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|site| self.config_dir.join(format!("{}_{}", site, DEFAULT_CONFIG_FILE)))
    }

    /// Load the default file, then overlay the site file when it loads.
    pub fn load(&self) -> Map<String, Value> {
        let default_file = self.default_file();
        let base = if default_file.exists() || self.default_path.is_some() {
            load_config(&default_file)
        } else {
            tracing::info!(
                "No default config at {}, using built-in defaults",
                default_file.display()
            );
            embedded_default()
        };

        match self.site_file() {
            Some(site_file) => merge_site(base, load_config(&site_file)),
            None => base,
        }
    }
}
