use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::loader::DEFAULT_SOURCE;
use crate::storage::FileStorage;

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "deckpad";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,

    /// Deck source opened when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where persisted edits and slide positions live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `deckpad config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("# deckpad configuration\n{yaml}");
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn theme(&self) -> &str {
        self.defaults
            .as_ref()
            .and_then(|d| d.theme.as_deref())
            .unwrap_or("light")
    }

    /// Source to open: the command-line argument, then the configured
    /// default, then `./slides.md`.
    pub fn resolve_source(&self, arg: Option<&str>) -> String {
        arg.map(str::to_string)
            .or_else(|| self.defaults.as_ref().and_then(|d| d.source.clone()))
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string())
    }

    pub fn storage_dir(&self) -> Result<PathBuf> {
        match self.storage.as_ref().and_then(|s| s.dir.clone()) {
            Some(dir) => Ok(dir),
            None => Ok(FileStorage::default_dir()?),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "defaults.theme" => {
                match value {
                    "light" | "dark" => {}
                    _ => anyhow::bail!("Invalid theme: {value}. Must be 'light' or 'dark'."),
                }
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .theme = Some(value.to_string());
            }
            "defaults.source" => {
                if value.trim().is_empty() {
                    anyhow::bail!("Invalid source: must be a file path or an http(s) URL.");
                }
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .source = Some(value.to_string());
            }
            "storage.dir" => {
                if value.trim().is_empty() {
                    anyhow::bail!("Invalid storage dir: must be a directory path.");
                }
                self.storage
                    .get_or_insert_with(StorageConfig::default)
                    .dir = Some(PathBuf::from(value));
            }
            _ => anyhow::bail!(
                "Unknown config key: {key}. Valid keys: defaults.theme, defaults.source, storage.dir"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_valid_keys() {
        let mut config = Config::default();
        config.set("defaults.theme", "dark").unwrap();
        config.set("defaults.source", "talk.md").unwrap();
        config.set("storage.dir", "/tmp/deckpad").unwrap();
        assert_eq!(config.theme(), "dark");
        assert_eq!(config.resolve_source(None), "talk.md");
        assert_eq!(config.storage_dir().unwrap(), PathBuf::from("/tmp/deckpad"));
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("defaults.theme", "sepia").is_err());
        assert!(config.set("defaults.source", "  ").is_err());
        assert!(config.set("nope", "x").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_resolve_source_precedence() {
        let mut config = Config::default();
        assert_eq!(config.resolve_source(None), "./slides.md");
        config.set("defaults.source", "configured.md").unwrap();
        assert_eq!(config.resolve_source(Some("cli.md")), "cli.md");
        assert_eq!(config.resolve_source(None), "configured.md");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deckpad").join("config.yaml");
        let mut config = Config::default();
        config.set("defaults.theme", "dark").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from(&dir.path().join("missing.yaml")).is_err());
    }
}
