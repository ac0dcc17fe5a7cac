use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

const APP_DIR: &str = "deckpad";
const STATE_DIR: &str = "state";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("could not determine a data directory for persisted state")]
    NoDataDir,
}

/// Named string values that survive restarts.
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key)?.trim().parse().ok()
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.trim().parse().ok()
    }
}

/// In-memory storage, lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

/// One YAML file per scope. Every write replaces the file through a
/// temporary sibling so a crash never leaves it half written.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStorage {
    /// Default state directory, `<data_dir>/deckpad/state`.
    pub fn default_dir() -> Result<PathBuf, StorageError> {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR).join(STATE_DIR))
            .ok_or(StorageError::NoDataDir)
    }

    /// Open the storage for `scope` (usually the deck source) inside `dir`.
    /// File paths are resolved first, so every spelling of one file shares
    /// its state.
    pub fn open(dir: &Path, scope: &str) -> Result<Self, StorageError> {
        let scope = canonical_scope(scope);
        let path = dir.join(format!("{}.yaml", scope_file_stem(&scope)));
        Self::open_file(path)
    }

    pub fn open_file(path: PathBuf) -> Result<Self, StorageError> {
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => {
                serde_yaml::from_str(&contents).map_err(|source| StorageError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        debug!(path = %path.display(), keys = values.len(), "opened state");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the backing file and forget every value.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.values.clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn flush(&self) -> Result<(), StorageError> {
        let io_err = |source: std::io::Error| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let yaml = serde_yaml::to_string(&self.values).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("yaml.tmp");
        std::fs::write(&tmp, yaml).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.values.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// URLs stay as given. Paths become absolute, with symlinks and `..`
/// resolved when the file exists.
pub fn canonical_scope(scope: &str) -> String {
    if scope.starts_with("http://") || scope.starts_with("https://") {
        return scope.to_string();
    }
    std::fs::canonicalize(scope)
        .or_else(|_| std::path::absolute(scope))
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| scope.to_string())
}

/// Safe file stem for a source identifier: its last path segment, made
/// filename-safe, plus a short hash of the full identifier.
pub fn scope_file_stem(scope: &str) -> String {
    let name: String = scope
        .rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let name = name.trim_matches(|c| c == '_' || c == '.');
    let name = if name.is_empty() { "default" } else { name };

    let digest = Sha256::digest(scope.as_bytes());
    format!("{name}-{}", &hex::encode(digest)[..12])
}
