pub mod completion;
pub mod config;
pub mod export;
pub mod forget;
pub mod list;
pub mod show;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::Config;
use crate::loader::source_from_arg;
use crate::session::Session;
use crate::storage::{FileStorage, MemoryStorage, Storage};

/// Open persisted state for `source`.
pub fn open_storage(config: &Config, source: &str) -> Result<FileStorage> {
    let dir = config.storage_dir()?;
    FileStorage::open(&dir, source)
        .with_context(|| format!("Failed to open saved state for {source}"))
}

/// Load a deck the way the viewer would. With `original`, saved edits and
/// the remembered position are ignored.
pub fn open_session(source: Option<&str>, original: bool) -> Result<(Config, Session)> {
    let config = Config::load_or_default();
    let source = source_from_arg(&config.resolve_source(source));
    let storage: Box<dyn Storage> = if original {
        Box::new(MemoryStorage::new())
    } else {
        Box::new(open_storage(&config, &source.describe())?)
    };
    let session = Session::open(storage, source.as_ref())
        .with_context(|| format!("Failed to load {}", source.describe()))?;
    if let Some(err) = session.parse_error() {
        anyhow::bail!("{}: {err}", source.describe());
    }
    Ok((config, session))
}

pub fn print_version() {
    println!(
        "{} {}",
        env!("CARGO_PKG_NAME").bold(),
        env!("CARGO_PKG_VERSION").green()
    );
    println!("{}", env!("CARGO_PKG_DESCRIPTION").dimmed());
}
