use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use thiserror::Error;
use tracing::{debug, info};

use crate::storage::{Storage, StorageError};

/// Deck source used when nothing else is configured.
pub const DEFAULT_SOURCE: &str = "./slides.md";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Where the original deck text comes from.
pub trait Source: Send + Sync {
    /// Identifier shown to the user and used to scope persisted state.
    fn describe(&self) -> String;
    fn fetch(&self) -> Result<String, LoadError>;
}

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Source for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<String, LoadError> {
        std::fs::read_to_string(&self.path).map_err(|source| LoadError::Read {
            path: self.path.clone(),
            source,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Source for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<String, LoadError> {
        let http_err = |source: ureq::Error| LoadError::Http {
            url: self.url.clone(),
            source: Box::new(source),
        };
        ureq::get(&self.url)
            .call()
            .map_err(http_err)?
            .body_mut()
            .read_to_string()
            .map_err(http_err)
    }
}

/// Pick a source for a command-line argument: URLs go over HTTP, everything
/// else is a local path.
pub fn source_from_arg(arg: &str) -> Arc<dyn Source> {
    if arg.starts_with("http://") || arg.starts_with("https://") {
        Arc::new(HttpSource::new(arg))
    } else {
        Arc::new(FileSource::new(arg))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Initial,
    Reset,
}

/// Handle for one issued fetch. Only the most recently issued ticket is
/// honoured when results come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    kind: RequestKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// `current` now holds the persisted edits, which differ from the source.
    RestoredEdits,
    /// `current` (and for a reset also `saved`) now holds the fetched text.
    Loaded,
    /// A newer request was issued after this one; nothing changed.
    Stale,
}

/// Editor text state: the live `current` text and the persisted `saved`
/// baseline.
#[derive(Debug)]
pub struct Loader {
    key: String,
    current: String,
    saved: String,
    generation: u64,
    pending: Option<Ticket>,
}

impl Loader {
    /// Read the persisted baseline under `key`. `current` stays empty until
    /// the first fetch resolves.
    pub fn new(key: impl Into<String>, storage: &dyn Storage) -> Self {
        let key = key.into();
        let saved = storage.get(&key).unwrap_or_default();
        Self {
            key,
            current: String::new(),
            saved,
            generation: 0,
            pending: None,
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn saved(&self) -> &str {
        &self.saved
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the live text differs from the persisted baseline.
    pub fn is_dirty(&self) -> bool {
        self.current() != self.saved()
    }

    pub fn begin_load(&mut self) -> Ticket {
        self.issue(RequestKind::Initial)
    }

    pub fn begin_reset(&mut self) -> Ticket {
        self.issue(RequestKind::Reset)
    }

    fn issue(&mut self, kind: RequestKind) -> Ticket {
        self.generation += 1;
        let ticket = Ticket {
            generation: self.generation,
            kind,
        };
        self.pending = Some(ticket);
        debug!(generation = self.generation, ?kind, "issued fetch");
        ticket
    }

    /// Apply a finished fetch. A failed fetch changes nothing and hands the
    /// error back; so does a storage failure while persisting a reset.
    pub fn resolve(
        &mut self,
        ticket: Ticket,
        fetched: Result<String, LoadError>,
        storage: &mut dyn Storage,
    ) -> Result<Resolution, LoadError> {
        if self.pending != Some(ticket) {
            debug!(generation = ticket.generation, "dropping stale fetch result");
            return Ok(Resolution::Stale);
        }
        self.pending = None;
        let original = fetched?;

        match ticket.kind {
            RequestKind::Initial => {
                if !self.saved.is_empty() && self.saved != original {
                    info!("restoring saved edits for {}", self.key);
                    self.current = self.saved.clone();
                    Ok(Resolution::RestoredEdits)
                } else {
                    self.current = original;
                    Ok(Resolution::Loaded)
                }
            }
            RequestKind::Reset => {
                storage.set(&self.key, &original)?;
                self.saved = original.clone();
                self.current = original;
                info!("reset {} to the original source", self.key);
                Ok(Resolution::Loaded)
            }
        }
    }

    /// Fetch synchronously and apply the result.
    pub fn load_blocking(
        &mut self,
        source: &dyn Source,
        storage: &mut dyn Storage,
    ) -> Result<Resolution, LoadError> {
        let ticket = self.begin_load();
        self.resolve(ticket, source.fetch(), storage)
    }

    /// Replace the live text. Returns whether it changed.
    pub fn edit(&mut self, text: &str) -> bool {
        if self.current == text {
            return false;
        }
        self.current = text.to_string();
        true
    }

    /// Persist `current` as the new baseline.
    pub fn save(&mut self, storage: &mut dyn Storage) -> Result<(), StorageError> {
        storage.set(&self.key, &self.current)?;
        self.saved = self.current.clone();
        Ok(())
    }
}

/// A finished background fetch.
pub struct Fetched {
    pub ticket: Ticket,
    pub result: Result<String, LoadError>,
}

/// Runs fetches on worker threads and hands results back over a channel
/// that the UI thread drains.
pub struct Fetcher {
    source: Arc<dyn Source>,
    tx: Sender<Fetched>,
    rx: Receiver<Fetched>,
}

impl Fetcher {
    pub fn new(source: Arc<dyn Source>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { source, tx, rx }
    }

    pub fn source(&self) -> &dyn Source {
        self.source.as_ref()
    }

    pub fn spawn(&self, ticket: Ticket) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let result = source.fetch();
            // The receiver only disappears when the app is shutting down.
            let _ = tx.send(Fetched { ticket, result });
        });
    }

    /// Non-blocking: every result that has arrived so far.
    pub fn drain(&self) -> Vec<Fetched> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::sync::Mutex;

    const KEY: &str = "slides_code";

    /// Returns queued responses in order, then repeats the last one.
    struct Scripted {
        responses: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
            }
        }
    }

    impl Source for Scripted {
        fn describe(&self) -> String {
            "scripted".into()
        }

        fn fetch(&self) -> Result<String, LoadError> {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                Ok(responses.pop().unwrap())
            } else {
                Ok(responses[0].clone())
            }
        }
    }

    fn failing() -> Result<String, LoadError> {
        Err(LoadError::Read {
            path: PathBuf::from("gone.md"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        })
    }

    #[test]
    fn test_fresh_load_uses_original() {
        let mut storage = MemoryStorage::new();
        let mut loader = Loader::new(KEY, &storage);
        let res = loader
            .load_blocking(&Scripted::new(&["hello"]), &mut storage)
            .unwrap();
        assert_eq!(res, Resolution::Loaded);
        assert_eq!(loader.current(), "hello");
        assert_eq!(loader.saved(), "");
    }

    #[test]
    fn test_save_then_reset() {
        let mut storage = MemoryStorage::new();
        let source = Scripted::new(&["hello", "hello v2"]);
        let mut loader = Loader::new(KEY, &storage);
        loader.load_blocking(&source, &mut storage).unwrap();

        loader.save(&mut storage).unwrap();
        assert_eq!(loader.saved(), "hello");
        assert_eq!(storage.get(KEY).as_deref(), Some("hello"));

        loader.edit("scribbles");
        let ticket = loader.begin_reset();
        loader.resolve(ticket, source.fetch(), &mut storage).unwrap();
        assert_eq!(loader.current(), "hello v2");
        assert_eq!(loader.saved(), "hello v2");
        assert_eq!(storage.get(KEY).as_deref(), Some("hello v2"));
    }

    #[test]
    fn test_saved_edits_survive_reload() {
        let mut storage = MemoryStorage::new();
        storage.set(KEY, "my edits").unwrap();
        let mut loader = Loader::new(KEY, &storage);
        let res = loader
            .load_blocking(&Scripted::new(&["original"]), &mut storage)
            .unwrap();
        assert_eq!(res, Resolution::RestoredEdits);
        assert_eq!(loader.current(), "my edits");
    }

    #[test]
    fn test_saved_equal_to_original_loads_original() {
        let mut storage = MemoryStorage::new();
        storage.set(KEY, "same").unwrap();
        let mut loader = Loader::new(KEY, &storage);
        let res = loader
            .load_blocking(&Scripted::new(&["same"]), &mut storage)
            .unwrap();
        assert_eq!(res, Resolution::Loaded);
        assert_eq!(loader.current(), "same");
    }

    #[test]
    fn test_initial_load_does_not_persist() {
        let mut storage = MemoryStorage::new();
        let mut loader = Loader::new(KEY, &storage);
        loader
            .load_blocking(&Scripted::new(&["hello"]), &mut storage)
            .unwrap();
        assert_eq!(storage.get(KEY), None);
    }

    #[test]
    fn test_failed_fetch_writes_nothing() {
        let mut storage = MemoryStorage::new();
        storage.set(KEY, "kept").unwrap();
        let mut loader = Loader::new(KEY, &storage);
        loader.edit("live");

        let ticket = loader.begin_reset();
        assert!(loader.resolve(ticket, failing(), &mut storage).is_err());
        assert_eq!(loader.current(), "live");
        assert_eq!(loader.saved(), "kept");
        assert_eq!(storage.get(KEY).as_deref(), Some("kept"));
        assert!(!loader.is_loading());
    }

    #[test]
    fn test_latest_request_wins() {
        let mut storage = MemoryStorage::new();
        let mut loader = Loader::new(KEY, &storage);

        let initial = loader.begin_load();
        let reset = loader.begin_reset();

        // The reset resolves first, then the older initial load arrives late.
        let res = loader
            .resolve(reset, Ok("from reset".into()), &mut storage)
            .unwrap();
        assert_eq!(res, Resolution::Loaded);
        let res = loader
            .resolve(initial, Ok("from initial".into()), &mut storage)
            .unwrap();
        assert_eq!(res, Resolution::Stale);
        assert_eq!(loader.current(), "from reset");
        assert_eq!(loader.saved(), "from reset");
    }

    #[test]
    fn test_stale_failure_is_ignored() {
        let mut storage = MemoryStorage::new();
        let mut loader = Loader::new(KEY, &storage);
        let old = loader.begin_load();
        let _new = loader.begin_load();
        assert_eq!(
            loader.resolve(old, failing(), &mut storage).unwrap(),
            Resolution::Stale
        );
        assert!(loader.is_loading());
    }

    #[test]
    fn test_edit_reports_change() {
        let storage = MemoryStorage::new();
        let mut loader = Loader::new(KEY, &storage);
        assert!(loader.edit("a"));
        assert!(!loader.edit("a"));
        assert!(loader.is_dirty());

        assert!(loader.edit(""));
        assert!(!loader.is_dirty(), "editing back to the saved text is clean");
    }

    #[test]
    fn test_fetcher_delivers_result() {
        let fetcher = Fetcher::new(Arc::new(Scripted::new(&["remote"])));
        let mut storage = MemoryStorage::new();
        let mut loader = Loader::new(KEY, &storage);
        let ticket = loader.begin_load();
        fetcher.spawn(ticket);

        let fetched = fetcher.rx.recv().unwrap();
        loader
            .resolve(fetched.ticket, fetched.result, &mut storage)
            .unwrap();
        assert_eq!(loader.current(), "remote");
    }

    #[test]
    fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slides.md");
        std::fs::write(&path, "# From disk").unwrap();
        assert_eq!(FileSource::new(&path).fetch().unwrap(), "# From disk");
        assert!(matches!(
            FileSource::new(dir.path().join("missing.md")).fetch(),
            Err(LoadError::Read { .. })
        ));
    }

    #[test]
    fn test_source_from_arg() {
        assert_eq!(
            source_from_arg("https://example.com/s.md").describe(),
            "https://example.com/s.md"
        );
        assert_eq!(source_from_arg("talk.md").describe(), "talk.md");
    }
}
