use anyhow::Result;
use tracing::{debug, warn};

use crate::data::DataStore;
use crate::deck::{Deck, ParseError, Slide};
use crate::loader::{LoadError, Loader, Resolution, Source, Ticket};
use crate::navigator::{KeyBindings, KeyState, Navigator, Step};
use crate::storage::Storage;

pub const CODE_KEY: &str = "slides_code";
pub const INDEX_KEY: &str = "slides_index";
pub const EDIT_KEY: &str = "slides_edit";

/// Ties the loader, parser and navigator together. Every text change goes
/// through [`Session::rebuild`], which reparses and re-clamps the position.
pub struct Session {
    storage: Box<dyn Storage>,
    loader: Loader,
    data: DataStore,
    deck: Deck,
    parse_error: Option<ParseError>,
    restored_edits: bool,
    navigator: Navigator,
    keys: KeyBindings,
    editing: bool,
}

impl Session {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        let loader = Loader::new(CODE_KEY, storage.as_ref());
        let navigator = Navigator::new(INDEX_KEY, storage.as_ref());
        let editing = storage.get_bool(EDIT_KEY).unwrap_or(false);
        Self {
            storage,
            loader,
            data: DataStore::new(),
            deck: Deck::default(),
            parse_error: None,
            restored_edits: false,
            navigator,
            keys: KeyBindings::default(),
            editing,
        }
    }

    /// Load synchronously from `source`. Used by the CLI commands.
    pub fn open(storage: Box<dyn Storage>, source: &dyn Source) -> Result<Self, LoadError> {
        let mut session = Self::new(storage);
        let resolution = session
            .loader
            .load_blocking(source, session.storage.as_mut())?;
        session.settle(resolution);
        Ok(session)
    }

    pub fn begin_load(&mut self) -> Ticket {
        self.loader.begin_load()
    }

    pub fn begin_reset(&mut self) -> Ticket {
        self.loader.begin_reset()
    }

    /// Feed a finished fetch into the loader and rebuild when it changed the
    /// text.
    pub fn apply_fetch(
        &mut self,
        ticket: Ticket,
        fetched: Result<String, LoadError>,
    ) -> Result<Resolution, LoadError> {
        let resolution = self
            .loader
            .resolve(ticket, fetched, self.storage.as_mut())?;
        self.settle(resolution);
        Ok(resolution)
    }

    fn settle(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Stale => return,
            Resolution::RestoredEdits => self.restored_edits = true,
            Resolution::Loaded => self.restored_edits = false,
        }
        self.rebuild();
    }

    /// Editor input.
    pub fn edit(&mut self, text: &str) {
        if self.loader.edit(text) {
            self.rebuild();
        }
    }

    pub fn save(&mut self) -> Result<()> {
        self.loader.save(self.storage.as_mut())?;
        Ok(())
    }

    fn rebuild(&mut self) {
        self.data.clear();
        match Deck::parse(self.loader.current(), &mut self.data) {
            Ok(deck) => {
                self.deck = deck;
                self.parse_error = None;
            }
            Err(e) => {
                warn!("deck did not parse: {e}");
                self.deck = Deck::default();
                self.parse_error = Some(e);
            }
        }
        if let Err(e) = self.navigator.clamp(self.deck.len(), self.storage.as_mut()) {
            warn!("could not persist slide index: {e}");
        }
        debug!(
            slides = self.deck.len(),
            index = self.navigator.index(),
            "rebuilt deck"
        );
    }

    pub fn next(&mut self) -> Result<bool> {
        Ok(self.navigator.next(self.deck.len(), self.storage.as_mut())?)
    }

    pub fn prev(&mut self) -> Result<bool> {
        Ok(self.navigator.prev(self.storage.as_mut())?)
    }

    pub fn go(&mut self, title: &str) -> Result<bool> {
        Ok(self
            .navigator
            .go(title, &self.deck, self.storage.as_mut())?)
    }

    pub fn jump(&mut self, index: usize) -> Result<bool> {
        Ok(self
            .navigator
            .jump(index, self.deck.len(), self.storage.as_mut())?)
    }

    /// Feed the current held-key state; runs any bound navigation.
    pub fn on_keys(&mut self, state: KeyState) -> Result<bool> {
        let mut moved = false;
        for step in self.keys.observe(state) {
            moved |= match step {
                Step::Prev => self.prev()?,
                Step::Next => self.next()?,
            };
        }
        Ok(moved)
    }

    pub fn toggle_edit(&mut self) -> Result<bool> {
        self.set_editing(!self.editing)?;
        Ok(self.editing)
    }

    pub fn set_editing(&mut self, editing: bool) -> Result<()> {
        self.editing = editing;
        if editing {
            self.storage.set(EDIT_KEY, "true")?;
        } else {
            self.storage.remove(EDIT_KEY)?;
        }
        Ok(())
    }

    pub fn editing(&self) -> bool {
        self.editing
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn data(&self) -> &DataStore {
        &self.data
    }

    pub fn index(&self) -> usize {
        self.navigator.index()
    }

    pub fn current_slide(&self) -> Option<&Slide> {
        self.deck.get(self.navigator.index())
    }

    pub fn text(&self) -> &str {
        self.loader.current()
    }

    pub fn is_dirty(&self) -> bool {
        self.loader.is_dirty()
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    /// Whether the last load showed persisted edits instead of the source.
    pub fn restored_edits(&self) -> bool {
        self.restored_edits
    }

    pub fn parse_error(&self) -> Option<&ParseError> {
        self.parse_error.as_ref()
    }
}
