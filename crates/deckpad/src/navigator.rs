use tracing::debug;

use crate::deck::Deck;
use crate::storage::{Storage, StorageError};

/// Position within the deck, persisted under `key` on every change.
#[derive(Debug)]
pub struct Navigator {
    key: String,
    index: usize,
}

impl Navigator {
    /// Start from the persisted index, or 0.
    pub fn new(key: impl Into<String>, storage: &dyn Storage) -> Self {
        let key = key.into();
        let index = storage.get_usize(&key).unwrap_or(0);
        Self { key, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Advance unless already on the last slide.
    pub fn next(&mut self, len: usize, storage: &mut dyn Storage) -> Result<bool, StorageError> {
        if self.index + 1 < len {
            self.move_to(self.index + 1, storage)
        } else {
            Ok(false)
        }
    }

    /// Step back unless already on the first slide.
    pub fn prev(&mut self, storage: &mut dyn Storage) -> Result<bool, StorageError> {
        if self.index > 0 {
            self.move_to(self.index - 1, storage)
        } else {
            Ok(false)
        }
    }

    /// Jump to the first slide titled `title`. Unknown titles are ignored.
    pub fn go(
        &mut self,
        title: &str,
        deck: &Deck,
        storage: &mut dyn Storage,
    ) -> Result<bool, StorageError> {
        match deck.position_of_title(title) {
            Some(index) => self.move_to(index, storage),
            None => {
                debug!(title, "no slide with that title");
                Ok(false)
            }
        }
    }

    /// Jump to an explicit position, clamped to the deck.
    pub fn jump(
        &mut self,
        index: usize,
        len: usize,
        storage: &mut dyn Storage,
    ) -> Result<bool, StorageError> {
        if len == 0 {
            return Ok(false);
        }
        self.move_to(index.min(len - 1), storage)
    }

    /// Pull an out-of-range index back onto the last slide after the deck
    /// shrank. Empty decks leave the index alone so it survives a transient
    /// parse failure.
    pub fn clamp(&mut self, len: usize, storage: &mut dyn Storage) -> Result<bool, StorageError> {
        if len > 0 && self.index >= len {
            self.move_to(len - 1, storage)
        } else {
            Ok(false)
        }
    }

    fn move_to(&mut self, index: usize, storage: &mut dyn Storage) -> Result<bool, StorageError> {
        if index == self.index {
            return Ok(false);
        }
        self.index = index;
        storage.set(&self.key, &index.to_string())?;
        Ok(true)
    }
}

/// Modifier and arrow keys currently held down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub shift: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Prev,
    Next,
}

/// Shift+Left steps back, Shift+Right steps forward. Bindings fire whenever
/// the held-key state changes into a matching combination.
#[derive(Debug, Default)]
pub struct KeyBindings {
    last: KeyState,
}

impl KeyBindings {
    pub fn observe(&mut self, state: KeyState) -> Vec<Step> {
        if state == self.last {
            return Vec::new();
        }
        self.last = state;

        let mut steps = Vec::new();
        if state.shift && state.left {
            steps.push(Step::Prev);
        }
        if state.shift && state.right {
            steps.push(Step::Next);
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataStore;
    use crate::storage::MemoryStorage;

    const KEY: &str = "slides_index";

    fn nav_at(index: usize) -> (Navigator, MemoryStorage) {
        let mut storage = MemoryStorage::new();
        storage.set(KEY, &index.to_string()).unwrap();
        (Navigator::new(KEY, &storage), storage)
    }

    #[test]
    fn test_starts_at_zero() {
        let storage = MemoryStorage::new();
        assert_eq!(Navigator::new(KEY, &storage).index(), 0);
    }

    #[test]
    fn test_starts_at_persisted_index() {
        let (nav, _) = nav_at(4);
        assert_eq!(nav.index(), 4);
    }

    #[test]
    fn test_next_next_stops_at_end() {
        let (mut nav, mut storage) = nav_at(0);
        nav.next(3, &mut storage).unwrap();
        nav.next(3, &mut storage).unwrap();
        assert_eq!(nav.index(), 2);
        assert!(!nav.next(3, &mut storage).unwrap());
        assert_eq!(nav.index(), 2);
        assert_eq!(storage.get_usize(KEY), Some(2));
    }

    #[test]
    fn test_prev_at_zero_is_noop() {
        let (mut nav, mut storage) = nav_at(0);
        assert!(!nav.prev(&mut storage).unwrap());
        assert_eq!(nav.index(), 0);
    }

    #[test]
    fn test_next_then_prev_restores_interior_index() {
        for start in 1..4 {
            let (mut nav, mut storage) = nav_at(start);
            nav.next(5, &mut storage).unwrap();
            nav.prev(&mut storage).unwrap();
            assert_eq!(nav.index(), start);
        }
    }

    #[test]
    fn test_next_on_empty_deck() {
        let (mut nav, mut storage) = nav_at(0);
        assert!(!nav.next(0, &mut storage).unwrap());
        assert_eq!(nav.index(), 0);
    }

    #[test]
    fn test_go_by_title() {
        let mut data = DataStore::new();
        let deck = Deck::parse(
            "---\ntitle: one\n---\nA\n---\ntitle: two\n---\nB\n---\ntitle: two\n---\nC",
            &mut data,
        )
        .unwrap();
        let (mut nav, mut storage) = nav_at(0);
        assert!(nav.go("two", &deck, &mut storage).unwrap());
        assert_eq!(nav.index(), 1, "first match wins");
        assert!(!nav.go("nope", &deck, &mut storage).unwrap());
        assert_eq!(nav.index(), 1);
    }

    #[test]
    fn test_clamp_after_shrink() {
        let (mut nav, mut storage) = nav_at(7);
        assert!(!nav.clamp(0, &mut storage).unwrap());
        assert_eq!(nav.index(), 7);
        assert!(nav.clamp(3, &mut storage).unwrap());
        assert_eq!(nav.index(), 2);
        assert_eq!(storage.get_usize(KEY), Some(2));
    }

    #[test]
    fn test_jump_clamps() {
        let (mut nav, mut storage) = nav_at(0);
        nav.jump(10, 4, &mut storage).unwrap();
        assert_eq!(nav.index(), 3);
    }

    #[test]
    fn test_unchanged_index_is_not_rewritten() {
        let mut storage = MemoryStorage::new();
        let mut nav = Navigator::new(KEY, &storage);
        nav.prev(&mut storage).unwrap();
        assert_eq!(storage.get(KEY), None);
    }

    #[test]
    fn test_shift_arrows() {
        let mut keys = KeyBindings::default();
        let shift = KeyState {
            shift: true,
            ..Default::default()
        };
        assert!(keys.observe(shift).is_empty());
        assert_eq!(
            keys.observe(KeyState {
                right: true,
                ..shift
            }),
            vec![Step::Next]
        );
        // Holding the same keys does not repeat.
        assert!(keys
            .observe(KeyState {
                right: true,
                ..shift
            })
            .is_empty());
        assert!(keys.observe(shift).is_empty());
        assert_eq!(
            keys.observe(KeyState {
                left: true,
                ..shift
            }),
            vec![Step::Prev]
        );
    }

    #[test]
    fn test_arrows_without_shift_do_nothing() {
        let mut keys = KeyBindings::default();
        assert!(keys
            .observe(KeyState {
                right: true,
                ..Default::default()
            })
            .is_empty());
    }

    #[test]
    fn test_shift_pressed_while_arrow_held() {
        let mut keys = KeyBindings::default();
        keys.observe(KeyState {
            left: true,
            ..Default::default()
        });
        assert_eq!(
            keys.observe(KeyState {
                shift: true,
                left: true,
                right: false
            }),
            vec![Step::Prev]
        );
    }
}
