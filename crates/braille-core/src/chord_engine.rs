use crate::dot_table::DotPatternTable;
use crate::key_map::{normalize_key, KeyToDotMap};
use crate::types::DotPattern;
use std::collections::HashSet;
use tracing::debug;

/// Internal event type for the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEdge {
    Down,
    Up,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub edge: KeyEdge,
}

impl KeyEvent {
    pub fn down(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            edge: KeyEdge::Down,
        }
    }

    pub fn up(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            edge: KeyEdge::Up,
        }
    }
}

/// Output decision from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Not a chord key
    Passthrough(KeyEdge),
    /// Chord key absorbed, chord still open
    Pending,
    /// Release of a chord key that was never pressed
    Ignored,
    /// All keys released and the dots spell a character
    Chord { ch: char, pattern: DotPattern },
    /// All keys released but the dots spell nothing
    Unrecognized(DotPattern),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordPhase {
    Idle,
    Accumulating,
}

#[derive(Debug, Clone, Default)]
pub struct ChordState {
    /// Chord keys physically down.
    pub pressed: HashSet<String>,
    /// Every dot pressed since the chord started, including dots whose keys
    /// were already released.
    pub seen: DotPattern,
}

pub struct ChordEngine {
    key_map: KeyToDotMap,
    table: DotPatternTable,
    pub state: ChordState,
}

impl Default for ChordEngine {
    fn default() -> Self {
        Self::new(KeyToDotMap::default(), DotPatternTable::default())
    }
}

impl ChordEngine {
    pub fn new(key_map: KeyToDotMap, table: DotPatternTable) -> Self {
        Self {
            key_map,
            table,
            state: ChordState::default(),
        }
    }

    pub fn key_map(&self) -> &KeyToDotMap {
        &self.key_map
    }

    pub fn table(&self) -> &DotPatternTable {
        &self.table
    }

    pub fn phase(&self) -> ChordPhase {
        if self.state.pressed.is_empty() {
            ChordPhase::Idle
        } else {
            ChordPhase::Accumulating
        }
    }

    /// Drops the open chord without resolving it.
    pub fn reset(&mut self) {
        self.state = ChordState::default();
    }

    pub fn on_event(&mut self, event: &KeyEvent) -> Decision {
        match event.edge {
            KeyEdge::Down => self.press(&event.key),
            KeyEdge::Up => self.release(&event.key),
        }
    }

    pub fn press(&mut self, raw: &str) -> Decision {
        let key = normalize_key(raw);
        let Some(dot) = self.key_map.get(&key) else {
            return Decision::Passthrough(KeyEdge::Down);
        };

        // Auto-repeat delivers the same key again; set semantics absorb it.
        self.state.pressed.insert(key);
        self.state.seen = self.state.seen.with(dot);
        Decision::Pending
    }

    pub fn release(&mut self, raw: &str) -> Decision {
        let key = normalize_key(raw);
        if self.key_map.get(&key).is_none() {
            return Decision::Passthrough(KeyEdge::Up);
        }

        // 1. Update pressed state
        if !self.state.pressed.remove(&key) {
            return Decision::Ignored;
        }

        // 2. Chord commits only once the last key is up
        if !self.state.pressed.is_empty() {
            return Decision::Pending;
        }

        // 3. Resolve
        let pattern = std::mem::take(&mut self.state.seen);
        match self.table.decode_pattern(pattern) {
            Some(ch) => {
                debug!("Chord {} -> {:?}", pattern, ch);
                Decision::Chord { ch, pattern }
            }
            None => {
                debug!("Chord {} has no entry, dropped", pattern);
                Decision::Unrecognized(pattern)
            }
        }
    }
}
